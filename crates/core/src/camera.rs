//! Perspective camera for the showpiece.
//!
//! Fixed position on the view axis looking at the origin; only the aspect
//! ratio changes at runtime (on viewport resize).

use glam::{Mat4, Vec3};

/// Perspective camera with cached matrices.
pub struct Camera {
    /// Vertical field of view in radians.
    fov: f32,
    /// Aspect ratio (width / height).
    aspect: f32,
    /// Near clipping plane.
    near: f32,
    /// Far clipping plane.
    far: f32,
    /// Camera position.
    position: Vec3,

    // Cached matrices
    view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Camera {
    /// Vertical field of view (40 degrees).
    pub const FOV: f32 = 40.0 * core::f32::consts::PI / 180.0;
    /// Near clipping plane.
    pub const NEAR: f32 = 0.1;
    /// Far clipping plane.
    pub const FAR: f32 = 1000.0;
    /// Distance from the origin along +Z.
    pub const DISTANCE: f32 = 7.0;

    /// Create a camera with the given aspect ratio.
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            fov: Self::FOV,
            aspect,
            near: Self::NEAR,
            far: Self::FAR,
            position: Vec3::new(0.0, 0.0, Self::DISTANCE),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        };
        camera.update_matrices();
        camera
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Get camera position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get aspect ratio.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Set aspect ratio and rebuild the projection matrix.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_matrices();
    }

    /// Set aspect from a viewport size in pixels.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.set_aspect(width.max(1) as f32 / height.max(1) as f32);
    }

    fn update_matrices(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y);
        self.projection_matrix =
            Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_defaults() {
        let camera = Camera::new(16.0 / 9.0);
        assert!((camera.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 7.0));
    }

    #[test]
    fn set_viewport_updates_aspect_exactly() {
        let mut camera = Camera::new(1.0);
        camera.set_viewport(1920, 1080);
        assert!((camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);

        camera.set_viewport(800, 600);
        assert!((camera.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn set_viewport_tolerates_zero_height() {
        let mut camera = Camera::new(1.0);
        camera.set_viewport(1280, 0);
        assert!(camera.aspect().is_finite());
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut camera = Camera::new(1.0);
        let square = camera.projection_matrix();
        camera.set_aspect(2.0);
        let wide = camera.projection_matrix();
        // Doubling the aspect halves the x scale of the projection.
        assert!((wide.x_axis.x - square.x_axis.x / 2.0).abs() < 1e-5);
        // y scale is untouched by aspect.
        assert!((wide.y_axis.y - square.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let camera = Camera::new(1.5);
        let clip = camera.view_projection_matrix() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }
}
