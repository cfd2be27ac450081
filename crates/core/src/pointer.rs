//! Cursor position to rotation-target mapping.
//!
//! Converts platform pointer coordinates to the model rotation the cursor is
//! asking for: each axis is normalized to [-0.5, 0.5] around the viewport
//! center and scaled by PI/2, with the axes swapped so horizontal cursor
//! movement turns the model around its vertical axis and vice versa.

use std::f32::consts::PI;

/// Full rotation range across the viewport (PI/2 radians edge to edge).
pub const ROTATION_RANGE: f32 = PI * 0.5;

/// A target model orientation, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationTarget {
    /// Rotation around the horizontal axis (driven by vertical cursor motion).
    pub pitch: f32,
    /// Rotation around the vertical axis (driven by horizontal cursor motion).
    pub yaw: f32,
}

/// Map a cursor position to a rotation target.
///
/// `x`/`y` are cursor coordinates in pixels, `width`/`height` the viewport
/// size in the same units. The center of the viewport maps to (0, 0); the
/// top-left corner maps to (-PI/4, -PI/4).
pub fn rotation_target(x: f64, y: f64, width: f64, height: f64) -> RotationTarget {
    let nx = (x / width.max(1.0)) as f32 - 0.5;
    let ny = (y / height.max(1.0)) as f32 - 0.5;
    RotationTarget {
        pitch: ny * ROTATION_RANGE,
        yaw: nx * ROTATION_RANGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    const EPS: f32 = 1e-6;

    #[test]
    fn center_maps_to_zero() {
        let target = rotation_target(960.0, 540.0, 1920.0, 1080.0);
        assert!(target.pitch.abs() < EPS);
        assert!(target.yaw.abs() < EPS);
    }

    #[test]
    fn top_left_corner_maps_to_negative_quarter_pi() {
        let target = rotation_target(0.0, 0.0, 1920.0, 1080.0);
        assert!((target.pitch + FRAC_PI_4).abs() < EPS);
        assert!((target.yaw + FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn bottom_right_corner_maps_to_positive_quarter_pi() {
        let target = rotation_target(1280.0, 720.0, 1280.0, 720.0);
        assert!((target.pitch - FRAC_PI_4).abs() < EPS);
        assert!((target.yaw - FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn axes_are_swapped() {
        // Horizontal-only cursor offset drives yaw, not pitch.
        let target = rotation_target(1920.0, 540.0, 1920.0, 1080.0);
        assert!(target.pitch.abs() < EPS);
        assert!((target.yaw - FRAC_PI_4).abs() < EPS);

        // Vertical-only cursor offset drives pitch, not yaw.
        let target = rotation_target(960.0, 1080.0, 1920.0, 1080.0);
        assert!((target.pitch - FRAC_PI_4).abs() < EPS);
        assert!(target.yaw.abs() < EPS);
    }

    #[test]
    fn degenerate_viewport_does_not_blow_up() {
        let target = rotation_target(10.0, 10.0, 0.0, 0.0);
        assert!(target.pitch.is_finite());
        assert!(target.yaw.is_finite());
    }
}
