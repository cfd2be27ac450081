//! Logical scene state: light rig and the optional model node.
//!
//! The scene is pure data advanced once per frame. The model slot is an
//! explicit `Option` filled by the load callback; pointer events are a no-op
//! until then, which is the only guard the single-threaded event model needs.

use glam::Vec3;

use crate::pointer::{self, RotationTarget};
use crate::tween::RotationTween;

/// Hemisphere light: sky color above, ground color below.
#[derive(Debug, Clone, Copy)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

/// Directional light shining from `position` toward the origin.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Normalized direction from the light toward the origin.
    pub fn direction(&self) -> Vec3 {
        (-self.position).normalize_or_zero()
    }
}

/// The static two-light rig added at startup.
#[derive(Debug, Clone, Copy)]
pub struct Lights {
    pub hemisphere: HemisphereLight,
    pub directional: DirectionalLight,
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            hemisphere: HemisphereLight {
                sky_color: Vec3::ONE,
                ground_color: Vec3::splat(68.0 / 255.0),
                intensity: 1.1,
                position: Vec3::new(0.0, 20.0, 0.0),
            },
            directional: DirectionalLight {
                color: Vec3::ONE,
                intensity: 0.8,
                position: Vec3::new(5.0, 10.0, 7.5),
            },
        }
    }
}

/// The model's placement in the scene, present once loading succeeds.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub position: Vec3,
    pub scale: f32,
    tween: RotationTween,
}

impl ModelNode {
    /// Uniform scale applied to the loaded model.
    pub const SCALE: f32 = 2.0;

    fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Self::SCALE,
            tween: RotationTween::default(),
        }
    }

    /// Current interpolated rotation.
    pub fn rotation(&self) -> RotationTarget {
        self.tween.value()
    }
}

/// Logical scene: lights plus the optional model node.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub lights: Lights,
    model: Option<ModelNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the loaded model at the origin with uniform scale 2.
    ///
    /// Called from the model load callback; until then [`Scene::pointer_moved`]
    /// does nothing.
    pub fn attach_model(&mut self) {
        self.model = Some(ModelNode::new());
    }

    pub fn model(&self) -> Option<&ModelNode> {
        self.model.as_ref()
    }

    /// Steer the model toward the rotation the cursor is asking for.
    ///
    /// No-op while the model has not finished loading.
    pub fn pointer_moved(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if let Some(model) = &mut self.model {
            model
                .tween
                .retarget(pointer::rotation_target(x, y, width, height));
        }
    }

    /// Advance the rotation tween by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if let Some(model) = &mut self.model {
            model.tween.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::TWEEN_DURATION;
    use std::f32::consts::FRAC_PI_4;

    const EPS: f32 = 1e-5;

    #[test]
    fn light_rig_constants() {
        let lights = Lights::default();
        assert!((lights.hemisphere.intensity - 1.1).abs() < EPS);
        assert!((lights.directional.intensity - 0.8).abs() < EPS);
        assert_eq!(lights.directional.position, Vec3::new(5.0, 10.0, 7.5));
        // Direction points from the light toward the origin.
        assert!(lights.directional.direction().y < 0.0);
        assert!((lights.directional.direction().length() - 1.0).abs() < EPS);
    }

    #[test]
    fn pointer_is_noop_before_model_attaches() {
        let mut scene = Scene::new();
        scene.pointer_moved(0.0, 0.0, 1920.0, 1080.0);
        scene.advance(1.0);
        assert!(scene.model().is_none());
    }

    #[test]
    fn attach_places_model_at_origin_scale_two() {
        let mut scene = Scene::new();
        scene.attach_model();
        let model = scene.model().unwrap();
        assert_eq!(model.position, Vec3::ZERO);
        assert!((model.scale - 2.0).abs() < EPS);
        assert!(model.rotation().pitch.abs() < EPS);
        assert!(model.rotation().yaw.abs() < EPS);
    }

    #[test]
    fn pointer_steers_model_after_attach() {
        let mut scene = Scene::new();
        scene.attach_model();

        // Top-left corner: both axes head toward -PI/4.
        scene.pointer_moved(0.0, 0.0, 1920.0, 1080.0);
        scene.advance(TWEEN_DURATION);

        let rotation = scene.model().unwrap().rotation();
        assert!((rotation.pitch + FRAC_PI_4).abs() < EPS);
        assert!((rotation.yaw + FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn rotation_is_eased_not_instant() {
        let mut scene = Scene::new();
        scene.attach_model();
        scene.pointer_moved(1920.0, 1080.0, 1920.0, 1080.0);

        let before = scene.model().unwrap().rotation();
        assert!(before.pitch.abs() < EPS);

        scene.advance(TWEEN_DURATION / 3.0);
        let mid = scene.model().unwrap().rotation();
        assert!(mid.pitch > 0.0 && mid.pitch < FRAC_PI_4);
    }
}
