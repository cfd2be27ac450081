//! Vitrine Core - Scene State and Interaction Math
//!
//! Everything about the showpiece that is not GPU or platform: the camera,
//! the cursor-to-rotation mapping, the eased rotation tween, and the logical
//! scene (light rig + optional model node).
//!
//! All of it runs headless, so every behavior the client wires to browser
//! events is testable here without a window or an adapter.

pub mod camera;
pub mod pointer;
pub mod scene;
pub mod tween;

pub use camera::Camera;
pub use pointer::RotationTarget;
pub use scene::{Lights, ModelNode, Scene};
pub use tween::RotationTween;
