//! Eased rotation interpolation.
//!
//! A small per-property state machine: start value, target, elapsed time,
//! fixed duration, ease-out-quadratic curve. The client samples it once per
//! rendered frame. Retargeting mid-flight restarts the clock from the
//! *current* interpolated value, so rapid pointer movement produces smooth
//! overlapping motion instead of queued segments. Last target wins.

use crate::pointer::RotationTarget;

/// Interpolation duration in seconds.
pub const TWEEN_DURATION: f32 = 0.9;

/// Ease-out quadratic: fast start, decelerating finish.
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Eased interpolation of a [`RotationTarget`] pair (pitch, yaw).
#[derive(Debug, Clone)]
pub struct RotationTween {
    start: RotationTarget,
    target: RotationTarget,
    elapsed: f32,
    duration: f32,
}

impl Default for RotationTween {
    fn default() -> Self {
        Self::new(RotationTarget::default())
    }
}

impl RotationTween {
    /// Create a tween at rest on `initial`.
    pub fn new(initial: RotationTarget) -> Self {
        Self {
            start: initial,
            target: initial,
            elapsed: TWEEN_DURATION,
            duration: TWEEN_DURATION,
        }
    }

    /// Steer toward a new target, restarting from the current value.
    pub fn retarget(&mut self, target: RotationTarget) {
        self.start = self.value();
        self.target = target;
        self.elapsed = 0.0;
    }

    /// Advance the clock by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
    }

    /// Sample the current interpolated rotation.
    pub fn value(&self) -> RotationTarget {
        let k = ease_out_quad(self.elapsed / self.duration);
        RotationTarget {
            pitch: self.start.pitch + (self.target.pitch - self.start.pitch) * k,
            yaw: self.start.yaw + (self.target.yaw - self.start.yaw) * k,
        }
    }

    /// The rotation this tween is heading toward.
    pub fn target(&self) -> RotationTarget {
        self.target
    }

    /// True once the full duration has played out.
    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn rot(pitch: f32, yaw: f32) -> RotationTarget {
        RotationTarget { pitch, yaw }
    }

    #[test]
    fn starts_at_rest() {
        let tween = RotationTween::new(rot(0.2, -0.3));
        assert!(tween.finished());
        assert!((tween.value().pitch - 0.2).abs() < EPS);
        assert!((tween.value().yaw + 0.3).abs() < EPS);
    }

    #[test]
    fn ease_curve_values() {
        assert!((ease_out_quad(0.0) - 0.0).abs() < EPS);
        assert!((ease_out_quad(0.5) - 0.75).abs() < EPS);
        assert!((ease_out_quad(1.0) - 1.0).abs() < EPS);
        // Clamped outside [0, 1].
        assert!((ease_out_quad(2.0) - 1.0).abs() < EPS);
        assert!((ease_out_quad(-1.0) - 0.0).abs() < EPS);
    }

    #[test]
    fn reaches_target_after_duration() {
        let mut tween = RotationTween::new(rot(0.0, 0.0));
        tween.retarget(rot(1.0, -1.0));
        assert!(!tween.finished());

        tween.advance(TWEEN_DURATION);
        assert!(tween.finished());
        assert!((tween.value().pitch - 1.0).abs() < EPS);
        assert!((tween.value().yaw + 1.0).abs() < EPS);

        // Extra time past the end is inert.
        tween.advance(10.0);
        assert!((tween.value().pitch - 1.0).abs() < EPS);
    }

    #[test]
    fn decelerates_toward_the_end() {
        let mut tween = RotationTween::new(rot(0.0, 0.0));
        tween.retarget(rot(1.0, 0.0));

        tween.advance(TWEEN_DURATION * 0.5);
        let first_half = tween.value().pitch;
        tween.advance(TWEEN_DURATION * 0.5);
        let second_half = tween.value().pitch - first_half;
        assert!(first_half > second_half);
    }

    #[test]
    fn retarget_restarts_from_current_value() {
        let mut tween = RotationTween::new(rot(0.0, 0.0));
        tween.retarget(rot(1.0, 0.0));
        tween.advance(TWEEN_DURATION * 0.5);
        let mid = tween.value().pitch;
        assert!(mid > 0.0 && mid < 1.0);

        // Retarget mid-flight: motion resumes from the sampled value, and the
        // clock restarts.
        tween.retarget(rot(0.0, 0.0));
        assert!((tween.value().pitch - mid).abs() < EPS);
        assert!(!tween.finished());

        tween.advance(TWEEN_DURATION);
        assert!(tween.value().pitch.abs() < EPS);
    }

    #[test]
    fn last_target_wins() {
        let mut tween = RotationTween::new(rot(0.0, 0.0));
        tween.retarget(rot(1.0, 1.0));
        tween.retarget(rot(-0.5, 0.25));
        tween.advance(TWEEN_DURATION);
        assert!((tween.value().pitch + 0.5).abs() < EPS);
        assert!((tween.value().yaw - 0.25).abs() < EPS);
    }
}
