//! Tracks where the pointer is, and how it pulls on particles.

use glam::Vec2;

/// Where the pointer is parked when it isn't over the terminal. Far enough away that no particle
/// can ever be within the attraction radius of it.
pub const INACTIVE_POSITION: Vec2 = Vec2::splat(-9999.0);

/// The pointer's last known position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Pointer {
    /// Position in surface pixels.
    pub position: Vec2,
    /// Whether the pointer is currently over the terminal.
    pub is_active: bool,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            position: INACTIVE_POSITION,
            is_active: false,
        }
    }
}

impl Pointer {
    /// The pointer moved.
    pub const fn move_to(&mut self, position: Vec2) {
        self.position = position;
        self.is_active = true;
    }

    /// The pointer left, so park it.
    pub const fn leave(&mut self) {
        self.position = INACTIVE_POSITION;
        self.is_active = false;
    }

    /// Magnitude of the pull at the given distance: strongest at zero distance, falling off
    /// linearly to nothing at `radius`.
    #[must_use]
    pub fn falloff(distance: f32, radius: f32, strength: f32) -> f32 {
        if distance >= radius {
            return 0.0;
        }
        (1.0 - distance / radius) * strength
    }

    /// The velocity change the pointer applies to a particle at `position`.
    #[must_use]
    pub fn attraction(&self, position: Vec2, radius: f32, strength: f32) -> Vec2 {
        if !self.is_active {
            return Vec2::ZERO;
        }

        let delta = self.position - position;
        let distance = delta.length();
        if distance >= radius {
            return Vec2::ZERO;
        }

        let force = Self::falloff(distance, radius, strength);
        let divisor = if distance == 0.0 { 1.0 } else { distance };
        delta / divisor * force
    }
}

#[cfg(test)]
#[expect(clippy::float_cmp, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    #[test]
    fn inactive_pointer_doesnt_attract() {
        let mut pointer = Pointer::default();
        assert_eq!(pointer.attraction(INACTIVE_POSITION, 140.0, 0.16), Vec2::ZERO);

        pointer.move_to(Vec2::new(10.0, 10.0));
        pointer.leave();
        assert_eq!(pointer.position, INACTIVE_POSITION);
        assert_eq!(
            pointer.attraction(Vec2::new(10.0, 10.0), 140.0, 0.16),
            Vec2::ZERO
        );
    }

    #[test]
    fn zero_distance_uses_the_fallback_divisor() {
        let mut pointer = Pointer::default();
        pointer.move_to(Vec2::new(100.0, 100.0));

        let pull = pointer.attraction(Vec2::new(100.0, 100.0), 140.0, 0.16);
        assert!(pull.is_finite());
        assert_eq!(Pointer::falloff(0.0, 140.0, 0.16), 0.16);
    }

    #[test]
    fn pulls_toward_the_pointer() {
        let mut pointer = Pointer::default();
        pointer.move_to(Vec2::new(100.0, 100.0));

        let pull = pointer.attraction(Vec2::new(30.0, 100.0), 140.0, 0.16);
        assert!((pull.x - 0.08).abs() < 1e-6);
        assert_eq!(pull.y, 0.0);
    }

    #[test]
    fn nothing_beyond_the_radius() {
        let mut pointer = Pointer::default();
        pointer.move_to(Vec2::new(0.0, 0.0));
        assert_eq!(pointer.attraction(Vec2::new(140.0, 0.0), 140.0, 0.16), Vec2::ZERO);
        assert_eq!(Pointer::falloff(200.0, 140.0, 0.16), 0.0);
    }
}
