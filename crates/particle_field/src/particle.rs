//! A single point in the particle field.

use glam::Vec2;

use crate::config::FieldConfig;

/// How far, in pixels, a particle may travel outside the viewport before it wraps around to the
/// opposite side.
pub const WRAP_MARGIN: f32 = 20.0;

/// A particle drifts about its home position.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Particle {
    /// Current position.
    pub position: Vec2,
    /// Current velocity, in pixels per frame.
    pub velocity: Vec2,
    /// Where the particle spawned. The spring force always pulls toward here.
    pub home: Vec2,
    /// Radius of the drawn circle.
    pub radius: f32,
}

impl Particle {
    /// Create a particle at an exact position, at rest.
    #[must_use]
    pub const fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            home: position,
            radius,
        }
    }

    /// Spawn a particle somewhere random inside the viewport.
    pub fn spawn<R: rand::Rng>(rng: &mut R, config: &FieldConfig, width: f32, height: f32) -> Self {
        let position = Vec2::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height);
        let velocity = Vec2::new(
            rng.gen_range(-config.initial_velocity..=config.initial_velocity),
            rng.gen_range(-config.initial_velocity..=config.initial_velocity),
        );
        let radius = rng.gen_range(config.particle_min_size..=config.particle_max_size);

        Self {
            position,
            velocity,
            home: position,
            radius,
        }
    }

    /// Rescale the velocity so the particle's speed is no more than `max_speed`.
    pub fn clamp_speed(&mut self, max_speed: f32) {
        self.velocity = self.velocity.clamp_length_max(max_speed);
    }

    /// Explicit Euler, one step per frame.
    pub fn integrate(&mut self) {
        self.position += self.velocity;
    }

    /// Wrap the particle to the opposite side of the viewport if it has strayed too far.
    pub fn wrap(&mut self, width: f32, height: f32) {
        self.position.x = wrap_axis(self.position.x, width);
        self.position.y = wrap_axis(self.position.y, height);
    }
}

/// Toroidal wrap of one coordinate.
fn wrap_axis(coordinate: f32, extent: f32) -> f32 {
    if coordinate < -WRAP_MARGIN {
        return extent + WRAP_MARGIN;
    }
    if coordinate > extent + WRAP_MARGIN {
        return -WRAP_MARGIN;
    }
    coordinate
}

#[cfg(test)]
#[expect(clippy::float_cmp, reason = "Tests aren't so strict")]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    #[test]
    fn wraps_to_the_opposite_margin() {
        let mut particle = Particle::new(Vec2::new(825.0, 300.0), 1.0);
        particle.wrap(800.0, 600.0);
        assert_eq!(particle.position, Vec2::new(-20.0, 300.0));

        let mut particle = Particle::new(Vec2::new(400.0, -20.5), 1.0);
        particle.wrap(800.0, 600.0);
        assert_eq!(particle.position, Vec2::new(400.0, 620.0));
    }

    #[test]
    fn inside_the_margin_doesnt_wrap() {
        let mut particle = Particle::new(Vec2::new(-20.0, 620.0), 1.0);
        particle.wrap(800.0, 600.0);
        assert_eq!(particle.position, Vec2::new(-20.0, 620.0));
    }

    #[test]
    fn clamping_preserves_direction() {
        let mut particle = Particle::new(Vec2::ZERO, 1.0);
        particle.velocity = Vec2::new(3.0, 4.0);
        particle.clamp_speed(1.0);

        assert!((particle.velocity.length() - 1.0).abs() < 1e-6);
        assert!((particle.velocity.x - 0.6).abs() < 1e-6);
        assert!((particle.velocity.y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn slow_particles_arent_clamped() {
        let mut particle = Particle::new(Vec2::ZERO, 1.0);
        particle.velocity = Vec2::new(0.3, -0.4);
        particle.clamp_speed(1.6);
        assert_eq!(particle.velocity, Vec2::new(0.3, -0.4));
    }

    #[test]
    fn spawns_inside_the_viewport_at_home() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let config = FieldConfig::default();
        for _ in 0..100 {
            let particle = Particle::spawn(&mut rng, &config, 80.0, 48.0);
            assert!((0.0..=80.0).contains(&particle.position.x));
            assert!((0.0..=48.0).contains(&particle.position.y));
            assert_eq!(particle.position, particle.home);
            assert!(particle.velocity.x.abs() <= config.initial_velocity);
            assert!(particle.velocity.y.abs() <= config.initial_velocity);
            assert!(particle.radius >= config.particle_min_size);
            assert!(particle.radius <= config.particle_max_size);
        }
    }
}
