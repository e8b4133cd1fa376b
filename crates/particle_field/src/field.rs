//! The particle field. Particles drift, spring back to where they spawned and gather around the
//! pointer. Nearby particles are joined by faint lines.

use color_eyre::eyre::Result;
use glam::Vec2;
use rand::SeedableRng as _;

use crate::config::FieldConfig;
use crate::particle::Particle;
use crate::pointer::Pointer;
use crate::surface::Surface;

/// However small the terminal, there are always at least this many particles. Unless
/// `max_particles` is smaller.
pub const MIN_PARTICLES: usize = 40;

/// `ParticleField`
#[derive(Debug)]
pub struct ParticleField {
    /// The look and the physics.
    config: FieldConfig,
    /// Viewport width in pixels.
    width: f32,
    /// Viewport height in pixels.
    height: f32,
    /// All the particles, in the order they were created.
    particles: Vec<Particle>,
    /// The pointer, which pulls on nearby particles.
    pointer: Pointer,
    /// Source of spawn positions and drift.
    rng: rand::rngs::StdRng,
}

impl ParticleField {
    /// Create a field filling the given viewport.
    #[must_use]
    pub fn new(config: FieldConfig, width: usize, height: usize) -> Self {
        Self::new_with_rng(config, width, height, rand::rngs::StdRng::from_entropy())
    }

    /// Create a field with a known source of randomness.
    #[must_use]
    pub fn new_with_rng(
        config: FieldConfig,
        width: usize,
        height: usize,
        rng: rand::rngs::StdRng,
    ) -> Self {
        let (width_f32, height_f32) = Self::dimensions(width, height);
        let mut field = Self {
            config,
            width: width_f32,
            height: height_f32,
            particles: Vec::new(),
            pointer: Pointer::default(),
            rng,
        };
        field.rebalance();
        tracing::debug!(
            "Particle field initialised: {width}x{height} with {} particles",
            field.particles.len()
        );
        field
    }

    /// The number of particles for a viewport. Density is roughly constant, with a floor of
    /// `MIN_PARTICLES` and a ceiling of `max_particles`.
    #[must_use]
    pub fn particle_count_for(width: f32, height: f32, config: &FieldConfig) -> usize {
        let by_area = (width * height / config.area_per_particle).floor();

        #[expect(
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation,
            clippy::as_conversions,
            reason = "Float to int casts saturate, which is what we want"
        )]
        let by_area_usize = by_area as usize;

        by_area_usize.max(MIN_PARTICLES).min(config.max_particles)
    }

    /// The number of particles the current viewport should have.
    #[must_use]
    pub fn target_particle_count(&self) -> usize {
        Self::particle_count_for(self.width, self.height, &self.config)
    }

    /// The viewport changed size. Existing particles are left exactly as they are, new ones are
    /// appended or the newest are dropped.
    pub fn resize(&mut self, width: usize, height: usize) {
        (self.width, self.height) = Self::dimensions(width, height);
        self.rebalance();
        tracing::debug!(
            "Particle field resized to {width}x{height}, now {} particles",
            self.particles.len()
        );
    }

    /// Add or remove particles to match the target count.
    fn rebalance(&mut self) {
        let desired = self.target_particle_count();
        if desired < self.particles.len() {
            self.particles.truncate(desired);
            return;
        }

        while self.particles.len() < desired {
            let particle = Particle::spawn(&mut self.rng, &self.config, self.width, self.height);
            self.particles.push(particle);
        }
    }

    /// The pointer moved to a position in surface pixels.
    pub const fn pointer_move(&mut self, position: Vec2) {
        self.pointer.move_to(position);
    }

    /// The pointer left the viewport.
    pub const fn pointer_leave(&mut self) {
        self.pointer.leave();
    }

    /// All the particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The pointer's current state.
    #[must_use]
    pub const fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// Opacity of a link between two particles: full at zero distance, fading linearly to
    /// nothing at the link radius.
    #[must_use]
    pub fn link_alpha(distance: f32, radius: f32) -> f32 {
        if radius <= 0.0 || distance >= radius {
            return 0.0;
        }
        1.0 - distance / radius
    }

    /// One frame: clear, draw the links, then move and draw every particle.
    pub fn tick(&mut self, surface: &mut Surface) -> Result<()> {
        surface.clear();
        if let Some(background) = self.config.background_colour {
            let (width, height) = Self::dimensions(surface.width, surface.height);
            surface.fill_rect(Vec2::ZERO, Vec2::new(width, height), background.0, 1.0)?;
        }

        self.draw_links(surface)?;

        let Self {
            config,
            width,
            height,
            particles,
            pointer,
            rng,
        } = self;
        for particle in particles.iter_mut() {
            Self::step_particle(particle, config, pointer, rng, *width, *height);
            surface.fill_circle(
                particle.position,
                particle.radius,
                config.particle_colour.0,
                config.particle_opacity,
            )?;
        }

        Ok(())
    }

    /// Join every pair of particles that are within the link radius of each other.
    fn draw_links(&self, surface: &mut Surface) -> Result<()> {
        let radius = self.config.link_radius;
        if radius <= 0.0 {
            return Ok(());
        }

        let radius_squared = radius * radius;
        for (index, first) in self.particles.iter().enumerate() {
            for second in self.particles.iter().skip(index + 1) {
                let distance_squared = first.position.distance_squared(second.position);
                if distance_squared >= radius_squared {
                    continue;
                }

                let alpha = Self::link_alpha(distance_squared.sqrt(), radius);
                surface.stroke_line(
                    first.position,
                    second.position,
                    self.config.link_colour.0,
                    alpha * self.config.link_opacity,
                )?;
            }
        }

        Ok(())
    }

    /// Accumulate forces, clamp, integrate and wrap a single particle.
    fn step_particle<R: rand::Rng>(
        particle: &mut Particle,
        config: &FieldConfig,
        pointer: &Pointer,
        rng: &mut R,
        width: f32,
        height: f32,
    ) {
        particle.velocity += (particle.home - particle.position) * config.spring_home;

        particle.velocity += Vec2::new(
            rng.gen_range(-config.drift..=config.drift),
            rng.gen_range(-config.drift..=config.drift),
        );

        particle.velocity += pointer.attraction(
            particle.position,
            config.attract_radius,
            config.attract_strength,
        );

        particle.clamp_speed(config.max_speed);
        particle.integrate();
        particle.wrap(width, height);
    }

    /// Pixel dimensions as floats.
    #[expect(
        clippy::cast_precision_loss,
        clippy::as_conversions,
        reason = "Viewports are nowhere near big enough to lose precision"
    )]
    fn dimensions(width: usize, height: usize) -> (f32, f32) {
        (width as f32, height as f32)
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::float_cmp,
    reason = "Tests aren't so strict"
)]
mod test {
    use rand::SeedableRng as _;

    use super::*;
    use crate::config::ConfigColour;
    use crate::particle::WRAP_MARGIN;
    use crate::surface::{RED, WHITE};

    fn seeded() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    fn still_config() -> FieldConfig {
        FieldConfig {
            spring_home: 0.0,
            drift: 0.0,
            initial_velocity: 0.0,
            link_radius: 0.0,
            ..FieldConfig::default()
        }
    }

    #[test]
    fn count_scales_with_area() {
        let field = ParticleField::new_with_rng(FieldConfig::default(), 800, 600, seeded());
        assert_eq!(field.particles().len(), 48);
    }

    #[test]
    fn count_has_a_floor_and_a_ceiling() {
        let config = FieldConfig::default();
        assert_eq!(ParticleField::particle_count_for(80.0, 48.0, &config), 40);
        assert_eq!(ParticleField::particle_count_for(0.0, 0.0, &config), 40);
        assert_eq!(
            ParticleField::particle_count_for(4000.0, 4000.0, &config),
            240
        );

        let tiny_cap = FieldConfig {
            max_particles: 10,
            ..FieldConfig::default()
        };
        assert_eq!(
            ParticleField::particle_count_for(800.0, 600.0, &tiny_cap),
            10
        );
    }

    #[test]
    fn growing_only_appends() {
        let mut field = ParticleField::new_with_rng(FieldConfig::default(), 800, 600, seeded());
        let before = field.particles().to_vec();

        field.resize(1000, 1000);
        assert_eq!(field.particles().len(), 100);
        assert_eq!(&field.particles()[..before.len()], before.as_slice());
    }

    #[test]
    fn shrinking_truncates_from_the_end() {
        let mut field = ParticleField::new_with_rng(FieldConfig::default(), 1000, 1000, seeded());
        let before = field.particles().to_vec();

        field.resize(800, 600);
        assert_eq!(field.particles().len(), 48);
        assert_eq!(field.particles(), &before[..48]);
    }

    #[test]
    fn speed_and_position_stay_bounded() {
        let config = FieldConfig {
            drift: 2.0,
            attract_strength: 5.0,
            ..FieldConfig::default()
        };
        let (width, height) = (120, 60);
        let mut field = ParticleField::new_with_rng(config, width, height, seeded());
        let mut surface = Surface::new(width, height);
        field.pointer_move(Vec2::new(60.0, 30.0));

        for frame in 0..300 {
            if frame == 150 {
                field.pointer_leave();
            }
            field.tick(&mut surface).unwrap();
            for particle in field.particles() {
                assert!(particle.velocity.length() <= 1.6 + 1e-5);
                assert!(particle.position.x >= -WRAP_MARGIN);
                assert!(particle.position.x <= 120.0 + WRAP_MARGIN);
                assert!(particle.position.y >= -WRAP_MARGIN);
                assert!(particle.position.y <= 60.0 + WRAP_MARGIN);
            }
        }
    }

    #[test]
    fn inactive_pointer_adds_no_attraction() {
        let mut field = ParticleField::new_with_rng(still_config(), 100, 100, seeded());
        let before = field.particles().to_vec();
        let mut surface = Surface::new(100, 100);

        field.tick(&mut surface).unwrap();
        assert_eq!(field.particles(), before.as_slice());
    }

    #[test]
    fn active_pointer_pulls_particles_in() {
        let mut field = ParticleField::new_with_rng(still_config(), 100, 100, seeded());
        field.particles = vec![Particle::new(Vec2::new(30.0, 50.0), 1.0)];
        field.pointer_move(Vec2::new(100.0, 50.0));
        let mut surface = Surface::new(100, 100);

        field.tick(&mut surface).unwrap();
        let particle = &field.particles()[0];
        assert!((particle.velocity.x - 0.08).abs() < 1e-6);
        assert_eq!(particle.velocity.y, 0.0);
        assert!((particle.position.x - 30.08).abs() < 1e-4);
    }

    #[test]
    fn pointer_on_top_of_a_particle_is_safe() {
        let mut field = ParticleField::new_with_rng(still_config(), 200, 200, seeded());
        field.particles = vec![Particle::new(Vec2::new(100.0, 100.0), 1.0)];
        field.pointer_move(Vec2::new(100.0, 100.0));
        let mut surface = Surface::new(200, 200);

        field.tick(&mut surface).unwrap();
        let particle = &field.particles()[0];
        assert!(particle.velocity.is_finite());
        assert!(particle.position.is_finite());
    }

    #[test]
    fn particles_wrap_around() {
        let mut field = ParticleField::new_with_rng(still_config(), 800, 600, seeded());
        field.particles = vec![Particle::new(Vec2::new(825.0, 300.0), 1.0)];
        let mut surface = Surface::new(800, 600);

        field.tick(&mut surface).unwrap();
        assert_eq!(field.particles()[0].position, Vec2::new(-20.0, 300.0));
    }

    #[test]
    fn link_alpha_fades_with_distance() {
        assert_eq!(ParticleField::link_alpha(0.0, 65.0), 1.0);
        assert_eq!(ParticleField::link_alpha(65.0, 65.0), 0.0);
        assert_eq!(ParticleField::link_alpha(100.0, 65.0), 0.0);

        let mut previous = f32::MAX;
        for step in 0..=65_u8 {
            let alpha = ParticleField::link_alpha(f32::from(step), 65.0);
            assert!(alpha < previous);
            previous = alpha;
        }
    }

    #[test]
    fn links_are_drawn_beneath_particles() {
        let config = FieldConfig {
            particle_colour: ConfigColour(WHITE),
            particle_opacity: 1.0,
            link_radius: 65.0,
            link_colour: ConfigColour(RED),
            link_opacity: 1.0,
            ..still_config()
        };
        let mut field = ParticleField::new_with_rng(config, 12, 5, seeded());
        field.particles = vec![
            Particle::new(Vec2::new(2.5, 2.5), 0.4),
            Particle::new(Vec2::new(8.5, 2.5), 0.4),
        ];
        let mut surface = Surface::new(12, 5);

        field.tick(&mut surface).unwrap();

        let link = surface.get_pixel(5, 2).unwrap();
        assert_eq!(link.0, 1.0);
        assert_eq!(link.1, 0.0);
        assert!((link.3 - (1.0 - 6.0 / 65.0)).abs() < 1e-5);

        let particle = surface.get_pixel(2, 2).unwrap();
        assert!(particle.1 > 0.99);
        assert!(particle.3 > 0.99);
    }

    #[test]
    fn no_links_when_disabled() {
        let mut field = ParticleField::new_with_rng(still_config(), 12, 5, seeded());
        field.particles = vec![
            Particle::new(Vec2::new(2.5, 2.5), 0.4),
            Particle::new(Vec2::new(8.5, 2.5), 0.4),
        ];
        let mut surface = Surface::new(12, 5);

        field.tick(&mut surface).unwrap();
        assert!(surface.get_pixel(5, 2).is_none());
        assert_eq!(surface.pixels().len(), 2);
    }

    #[test]
    fn background_fills_the_surface() {
        let config = FieldConfig {
            background_colour: Some(ConfigColour(RED)),
            ..still_config()
        };
        let mut field = ParticleField::new_with_rng(config, 6, 4, seeded());
        field.particles.clear();
        let mut surface = Surface::new(6, 4);

        field.tick(&mut surface).unwrap();
        assert_eq!(surface.pixels().len(), 24);
        assert_eq!(surface.get_pixel(5, 3), Some(RED));
    }
}
