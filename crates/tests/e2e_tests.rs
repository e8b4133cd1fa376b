//! End to end tests
#[cfg(test)]
mod e2e {
    use particle_field::{config::Config, renderer::Renderer, run::parse_message};
    use particle_field_protocol::{Pixel, PluginOutputMessages};

    /// Feed raw JSON lines from the "host" into a renderer, just like STDIN does.
    fn send_lines(renderer: &mut Renderer, lines: &[&str]) {
        for line in lines {
            if let Some(message) = parse_message(line).unwrap() {
                renderer.handle_message(message);
            }
        }
    }

    /// Render a frame and round trip it through the JSON that the host would receive.
    fn next_frame(renderer: &mut Renderer) -> Vec<Pixel> {
        let pixels = renderer.render().unwrap().unwrap();
        let json = Renderer::frame_json(pixels).unwrap();
        let output: PluginOutputMessages = serde_json::from_str(&json).unwrap();
        match output {
            PluginOutputMessages::OutputPixels(pixels) => pixels,
            _ => panic!("Unexpected output message"),
        }
    }

    fn config_from(toml: &str) -> Config {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), toml).unwrap();
        Config::load(Some(file.path().to_path_buf())).unwrap()
    }

    #[test]
    fn frames_only_start_once_the_size_is_known() {
        let mut renderer = Renderer::new(&Config::default());
        send_lines(&mut renderer, &[r#"{"pointer_move":{"coordinates":[3,3]}}"#]);
        assert!(renderer.render().unwrap().is_none());

        send_lines(&mut renderer, &[r#"{"tty_resize":{"width":50,"height":10}}"#]);
        let pixels = next_frame(&mut renderer);
        assert!(!pixels.is_empty());
        for pixel in pixels {
            assert!(pixel.coordinates.0 < 50);
            assert!(pixel.coordinates.1 < 20);
        }
    }

    #[test]
    fn particles_gather_around_the_pointer() {
        let config = config_from(
            "
            [field]
            drift = 0.0
            spring_home = 0.0
            link_radius = 0.0
            attract_radius = 1000.0
            attract_strength = 1.0
            ",
        );
        let mut renderer = Renderer::new(&config);
        send_lines(
            &mut renderer,
            &[
                r#"{"tty_resize":{"width":100,"height":50}}"#,
                r#"{"pointer_move":{"coordinates":[50,25]}}"#,
            ],
        );

        let pointer = Renderer::pointer_to_pixels((50, 25));
        let average_distance = |renderer: &Renderer| {
            let particles = renderer.field().unwrap().particles();
            let total: f32 = particles
                .iter()
                .map(|particle| particle.position.distance(pointer))
                .sum();
            total / f32::from(u8::try_from(particles.len()).unwrap())
        };

        let before = average_distance(&renderer);
        for _ in 0..10 {
            next_frame(&mut renderer);
        }
        let after = average_distance(&renderer);
        assert!(after < before, "{after} is not closer than {before}");

        send_lines(&mut renderer, &["\"pointer_leave\""]);
        assert!(!renderer.field().unwrap().pointer().is_active);
    }

    #[test]
    fn resizing_rebalances_without_disturbing_particles() {
        let config = config_from(
            "
            [field]
            area_per_particle = 100.0
            ",
        );
        let mut renderer = Renderer::new(&config);
        send_lines(&mut renderer, &[r#"{"tty_resize":{"width":80,"height":40}}"#]);
        assert_eq!(renderer.field().unwrap().particles().len(), 64);
        next_frame(&mut renderer);
        let before = renderer.field().unwrap().particles().to_vec();

        send_lines(&mut renderer, &[r#"{"tty_resize":{"width":160,"height":40}}"#]);
        let grown = renderer.field().unwrap().particles();
        assert_eq!(grown.len(), 128);
        assert_eq!(&grown[..64], before.as_slice());

        send_lines(&mut renderer, &[r#"{"tty_resize":{"width":40,"height":40}}"#]);
        let shrunk = renderer.field().unwrap().particles();
        assert_eq!(shrunk.len(), 40);
        assert_eq!(shrunk, &before[..40]);

        for pixel in next_frame(&mut renderer) {
            assert!(pixel.coordinates.0 < 40);
            assert!(pixel.coordinates.1 < 80);
        }
    }
}
