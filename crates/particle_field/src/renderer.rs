//! Drive the particle field: receive protocol messages from the host and send it rendered frames.

use std::{collections::VecDeque, io::Write as _};

use color_eyre::eyre::Result;
use glam::Vec2;

use particle_field_protocol::{Pixel, PluginInputMessages, PluginOutputMessages};

use crate::config::{Config, FieldConfig};
use crate::field::ParticleField;
use crate::surface::Surface;

/// The number of microseconds in a second.
pub const ONE_MICROSECOND: u64 = 1_000_000;

/// The number of recent render durations used to calculate the average frame rate.
const DURATIONS_WINDOW: usize = 30;

/// The current state of the host's terminal.
struct TTY {
    /// The size of the terminal in columns and rows.
    size: (u16, u16),
}

/// `Renderer`
pub struct Renderer {
    /// Details about the host's terminal.
    tty: TTY,
    /// Used to create the field once the terminal size is known.
    field_config: FieldConfig,
    /// All the particles. `None` until the host has told us how big the terminal is.
    field: Option<ParticleField>,
    /// The pixels of the current frame.
    surface: Surface,
    /// The target frame rate.
    frame_rate: u32,
    /// Durations of recent render ticks.
    durations: VecDeque<f64>,
    /// The time at which the previous frame was rendered.
    last_frame_tick: tokio::time::Instant,
}

impl Renderer {
    /// Instantiate
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            tty: TTY { size: (0, 0) },
            field_config: config.field.clone(),
            field: None,
            surface: Surface::new(0, 0),
            frame_rate: config.frame_rate,
            durations: VecDeque::default(),
            last_frame_tick: tokio::time::Instant::now(),
        }
    }

    /// Our main entrypoint. Runs until the host closes our STDIN.
    pub async fn start(
        config: &Config,
        mut messages: tokio::sync::mpsc::Receiver<PluginInputMessages>,
    ) -> Result<()> {
        let mut renderer = Self::new(config);

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = renderer.sleep_until_next_frame_tick() => {
                    if let Some(pixels) = renderer.render()? {
                        Self::send_output(pixels)?;
                    }
                },
                maybe_message = messages.recv() => {
                    let Some(message) = maybe_message else {
                        tracing::debug!("Host closed the message stream");
                        break;
                    };
                    renderer.handle_message(message);
                }
            }
        }

        Ok(())
    }

    /// Sleep until the next frame render is due.
    pub async fn sleep_until_next_frame_tick(&mut self) {
        let target = ONE_MICROSECOND.wrapping_div(self.frame_rate.max(1).into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = tokio::time::Instant::now();
    }

    /// Is there anything to render to?
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.tty.size.0 > 0 && self.tty.size.1 > 0
    }

    /// The particle field, once it exists.
    #[must_use]
    pub const fn field(&self) -> Option<&ParticleField> {
        self.field.as_ref()
    }

    /// The surface size in pixels. Every terminal row holds 2 pixels.
    #[must_use]
    pub fn surface_size(&self) -> (usize, usize) {
        (
            usize::from(self.tty.size.0),
            usize::from(self.tty.size.1) * 2,
        )
    }

    /// Convert the cell under the pointer into the pixel at the centre of that cell.
    #[must_use]
    pub fn pointer_to_pixels(coordinates: (u16, u16)) -> Vec2 {
        Vec2::new(
            f32::from(coordinates.0) + 0.5,
            f32::from(coordinates.1) * 2.0 + 1.0,
        )
    }

    /// Handle a protocol message from the host.
    pub fn handle_message(&mut self, message: PluginInputMessages) {
        tracing::trace!("Received protocol message: {message:?}");

        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "The protocol is `#[non_exhaustive]` so we always have to handle new kinds"
        )]
        match message {
            PluginInputMessages::TTYResize { width, height } => self.resize(width, height),
            PluginInputMessages::PointerMove { coordinates } => match self.field.as_mut() {
                Some(field) => field.pointer_move(Self::pointer_to_pixels(coordinates)),
                None => tracing::debug!("Ignoring pointer move before the terminal size is known"),
            },
            PluginInputMessages::PointerLeave => {
                if let Some(field) = self.field.as_mut() {
                    field.pointer_leave();
                }
            }
            _ => tracing::warn!("Unhandled protocol message"),
        }
    }

    /// Resize the surface and rebalance the particles. The field is created the first time we
    /// know the size of the terminal.
    fn resize(&mut self, width: u16, height: u16) {
        self.tty.size = (width, height);
        let (surface_width, surface_height) = self.surface_size();
        self.surface.resize(surface_width, surface_height);

        match self.field.as_mut() {
            Some(field) => field.resize(surface_width, surface_height),
            None => {
                if self.is_ready() {
                    self.field = Some(ParticleField::new(
                        self.field_config.clone(),
                        surface_width,
                        surface_height,
                    ));
                }
            }
        }
    }

    /// Tick the simulation and return the frame's pixels. Nothing is rendered until the host has
    /// told us the size of the terminal.
    pub fn render(&mut self) -> Result<Option<Vec<Pixel>>> {
        if !self.is_ready() {
            return Ok(None);
        }
        let Some(field) = self.field.as_mut() else {
            return Ok(None);
        };

        let start = std::time::Instant::now();

        field.tick(&mut self.surface)?;
        let pixels = self.surface.pixels();

        self.durations.push_front(start.elapsed().as_secs_f64());
        if self.durations.len() > DURATIONS_WINDOW {
            self.durations.pop_back();
        }

        #[expect(
            clippy::as_conversions,
            clippy::cast_precision_loss,
            reason = "This is just debugging output"
        )]
        let average_tick = self.durations.iter().sum::<f64>() / self.durations.len() as f64;
        tracing::trace!(
            "Rendered {} pixels, potential FPS: {:.3}",
            pixels.len(),
            1.0 / average_tick
        );

        Ok(Some(pixels))
    }

    /// Serialise a frame of pixels into a single line of JSON.
    pub fn frame_json(pixels: Vec<Pixel>) -> Result<String> {
        Ok(serde_json::to_string(
            &PluginOutputMessages::OutputPixels(pixels),
        )?)
    }

    /// Send pixel data to the host for rendering.
    fn send_output(pixels: Vec<Pixel>) -> Result<()> {
        let json = Self::frame_json(pixels)?;
        let mut stdout = std::io::stdout().lock();
        let result = writeln!(stdout, "{json}").and_then(|()| stdout.flush());
        if let Err(error) = result {
            tracing::error!("Error sending json to the host: {error:?}");
        }
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::float_cmp, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(&Config::default())
    }

    #[test]
    fn nothing_renders_before_a_resize() {
        let mut renderer = renderer();
        assert!(!renderer.is_ready());
        assert!(renderer.render().unwrap().is_none());

        renderer.handle_message(PluginInputMessages::PointerMove {
            coordinates: (1, 1),
        });
        assert!(renderer.field().is_none());
    }

    #[test]
    fn resizing_creates_then_rebalances_the_field() {
        let mut renderer = renderer();
        renderer.handle_message(PluginInputMessages::TTYResize {
            width: 80,
            height: 24,
        });
        assert_eq!(renderer.surface_size(), (80, 48));
        assert_eq!(renderer.field().unwrap().particles().len(), 40);

        renderer.handle_message(PluginInputMessages::TTYResize {
            width: 400,
            height: 200,
        });
        assert_eq!(renderer.surface_size(), (400, 400));
        assert_eq!(renderer.field().unwrap().particles().len(), 40);

        renderer.handle_message(PluginInputMessages::TTYResize {
            width: 1000,
            height: 500,
        });
        assert_eq!(renderer.field().unwrap().particles().len(), 100);
    }

    #[test]
    fn pointer_is_tracked_in_pixels() {
        let mut renderer = renderer();
        renderer.handle_message(PluginInputMessages::TTYResize {
            width: 80,
            height: 24,
        });

        renderer.handle_message(PluginInputMessages::PointerMove {
            coordinates: (10, 5),
        });
        let pointer = renderer.field().unwrap().pointer();
        assert!(pointer.is_active);
        assert_eq!(pointer.position, Vec2::new(10.5, 11.0));

        renderer.handle_message(PluginInputMessages::PointerLeave);
        let pointer = renderer.field().unwrap().pointer();
        assert!(!pointer.is_active);
        assert_eq!(pointer.position, crate::pointer::INACTIVE_POSITION);
    }

    #[test]
    fn renders_pixels_inside_the_surface() {
        let mut renderer = renderer();
        renderer.handle_message(PluginInputMessages::TTYResize {
            width: 80,
            height: 24,
        });

        let pixels = renderer.render().unwrap().unwrap();
        assert!(!pixels.is_empty());
        for pixel in pixels {
            assert!(pixel.coordinates.0 < 80);
            assert!(pixel.coordinates.1 < 48);
        }
    }

    #[test]
    fn frames_are_single_lines_of_json() {
        let json = Renderer::frame_json(vec![Pixel::builder()
            .coordinates((1, 2))
            .color((0.5, 0.5, 0.5, 1.0))
            .build()])
        .unwrap();
        assert!(!json.contains('\n'));
        assert!(json.starts_with("{\"output_pixels\":"));
    }
}
