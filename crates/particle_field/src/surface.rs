//! A raster of pixels that the particle field is drawn onto.
//!
//! A pixel is half a terminal cell, so the surface of a terminal with `rows` rows is `rows * 2`
//! pixels high. Every primitive composites onto whatever is already there.

use color_eyre::eyre::{bail, Result};
use glam::Vec2;
use palette::blend::Compose as _;

use particle_field_protocol::Colour;

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// A default pure black.
pub const BLACK: Colour = (0.0, 0.0, 0.0, 1.0);

/// A default pure red.
pub const RED: Colour = (1.0, 0.0, 0.0, 1.0);

/// `Surface`
#[derive(Clone, Debug)]
pub struct Surface {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Row-major pixels. `None` is a transparent pixel.
    pixels: Vec<Option<Colour>>,
}

impl Surface {
    /// Create a blank surface.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; width.saturating_mul(height)],
        }
    }

    /// Change the dimensions. All pixels are cleared.
    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(None);
    }

    /// Get the colour of a single pixel.
    #[must_use]
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Colour> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied().flatten()
    }

    /// Composite a colour onto a single pixel. `alpha` is multiplied into the colour's own alpha.
    pub fn add_pixel(&mut self, x: usize, y: usize, colour: Colour, alpha: f32) -> Result<()> {
        if x >= self.width {
            bail!("Tried to add pixel to column: {x}")
        }
        if y >= self.height {
            bail!("Tried to add pixel to row: {y}")
        }

        let index = y * self.width + x;
        let Some(pixel) = self.pixels.get_mut(index) else {
            bail!("No pixel at index: {index}")
        };

        let incoming = (colour.0, colour.1, colour.2, colour.3 * alpha);
        *pixel = Some(match *pixel {
            Some(existing) => Self::over(incoming, existing),
            None => incoming,
        });

        Ok(())
    }

    /// Fill an axis-aligned rectangle. Parts outside the surface are ignored.
    pub fn fill_rect(
        &mut self,
        origin: Vec2,
        size: Vec2,
        colour: Colour,
        alpha: f32,
    ) -> Result<()> {
        let Some((left, right)) = Self::clip_span(origin.x, origin.x + size.x, self.width) else {
            return Ok(());
        };
        let Some((top, bottom)) = Self::clip_span(origin.y, origin.y + size.y, self.height) else {
            return Ok(());
        };

        for y in top..bottom {
            for x in left..right {
                self.add_pixel(x, y, colour, alpha)?;
            }
        }

        Ok(())
    }

    /// Draw a 1 pixel wide line. Parts outside the surface are ignored.
    pub fn stroke_line(&mut self, from: Vec2, to: Vec2, colour: Colour, alpha: f32) -> Result<()> {
        let delta = to - from;
        let steps = delta.x.abs().max(delta.y.abs()).round().max(1.0);
        let increment = delta / steps;

        #[expect(
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation,
            clippy::as_conversions,
            reason = "The step count is positive and bounded by the surface size"
        )]
        let step_count = steps as usize;

        let mut point = from;
        let mut previous = None;
        for _ in 0..=step_count {
            let current = self.pixel_at(point);
            if let Some((x, y)) = current {
                if current != previous {
                    self.add_pixel(x, y, colour, alpha)?;
                }
            }
            previous = current;
            point += increment;
        }

        Ok(())
    }

    /// Fill a circle. Every pixel whose centre is inside the radius is drawn, as is the pixel
    /// containing the centre, so that tiny circles are still visible.
    pub fn fill_circle(
        &mut self,
        centre: Vec2,
        radius: f32,
        colour: Colour,
        alpha: f32,
    ) -> Result<()> {
        let centre_pixel = self.pixel_at(centre);
        if let Some((x, y)) = centre_pixel {
            self.add_pixel(x, y, colour, alpha)?;
        }

        let Some((left, right)) =
            Self::clip_span(centre.x - radius, centre.x + radius + 1.0, self.width)
        else {
            return Ok(());
        };
        let Some((top, bottom)) =
            Self::clip_span(centre.y - radius, centre.y + radius + 1.0, self.height)
        else {
            return Ok(());
        };

        for y in top..bottom {
            for x in left..right {
                if centre_pixel == Some((x, y)) {
                    continue;
                }
                if Self::pixel_centre(x, y).distance(centre) <= radius {
                    self.add_pixel(x, y, colour, alpha)?;
                }
            }
        }

        Ok(())
    }

    /// Convert all the visible pixels into protocol pixels, ready to send to the host.
    #[must_use]
    pub fn pixels(&self) -> Vec<particle_field_protocol::Pixel> {
        let mut pixels = Vec::new();
        for (index, maybe_colour) in self.pixels.iter().enumerate() {
            let Some(colour) = maybe_colour else {
                continue;
            };
            if colour.3 <= 0.0 {
                continue;
            }
            let (Ok(x), Ok(y)) = (
                u32::try_from(index % self.width),
                u32::try_from(index / self.width),
            ) else {
                continue;
            };
            pixels.push(
                particle_field_protocol::Pixel::builder()
                    .coordinates((x, y))
                    .color(*colour)
                    .build(),
            );
        }
        pixels
    }

    /// Porter-Duff "over", done in linear light.
    fn over(above: Colour, below: Colour) -> Colour {
        let above_linear: palette::LinSrgba =
            palette::Srgba::new(above.0, above.1, above.2, above.3).into_linear();
        let below_linear: palette::LinSrgba =
            palette::Srgba::new(below.0, below.1, below.2, below.3).into_linear();
        let result = palette::Srgba::from_linear(above_linear.over(below_linear));
        (result.red, result.green, result.blue, result.alpha)
    }

    /// The centre of a pixel in surface space.
    #[expect(
        clippy::cast_precision_loss,
        clippy::as_conversions,
        reason = "Surfaces are nowhere near big enough to lose precision"
    )]
    fn pixel_centre(x: usize, y: usize) -> Vec2 {
        Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
    }

    /// The pixel containing a point, if it's on the surface.
    fn pixel_at(&self, point: Vec2) -> Option<(usize, usize)> {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }

        #[expect(
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation,
            clippy::as_conversions,
            reason = "We've checked the point is finite and positive"
        )]
        let (x, y) = (point.x.floor() as usize, point.y.floor() as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((x, y))
    }

    /// Clip a half-open span of surface space to whole pixels inside `0..extent`.
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::as_conversions,
        reason = "Values are clamped to the surface before casting"
    )]
    fn clip_span(start: f32, end: f32, extent: usize) -> Option<(usize, usize)> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        let extent_f32 = extent as f32;
        let first = start.floor().clamp(0.0, extent_f32);
        let last = end.floor().clamp(0.0, extent_f32);
        if first >= last {
            return None;
        }
        Some((first as usize, last as usize))
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::float_cmp,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    fn assert_colour_near(left: Colour, right: Colour) {
        let delta = (left.0 - right.0).abs()
            + (left.1 - right.1).abs()
            + (left.2 - right.2).abs()
            + (left.3 - right.3).abs();
        assert!(delta < 0.001, "{left:?} != {right:?}");
    }

    #[test]
    fn add_new_pixels() {
        let mut surface = Surface::new(2, 4);
        assert_eq!(surface.get_pixel(0, 0), None);

        surface.add_pixel(0, 0, WHITE, 1.0).unwrap();
        assert_eq!(surface.get_pixel(0, 0), Some(WHITE));

        surface.add_pixel(1, 3, RED, 0.5).unwrap();
        assert_eq!(surface.get_pixel(1, 3), Some((1.0, 0.0, 0.0, 0.5)));

        let result = surface.add_pixel(1, 4, WHITE, 1.0).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to row: 4"
        );
    }

    #[test]
    fn opaque_pixels_cover_what_is_below() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel(0, 0, RED, 1.0).unwrap();
        surface.add_pixel(0, 0, WHITE, 1.0).unwrap();
        assert_colour_near(surface.get_pixel(0, 0).unwrap(), WHITE);
    }

    #[test]
    fn translucent_pixels_blend() {
        let mut surface = Surface::new(1, 1);
        surface.add_pixel(0, 0, BLACK, 1.0).unwrap();
        surface.add_pixel(0, 0, WHITE, 0.5).unwrap();
        let colour = surface.get_pixel(0, 0).unwrap();
        assert!(colour.0 > 0.1 && colour.0 < 0.9);
        assert!((colour.3 - 1.0).abs() < 0.001);
    }

    #[test]
    fn clearing() {
        let mut surface = Surface::new(3, 3);
        surface.fill_rect(Vec2::ZERO, Vec2::new(3.0, 3.0), RED, 1.0).unwrap();
        assert_eq!(surface.pixels().len(), 9);
        surface.clear();
        assert!(surface.pixels().is_empty());
    }

    #[test]
    fn rectangles_are_clipped() {
        let mut surface = Surface::new(4, 4);
        surface
            .fill_rect(Vec2::new(-10.0, 2.0), Vec2::new(12.0, 10.0), RED, 1.0)
            .unwrap();
        assert_eq!(surface.pixels().len(), 4);
        assert_eq!(surface.get_pixel(1, 3), Some(RED));
        assert_eq!(surface.get_pixel(2, 3), None);
        assert_eq!(surface.get_pixel(1, 1), None);
    }

    #[test]
    fn horizontal_line() {
        let mut surface = Surface::new(10, 3);
        surface
            .stroke_line(Vec2::new(1.5, 1.5), Vec2::new(8.5, 1.5), WHITE, 1.0)
            .unwrap();
        for x in 1..=8 {
            assert_eq!(surface.get_pixel(x, 1), Some(WHITE), "x = {x}");
        }
        assert_eq!(surface.get_pixel(0, 1), None);
        assert_eq!(surface.get_pixel(9, 1), None);
        assert_eq!(surface.pixels().len(), 8);
    }

    #[test]
    fn diagonal_line() {
        let mut surface = Surface::new(6, 6);
        surface
            .stroke_line(Vec2::new(0.5, 0.5), Vec2::new(4.5, 4.5), WHITE, 0.5)
            .unwrap();
        for i in 0..=4 {
            assert_eq!(
                surface.get_pixel(i, i),
                Some((1.0, 1.0, 1.0, 0.5)),
                "i = {i}"
            );
        }
        assert_eq!(surface.pixels().len(), 5);
    }

    #[test]
    fn steep_line_has_one_pixel_per_row() {
        let mut surface = Surface::new(6, 10);
        surface
            .stroke_line(Vec2::new(1.5, 0.5), Vec2::new(3.5, 8.5), WHITE, 1.0)
            .unwrap();

        let pixels = surface.pixels();
        assert_eq!(pixels.len(), 9);
        for y in 0..=8 {
            let in_row = pixels.iter().filter(|pixel| pixel.coordinates.1 == y).count();
            assert_eq!(in_row, 1, "y = {y}");
        }
        assert_eq!(surface.get_pixel(1, 0), Some(WHITE));
        assert_eq!(surface.get_pixel(2, 4), Some(WHITE));
        assert_eq!(surface.get_pixel(3, 8), Some(WHITE));
    }

    #[test]
    fn line_steps_landing_in_the_same_pixel_only_blend_once() {
        let mut surface = Surface::new(4, 1);
        surface
            .stroke_line(Vec2::new(0.1, 0.5), Vec2::new(1.7, 0.5), WHITE, 0.5)
            .unwrap();
        assert_eq!(surface.pixels().len(), 2);
        assert_eq!(surface.get_pixel(0, 0), Some((1.0, 1.0, 1.0, 0.5)));
        assert_eq!(surface.get_pixel(1, 0), Some((1.0, 1.0, 1.0, 0.5)));
    }

    #[test]
    fn lines_off_the_surface_are_clipped() {
        let mut surface = Surface::new(5, 5);
        surface
            .stroke_line(Vec2::new(-20.0, -20.0), Vec2::new(2.5, 2.5), WHITE, 1.0)
            .unwrap();
        assert_eq!(surface.get_pixel(0, 0), Some(WHITE));
        assert_eq!(surface.get_pixel(2, 2), Some(WHITE));
        assert_eq!(surface.get_pixel(4, 4), None);
    }

    #[test]
    fn tiny_circles_are_still_drawn() {
        let mut surface = Surface::new(5, 5);
        surface
            .fill_circle(Vec2::new(2.2, 2.7), 0.1, WHITE, 1.0)
            .unwrap();
        assert_eq!(surface.pixels().len(), 1);
        assert_eq!(surface.get_pixel(2, 2), Some(WHITE));
    }

    #[test]
    fn circle_pixels_are_only_drawn_once() {
        let mut surface = Surface::new(10, 10);
        surface
            .fill_circle(Vec2::new(5.0, 5.0), 1.2, WHITE, 0.5)
            .unwrap();
        let pixels = surface.pixels();
        assert_eq!(pixels.len(), 4);
        for pixel in pixels {
            assert_eq!(pixel.color.unwrap().3, 0.5);
        }
    }

    #[test]
    fn circles_off_the_surface_are_clipped() {
        let mut surface = Surface::new(10, 10);
        surface
            .fill_circle(Vec2::new(-20.0, -20.0), 2.0, WHITE, 1.0)
            .unwrap();
        assert!(surface.pixels().is_empty());

        surface
            .fill_circle(Vec2::new(0.0, 0.0), 1.2, WHITE, 1.0)
            .unwrap();
        assert_eq!(surface.pixels().len(), 1);
    }

    #[test]
    fn protocol_pixels_have_coordinates() {
        let mut surface = Surface::new(3, 2);
        surface.add_pixel(2, 1, RED, 1.0).unwrap();
        let pixels = surface.pixels();
        assert_eq!(pixels.len(), 1);
        assert_eq!(pixels[0].coordinates, (2, 1));
        assert_eq!(pixels[0].color, Some(RED));
    }
}
