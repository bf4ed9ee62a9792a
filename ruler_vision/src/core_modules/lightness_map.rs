// THEORY:
// The `LightnessMap` is the single-channel view of a screenshot that every scanner
// reads. It is computed once per capture by the grayscale reduction and then
// shared read-only between ray scans. A flood fill never touches the shared map:
// it clones a private working copy and marks visited pixels in it with the
// out-of-band value 256, which no real lightness can equal.
//
// All access goes through the bounds-checked `get_at` / `set_at` pair. Scans step
// one pixel past the image edge as a matter of course, so an out-of-range probe
// is an ordinary `None`, never a panic and never a write outside the buffer.

pub mod lightness_map {
    use crate::core_modules::geometry::Point;
    use crate::core_modules::pixel::pixel::{CHANNELS, Lightness, Pixel};
    use crate::core_modules::screenshot::{Screenshot, in_bounds};
    use crate::error::{MeasureError, MeasureResult};

    /// Marks a pixel as already claimed by a flood fill.
    pub const VISITED: Lightness = 256;

    /// Reduces an RGBA buffer to one weighted lightness value per pixel.
    pub fn grayscale(rgba: &[u8]) -> MeasureResult<Vec<Lightness>> {
        if rgba.len() % CHANNELS != 0 {
            return Err(MeasureError::invalid_input(format!(
                "RGBA buffer length {} is not a multiple of {CHANNELS}",
                rgba.len()
            )));
        }
        Ok(rgba
            .chunks_exact(CHANNELS)
            .map(|bytes| Pixel::from(bytes).lightness())
            .collect())
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LightnessMap {
        width: u32,
        height: u32,
        values: Vec<Lightness>,
    }

    impl LightnessMap {
        pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> MeasureResult<Self> {
            let expected = width as usize * height as usize;
            if expected == 0 {
                return Err(MeasureError::invalid_input(format!(
                    "lightness map dimensions must be non-zero, got {width}x{height}"
                )));
            }
            let values = grayscale(rgba)?;
            if values.len() != expected {
                return Err(MeasureError::invalid_input(format!(
                    "expected {expected} pixels for {width}x{height}, got {}",
                    values.len()
                )));
            }
            Ok(Self {
                width,
                height,
                values,
            })
        }

        pub fn from_screenshot(screenshot: &Screenshot) -> MeasureResult<Self> {
            Self::from_rgba(screenshot.width(), screenshot.height(), screenshot.data())
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn in_bounds(&self, point: Point) -> bool {
            in_bounds(point, self.width, self.height)
        }

        fn index(&self, point: Point) -> Option<usize> {
            self.in_bounds(point)
                .then(|| point.y as usize * self.width as usize + point.x as usize)
        }

        pub fn get_at(&self, point: Point) -> Option<Lightness> {
            self.index(point).map(|index| self.values[index])
        }

        /// Writes `value` and returns it, or returns `None` without writing when the
        /// point lies outside the map.
        pub fn set_at(&mut self, point: Point, value: Lightness) -> Option<Lightness> {
            let index = self.index(point)?;
            self.values[index] = value;
            Some(value)
        }

        pub fn mark_visited(&mut self, point: Point) -> Option<Lightness> {
            self.set_at(point, VISITED)
        }

        pub fn visited_count(&self) -> usize {
            self.values.iter().filter(|v| **v >= VISITED).count()
        }

        /// Renders the flood fill's marks for the debug overlay: visited pixels are
        /// opaque magenta, everything else fully transparent.
        pub fn visited_overlay(&self) -> image::RgbaImage {
            let mut overlay = image::RgbaImage::new(self.width, self.height);
            for (pixel, value) in overlay.pixels_mut().zip(&self.values) {
                if *value >= VISITED {
                    *pixel = image::Rgba([255, 0, 255, 255]);
                }
            }
            overlay
        }
    }
}
