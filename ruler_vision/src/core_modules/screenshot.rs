// THEORY:
// A `Screenshot` is the raw RGBA raster handed over by the capture collaborator.
// It is owned, validated once at construction and never mutated afterwards: a new
// capture replaces it wholesale. Everything the scanners read is derived from it.

use crate::core_modules::geometry::Point;
use crate::core_modules::hsl::hsl::Hsl;
use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::{MeasureError, MeasureResult};

/// An immutable `width x height` RGBA raster, row-major, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Screenshot {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MeasureResult<Self> {
        if width == 0 || height == 0 {
            return Err(MeasureError::invalid_input(format!(
                "screenshot dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(MeasureError::invalid_input(format!(
                "expected {expected} bytes for a {width}x{height} RGBA buffer, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn contains(&self, point: Point) -> bool {
        in_bounds(point, self.width, self.height)
    }

    pub fn pixel_at(&self, point: Point) -> Option<Pixel> {
        if !self.contains(point) {
            return None;
        }
        let start = (point.y as usize * self.width as usize + point.x as usize) * CHANNELS;
        Some(Pixel::from(&self.data[start..start + CHANNELS]))
    }

    /// HSL colour of the pixel at `point`, or `None` outside the raster.
    pub fn color_at(&self, point: Point) -> Option<Hsl> {
        self.pixel_at(point).map(|pixel| pixel.hsl())
    }
}

impl TryFrom<image::RgbaImage> for Screenshot {
    type Error = MeasureError;

    fn try_from(image: image::RgbaImage) -> MeasureResult<Self> {
        let (width, height) = image.dimensions();
        Screenshot::new(width, height, image.into_raw())
    }
}

/// `0 <= x < width && 0 <= y < height`.
pub fn in_bounds(point: Point, width: u32, height: u32) -> bool {
    point.x >= 0 && point.x < width as i64 && point.y >= 0 && point.y < height as i64
}
