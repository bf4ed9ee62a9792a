// THEORY:
// The `Pixel` module is the most fundamental unit of the measurement engine. It is a
// "dumb" data container for a single RGBA pixel plus the two single-pixel
// heuristics the ruler needs: a weighted lightness used for every boundary
// decision, and an HSL view of the colour used for cosmetic comparisons.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbours. Scanning lives in the
//    ray and area scanners.
// 2) Reproducibility: both heuristics are computed with plain f64 arithmetic in a
//    fixed order so thresholds applied downstream behave identically everywhere.

pub mod pixel {
    use crate::core_modules::hsl::hsl::{Hsl, rgb_to_hsl};

    pub type Channel = u8;
    /// Weighted grayscale value of a pixel, 0..=255. Stored signed so that the
    /// flood fill can use 256 as its "visited" mark and deltas never underflow.
    pub type Lightness = i16;

    pub const CHANNELS: usize = 4;

    const RED_WEIGHT: f64 = 0.3;
    const GREEN_WEIGHT: f64 = 0.59;
    const BLUE_WEIGHT: f64 = 0.11;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255). Ignored by every heuristic.
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Weighted grayscale: `round(0.3 R + 0.59 G + 0.11 B)`.
        ///
        /// The weights sum to one, so any 8-bit input lands in 0..=255 without clamping.
        pub fn lightness(&self) -> Lightness {
            let weighted = self.red as f64 * RED_WEIGHT
                + self.green as f64 * GREEN_WEIGHT
                + self.blue as f64 * BLUE_WEIGHT;
            weighted.round() as Lightness
        }

        pub fn hsl(&self) -> Hsl {
            rgb_to_hsl(self.red, self.green, self.blue)
        }
    }

    impl From<&[u8]> for Pixel {
        /// Reads the first four bytes as R, G, B, A. Missing bytes read as zero.
        fn from(bytes: &[u8]) -> Self {
            let channel = |i: usize| bytes.get(i).copied().unwrap_or_default();
            Pixel::new(channel(0), channel(1), channel(2), channel(3))
        }
    }
}
