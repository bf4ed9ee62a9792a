// THEORY:
// The `hsl` module is the colour sampler of the engine. Boundary detection never
// looks at colour, only at lightness; the HSL triple exists so the renderer can
// decide whether the surface under the pointer is too close to its own line
// colour and should switch to an alternate one.
//
// The conversion is the textbook RGB -> HSL formula with every component in 0..1.
// Comparisons downstream use fixed tolerances, so the branch order below (red,
// then green, then blue as the maximum) is part of the contract.

pub mod hsl {
    /// A colour in hue/saturation/lightness form, each component in 0.0..=1.0.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Hsl {
        pub h: f64,
        pub s: f64,
        pub l: f64,
    }

    impl Hsl {
        pub fn new(h: f64, s: f64, l: f64) -> Self {
            Self { h, s, l }
        }

        pub fn as_array(&self) -> [f64; 3] {
            [self.h, self.s, self.l]
        }

        /// True when every component differs from `other` by at most the matching
        /// entry of `tolerance` (h, s, l order).
        pub fn within(&self, other: &Hsl, tolerance: [f64; 3]) -> bool {
            self.as_array()
                .iter()
                .zip(other.as_array())
                .zip(tolerance)
                .all(|((a, b), t)| (a - b).abs() <= t)
        }
    }

    pub fn rgb_to_hsl(red: u8, green: u8, blue: u8) -> Hsl {
        let r = red as f64 / 255.0;
        let g = green as f64 / 255.0;
        let b = blue as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            // achromatic
            return Hsl::new(0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };

        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsl::new(h / 6.0, s, l)
    }
}

#[cfg(test)]
mod tests {
    use super::hsl::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: Hsl, expected: Hsl) {
        assert!(
            actual.within(&expected, [EPSILON; 3]),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn grays_are_achromatic() {
        for value in 0..=255u8 {
            let hsl = rgb_to_hsl(value, value, value);
            assert_eq!(hsl.h, 0.0);
            assert_eq!(hsl.s, 0.0);
            assert_eq!(hsl.l, value as f64 / 255.0);
        }
    }

    #[test]
    fn primaries_land_on_their_hue() {
        assert_close(rgb_to_hsl(255, 0, 0), Hsl::new(0.0, 1.0, 0.5));
        assert_close(rgb_to_hsl(0, 255, 0), Hsl::new(1.0 / 3.0, 1.0, 0.5));
        assert_close(rgb_to_hsl(0, 0, 255), Hsl::new(2.0 / 3.0, 1.0, 0.5));
    }

    #[test]
    fn red_dominant_with_more_blue_wraps_hue() {
        // magenta-ish: max is red, g < b so the +6 branch applies
        let hsl = rgb_to_hsl(255, 0, 128);
        assert!(hsl.h > 5.0 / 6.0 && hsl.h < 1.0, "hue was {}", hsl.h);
    }

    #[test]
    fn light_colors_use_upper_saturation_branch() {
        // l > 0.5: s = d / (2 - max - min)
        let hsl = rgb_to_hsl(255, 204, 204);
        assert_close(hsl, Hsl::new(0.0, 1.0, 0.9));
    }

    #[test]
    fn within_checks_each_channel_separately() {
        let a = Hsl::new(0.5, 0.5, 0.5);
        let b = Hsl::new(0.6, 0.9, 0.6);
        assert!(a.within(&b, [0.2, 0.5, 0.2]));
        assert!(!a.within(&b, [0.05, 0.5, 0.2]));
    }
}
