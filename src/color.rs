use palette::{FromColor, Srgb};
use serde::{Deserialize, Serialize};

pub use palette::Hsv;

/// Simple RGBA color
///
/// Hosts usually pack colors as ARGB words; `from_argb`/`to_argb`
/// convert to and from that layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a 0xAARRGGBB word
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub const WHITE: Self = Self::from_rgb(255, 255, 255);
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    pub const RED: Self = Self::from_rgb(255, 0, 0);
    pub const GREEN: Self = Self::from_rgb(0, 255, 0);
    pub const BLUE: Self = Self::from_rgb(0, 0, 255);

    /// Same color with a replaced alpha channel
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Hue in degrees, saturation and value in [0, 1]
    pub fn to_hsv(self) -> Hsv {
        let rgb: Srgb = Srgb::new(self.r, self.g, self.b).into_format();
        Hsv::from_color(rgb)
    }

    pub fn from_hsv(hsv: Hsv, a: u8) -> Self {
        let hsv = Hsv::new(
            hsv.hue,
            hsv.saturation.clamp(0.0, 1.0),
            hsv.value.clamp(0.0, 1.0),
        );
        let rgb: Srgb<u8> = Srgb::<f32>::from_color(hsv).into_format();
        Self::from_rgba(rgb.red, rgb.green, rgb.blue, a)
    }

    /// Interpolate along the direct HSV path to `other`.
    ///
    /// Every channel (hue included) moves linearly, so the hue does not take
    /// the short way around the wheel. The endpoints are returned exactly.
    pub fn lerp_hsv(self, other: Self, t: f32) -> Self {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }

        let from = self.to_hsv();
        let to = other.to_hsv();
        let mix = |a: f32, b: f32| a + (b - a) * t;

        let hue = mix(
            from.hue.into_positive_degrees(),
            to.hue.into_positive_degrees(),
        );
        let alpha = mix(self.a as f32, other.a as f32).round() as u8;
        Self::from_hsv(
            Hsv::new(hue, mix(from.saturation, to.saturation), mix(from.value, to.value)),
            alpha,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_packing() {
        let c = Color32::from_argb(0xFFFF8080);
        assert_eq!(c, Color32::from_rgba(255, 128, 128, 255));
        assert_eq!(c.to_argb(), 0xFFFF8080);

        let translucent = Color32::from_argb(0x7C00FF00);
        assert_eq!(translucent.a, 124);
        assert_eq!(translucent.g, 255);
    }

    fn degrees(hsv: Hsv) -> f32 {
        hsv.hue.into_positive_degrees()
    }

    #[test]
    fn test_hsv_primaries() {
        let red = Color32::RED.to_hsv();
        assert!(degrees(red).abs() < 1e-3, "red hue was {}", degrees(red));
        assert!((red.saturation - 1.0).abs() < 1e-6);
        assert!((red.value - 1.0).abs() < 1e-6);

        assert!((degrees(Color32::GREEN.to_hsv()) - 120.0).abs() < 1e-3);
        assert!((degrees(Color32::BLUE.to_hsv()) - 240.0).abs() < 1e-3);

        // Back again
        assert_eq!(Color32::from_hsv(Hsv::new(120.0, 1.0, 1.0), 255), Color32::GREEN);
        assert_eq!(Color32::from_hsv(Hsv::new(360.0, 1.0, 1.0), 255), Color32::RED);
    }

    #[test]
    fn test_gray_has_no_saturation() {
        let gray = Color32::from_rgb(128, 128, 128).to_hsv();
        assert_eq!(gray.saturation, 0.0);
        assert_eq!(Color32::from_hsv(gray, 255), Color32::from_rgb(128, 128, 128));
    }

    #[test]
    fn test_from_hsv_clamps_out_of_range_channels() {
        let c = Color32::from_hsv(Hsv::new(0.0, 2.0, 1.5), 10);
        assert_eq!(c, Color32::from_rgba(255, 0, 0, 10));
    }

    #[test]
    fn test_hsv_round_trip_lava_endpoints() {
        for argb in [0xFFFF8080u32, 0xFF8080FF] {
            let c = Color32::from_argb(argb);
            assert_eq!(Color32::from_hsv(c.to_hsv(), c.a), c);
        }
    }

    #[test]
    fn test_lerp_hsv_boundaries() {
        let from = Color32::from_argb(0xFFFF8080);
        let to = Color32::from_argb(0xFF8080FF);

        assert_eq!(from.lerp_hsv(to, 0.0), from);
        assert_eq!(from.lerp_hsv(to, 1.0), to);
        assert_eq!(from.lerp_hsv(to, -0.5), from);
        assert_eq!(from.lerp_hsv(to, 1.5), to);

        // Hue 0 -> 240 passes through green at the midpoint (direct path)
        let mid = from.lerp_hsv(to, 0.5).to_hsv();
        assert!((degrees(mid) - 120.0).abs() < 1.0, "midpoint hue was {}", degrees(mid));
    }
}
