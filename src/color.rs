// Color sensor sample classification.
//
// Raw samples arrive as three channels on a 0-100/0-100/0-200 scale; the
// third channel reads roughly double on this sensor, so HSV conversion
// rescales it by 255/200 instead of 255/100. Everything here is a pure
// function of one sample.

use crate::config;
use crate::hw::Side;

/// One reflectivity sample from a color sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// The line/background discriminant used by the steering loop.
    pub fn reflectivity(&self) -> f32 {
        self.g
    }
}

/// Hue 0-360, saturation 0-100, value 0-255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

/// Max/min-channel HSV decomposition. Hue is 0 for achromatic samples.
pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let r = rgb.r * 255.0 / 100.0;
    let g = rgb.g * 255.0 / 100.0;
    let b = rgb.b * 255.0 / 200.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let mut hue = if max == min {
        0.0
    } else if max == r {
        60.0 * ((g - b) / diff)
    } else if max == g {
        60.0 * ((b - r) / diff) + 120.0
    } else {
        60.0 * ((r - g) / diff) + 240.0
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    let saturation = if max != 0.0 { diff / max * 100.0 } else { 0.0 };

    Hsv {
        hue,
        saturation,
        value: max,
    }
}

/// Semantic tag for one sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTag {
    /// Partial line coverage, the normal steering band
    OnLine,
    /// Full black, line or intersection bar
    Black,
    /// Green turn marker
    GreenMarker,
    Background,
}

/// A tagged sample with its source side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorEvent {
    pub tag: ColorTag,
    pub side: Side,
}

/// True when the sample sits inside the green marker bands.
pub fn is_marker(hsv: &Hsv) -> bool {
    config::MARKER_HUE_MIN < hsv.hue
        && hsv.hue < config::MARKER_HUE_MAX
        && hsv.saturation > config::MARKER_SAT_MIN
        && hsv.value > config::MARKER_VAL_MIN
}

pub fn classify(sample: Rgb) -> ColorTag {
    if is_marker(&rgb_to_hsv(sample)) {
        ColorTag::GreenMarker
    } else if sample.reflectivity() <= config::BLACK_REFLECT_MAX {
        ColorTag::Black
    } else if sample.reflectivity() <= config::LINE_EDGE_REFLECT_MAX {
        ColorTag::OnLine
    } else {
        ColorTag::Background
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achromatic_sample_has_zero_hue() {
        // 0-200 scale on the third channel: raw 100 lands on the same
        // 127.5 as the other two at raw 50
        let hsv = rgb_to_hsv(Rgb::new(50.0, 50.0, 100.0));
        assert_eq!(hsv.hue, 0.0);
        assert_eq!(hsv.saturation, 0.0);
        assert_eq!(hsv.value, 127.5);
    }

    #[test]
    fn all_dark_sample_is_safe() {
        let hsv = rgb_to_hsv(Rgb::new(0.0, 0.0, 0.0));
        assert_eq!(hsv.hue, 0.0);
        assert_eq!(hsv.saturation, 0.0);
    }

    #[test]
    fn negative_hue_wraps() {
        let hsv = rgb_to_hsv(Rgb::new(80.0, 20.0, 60.0));
        assert!((hsv.hue - 350.0).abs() < 1e-3);
    }

    #[test]
    fn marker_flips_at_lower_hue_bound() {
        // raw blue 40 scales to exactly the red channel: hue lands on 120
        assert_eq!(classify(Rgb::new(20.0, 80.0, 39.0)), ColorTag::Background);
        assert_eq!(classify(Rgb::new(20.0, 80.0, 40.0)), ColorTag::Background);
        assert_eq!(classify(Rgb::new(20.0, 80.0, 41.0)), ColorTag::GreenMarker);
    }

    #[test]
    fn marker_flips_at_upper_hue_bound() {
        // hue = 120 + 60 * B/G with red at zero; raw blue 80 gives exactly 160
        assert_eq!(classify(Rgb::new(0.0, 60.0, 79.0)), ColorTag::GreenMarker);
        assert_eq!(classify(Rgb::new(0.0, 60.0, 80.0)), ColorTag::Background);
        assert_eq!(classify(Rgb::new(0.0, 60.0, 81.0)), ColorTag::Background);
    }

    #[test]
    fn marker_flips_at_saturation_bound() {
        // hue held mid-band while the min channel walks saturation across
        // 60: 62.5 percent passes, 58.75 and 57.5 do not
        assert_eq!(classify(Rgb::new(30.0, 80.0, 93.0)), ColorTag::GreenMarker);
        assert_eq!(classify(Rgb::new(33.0, 80.0, 97.0)), ColorTag::Background);
        assert_eq!(classify(Rgb::new(34.0, 80.0, 99.0)), ColorTag::Background);
    }

    #[test]
    fn marker_flips_at_value_bound() {
        // fully saturated green, brightness walked past 20
        assert_eq!(classify(Rgb::new(0.0, 8.0, 2.0)), ColorTag::GreenMarker);
        assert_eq!(classify(Rgb::new(0.0, 7.0, 2.0)), ColorTag::Black);
    }

    #[test]
    fn reflectivity_bands() {
        assert_eq!(classify(Rgb::new(10.0, 10.0, 8.0)), ColorTag::Black);
        assert_eq!(classify(Rgb::new(30.0, 30.0, 24.0)), ColorTag::OnLine);
        assert_eq!(classify(Rgb::new(70.0, 80.0, 60.0)), ColorTag::Background);
    }

    #[test]
    fn classification_is_idempotent() {
        let sample = Rgb::new(30.0, 80.0, 93.0);
        assert_eq!(classify(sample), classify(sample));
        let hsv1 = rgb_to_hsv(sample);
        let hsv2 = rgb_to_hsv(sample);
        assert_eq!(hsv1, hsv2);
    }
}
