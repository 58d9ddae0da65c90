//! CSS color parsing and color math for theme synthesis.
//! Spec: <https://www.w3.org/TR/css-color-4/>
//!
//! Colors are normalized to an HSLA representation so the theme engine can
//! reason about lightness and saturation directly. Anything that cannot be
//! resolved to a concrete color (cascade keywords, unresolved `var()`
//! references, malformed strings) parses to `None`, which callers treat as
//! "leave this value unchanged".

#![forbid(unsafe_code)]

use csscolorparser::Color;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// A concrete color in hue/saturation/lightness/alpha form.
///
/// `hue` is in degrees `[0, 360)`; the remaining channels are in `[0, 1]`.
/// Values are immutable once constructed; the clamp helpers return copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorValue {
    /// Hue angle in degrees.
    pub hue: f32,
    /// Saturation, 0 = achromatic.
    pub saturation: f32,
    /// Lightness, 0 = black, 1 = white.
    pub lightness: f32,
    /// Opacity, 0 = fully transparent.
    pub alpha: f32,
}

/// Keywords that name a cascade behavior rather than a concrete color.
/// Spec: <https://www.w3.org/TR/css-values-4/#common-keywords>
static UNPARSABLE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["inherit", "transparent", "initial", "currentcolor", "none", "unset"])
});

/// Parse a CSS `<color>` into a [`ColorValue`].
///
/// Supports named colors, hex forms (`#rgb`/`#rgba`/`#rrggbb`/`#rrggbbaa`),
/// and functional notations like `rgb()`/`hsl()`. A single embedded
/// `var(--…)` sub-expression is stripped before parsing the remainder; the
/// residual string may still fail to parse, in which case the result is
/// `None` rather than an error.
///
/// Spec: <https://www.w3.org/TR/css-color-4/#typedef-color>
pub fn parse_color(input: &str) -> Option<ColorValue> {
    let trimmed = input.trim();
    if UNPARSABLE_KEYWORDS.contains(trimmed.to_ascii_lowercase().as_str()) {
        return None;
    }

    let mut candidate = trimmed.to_owned();
    if candidate.contains("var(") {
        // A value can embed a variable reference and still be a color once
        // the reference is removed, e.g. `rgb(59 130 246 / var(--opacity))`.
        candidate = strip_variable_reference(&candidate)?;
    }

    let parsed: Color = candidate.trim().parse().ok()?;
    let [red, green, blue, alpha] = parsed.to_rgba8();
    Some(rgb_to_hsl(red, green, blue, f32::from(alpha) / 255.0))
}

/// Remove the first `var(--…)` sub-expression from a value string.
///
/// Returns `None` when the reference never closes; the caller then treats
/// the whole value as unparsable.
fn strip_variable_reference(value: &str) -> Option<String> {
    let open = value.find("var(")?;
    let close_offset = value.get(open..)?.find(')')?;
    let mut stripped = String::with_capacity(value.len());
    stripped.push_str(value.get(..open)?);
    stripped.push_str(value.get(open + close_offset + 1..)?);
    Some(stripped)
}

/// Render a [`ColorValue`] back to a functional `hsla()` string.
///
/// Round-trips the tracked channels through [`parse_color`]; the original
/// input notation is not preserved.
pub fn to_color_string(color: &ColorValue) -> String {
    format!(
        "hsla({}, {}%, {}%, {})",
        color.hue,
        color.saturation * 100.0,
        color.lightness * 100.0,
        color.alpha
    )
}

/// Perceptual brightness of a color in `[0, 1]`.
///
/// Uses the ITU-R BT.601 luma weighting, which is what the dark-site
/// detection thresholds were tuned against.
pub fn brightness(color: &ColorValue) -> f32 {
    let (red, green, blue) = hsl_to_rgb(color.hue, color.saturation, color.lightness);
    0.299 * red + 0.587 * green + 0.114 * blue
}

/// Parse a color string and return its brightness, if it parses at all.
pub fn brightness_of(input: &str) -> Option<f32> {
    parse_color(input).map(|color| brightness(&color))
}

/// Convert 8-bit RGB channels plus alpha to HSL.
pub fn rgb_to_hsl(red8: u8, green8: u8, blue8: u8, alpha: f32) -> ColorValue {
    let red = f32::from(red8) / 255.0;
    let green = f32::from(green8) / 255.0;
    let blue = f32::from(blue8) / 255.0;

    let max = red.max(green).max(blue);
    let min = red.min(green).min(blue);
    let lightness = (max + min) / 2.0;

    let delta = max - min;
    if delta <= f32::EPSILON {
        return ColorValue {
            hue: 0.0,
            saturation: 0.0,
            lightness,
            alpha,
        };
    }

    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let mut hue = if (max - red).abs() <= f32::EPSILON {
        (green - blue) / delta + if green < blue { 6.0 } else { 0.0 }
    } else if (max - green).abs() <= f32::EPSILON {
        (blue - red) / delta + 2.0
    } else {
        (red - green) / delta + 4.0
    };
    hue *= 60.0;

    ColorValue {
        hue,
        saturation,
        lightness,
        alpha,
    }
}

/// Convert HSL channels to RGB in `[0, 1]`.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (f32, f32, f32) {
    if saturation <= f32::EPSILON {
        return (lightness, lightness, lightness);
    }

    let upper = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let lower = 2.0 * lightness - upper;

    let hue_fraction = (hue.rem_euclid(360.0)) / 360.0;
    (
        hue_channel(lower, upper, hue_fraction + 1.0 / 3.0),
        hue_channel(lower, upper, hue_fraction),
        hue_channel(lower, upper, hue_fraction - 1.0 / 3.0),
    )
}

fn hue_channel(lower: f32, upper: f32, mut position: f32) -> f32 {
    if position < 0.0 {
        position += 1.0;
    }
    if position > 1.0 {
        position -= 1.0;
    }
    if position < 1.0 / 6.0 {
        lower + (upper - lower) * 6.0 * position
    } else if position < 1.0 / 2.0 {
        upper
    } else if position < 2.0 / 3.0 {
        lower + (upper - lower) * (2.0 / 3.0 - position) * 6.0
    } else {
        lower
    }
}
