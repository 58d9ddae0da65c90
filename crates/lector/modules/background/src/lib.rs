//! Page background detection for the reader theme engine.
//!
//! Derives a representative background color from the colors observed on
//! the live page, corrects known misdetections, and classifies pages that
//! already ship a dark appearance by default. The numeric thresholds are
//! empirically tuned; changing them changes which sites are treated as
//! dark-by-default.

#![forbid(unsafe_code)]

use lector_color::brightness_of;
use log::debug;

/// Canonical light page background.
pub const CANONICAL_LIGHT_BACKGROUND: &str = "white";

/// Canonical dark page background, shared with the dark color theme.
pub const CANONICAL_DARK_BACKGROUND: &str = "#212121";

/// Backgrounds known to be detected wrongly, with their replacements.
/// The near-white triple comes up when a page's outermost wrapper carries
/// a faint gray that is not the reading surface.
const CORRECTIONS: &[(&str, &str)] = &[("rgb(240, 241, 242)", CANONICAL_LIGHT_BACKGROUND)];

/// Below this background brightness a page may be dark-by-default.
const DARK_BACKGROUND_BRIGHTNESS: f32 = 0.6;

/// Text brighter than this on a dark background confirms light-on-dark.
const LIGHT_TEXT_BRIGHTNESS: f32 = 0.5;

/// Backgrounds darker than this conflict with the engine's own dark shell
/// and are coerced to the canonical dark color.
const EXTREME_DARK_BRIGHTNESS: f32 = 0.1;

/// Result of scanning the page for a representative background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundScan {
    /// The background color dependent components should use.
    pub color: String,
    /// Whether the page ships a dark appearance by default.
    pub is_default_dark: bool,
}

/// Pick a representative page background and classify default-dark pages.
///
/// `candidates` is ordered by priority (detected main-content background
/// first, then the page body background); the first present entry wins,
/// falling back to [`CANONICAL_LIGHT_BACKGROUND`]. `main_text_color` is the
/// detected main text color, when any. `dark_mode_already_active` disables
/// default-dark classification, since an active dark mode has already
/// rewritten what the scan would observe.
pub fn compute_background(
    candidates: &[Option<&str>],
    main_text_color: Option<&str>,
    dark_mode_already_active: bool,
) -> BackgroundScan {
    let mut color = candidates
        .iter()
        .find_map(|candidate| *candidate)
        .unwrap_or(CANONICAL_LIGHT_BACKGROUND)
        .to_owned();

    for (wrong, replacement) in CORRECTIONS {
        if color == *wrong {
            debug!("correcting misdetected background {color} -> {replacement}");
            color = (*replacement).to_owned();
        }
    }

    // An unreadable background is treated as light; the engine then themes
    // the page the same way it themes any light page.
    let background_brightness = brightness_of(&color).unwrap_or(1.0);
    let text_brightness = main_text_color.and_then(brightness_of);

    let mut is_default_dark = false;
    if background_brightness < DARK_BACKGROUND_BRIGHTNESS && !dark_mode_already_active {
        if text_brightness.is_none_or(|value| value > LIGHT_TEXT_BRIGHTNESS) {
            // Light-on-dark (or no text signal at all): the site is dark by
            // default and its background is kept.
            is_default_dark = true;

            if background_brightness < EXTREME_DARK_BRIGHTNESS {
                color = CANONICAL_DARK_BACKGROUND.to_owned();
            }
        } else {
            // Dark text on a dark background is a misdetection.
            color = CANONICAL_LIGHT_BACKGROUND.to_owned();
        }
    }

    BackgroundScan {
        color,
        is_default_dark,
    }
}
