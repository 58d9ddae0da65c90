//! Per-rule color rewrites for synthetic dark mode.
//!
//! Each function maps one declared value to its dark replacement, or to
//! `None` when the value must be left alone. The clamp constants are
//! empirically tuned against real pages; they are behavioral, not derived.

use crate::vars::DARK_THEME_TEXT_VARIABLE;
use lector_color::{parse_color, to_color_string};
use lector_cssom::StyleRule;
use smallvec::SmallVec;

/// Text darker than this is normalized to the shared dark text color.
const TEXT_VARIABLE_LIGHTNESS: f32 = 0.4;
/// Saturation cap for text kept in its own hue.
const TEXT_MAX_SATURATION: f32 = 0.9;
/// Lightness floor for text kept in its own hue.
const TEXT_MIN_LIGHTNESS: f32 = 0.6;

/// Backgrounds lighter than this become transparent so the engine's own
/// dark background layer shows through.
const BACKGROUND_TRANSPARENT_LIGHTNESS: f32 = 0.8;
/// Saturation cap for darkened accent backgrounds.
const BACKGROUND_MAX_SATURATION: f32 = 0.7;
/// Lightness cap for darkened accent backgrounds.
const BACKGROUND_MAX_LIGHTNESS: f32 = 0.2;

/// Selector of root-scoped custom properties.
const ROOT_SELECTOR: &str = ":root";
/// Page-reset selector some utility frameworks use for their variables.
const PAGE_RESET_SELECTOR: &str = "*, :after, :before";

/// A `var()` reference to the shared dark text color.
pub fn dark_text_reference() -> String {
    format!("var({DARK_THEME_TEXT_VARIABLE})")
}

/// Dark replacement for a `color` value, or `None` to leave it unchanged.
pub fn rewrite_text_color(value: &str) -> Option<String> {
    if value.trim() == "initial" {
        return Some(dark_text_reference());
    }

    let mut color = parse_color(value)?;
    if color.lightness < TEXT_VARIABLE_LIGHTNESS {
        // Main text: standardize most of it on one readable color.
        return Some(dark_text_reference());
    }

    // Distinctly colored text stays in its hue but is kept visible against
    // a dark background.
    if color.saturation > TEXT_MAX_SATURATION {
        color.saturation = TEXT_MAX_SATURATION;
    }
    if color.lightness < TEXT_MIN_LIGHTNESS {
        color.lightness = TEXT_MIN_LIGHTNESS;
    }
    Some(to_color_string(&color))
}

/// Dark replacement for a `background-color` value, or `None` to leave it
/// unchanged.
pub fn rewrite_background_color(value: &str) -> Option<String> {
    let mut color = parse_color(value)?;
    if color.lightness > BACKGROUND_TRANSPARENT_LIGHTNESS {
        return Some("transparent".to_owned());
    }

    if color.saturation > BACKGROUND_MAX_SATURATION {
        color.saturation = BACKGROUND_MAX_SATURATION;
    }
    if color.lightness > BACKGROUND_MAX_LIGHTNESS {
        color.lightness = BACKGROUND_MAX_LIGHTNESS;
    }
    Some(to_color_string(&color))
}

/// Compute the replacement declarations for one style rule.
///
/// Returns only effective changes; a rule with an empty result must not be
/// touched or snapshotted. Rules carrying root-scoped custom properties get
/// each variable re-themed individually, routed by name.
pub fn rule_modifications(rule: &StyleRule) -> SmallVec<(String, String), 4> {
    let mut modifications: SmallVec<(String, String), 4> = SmallVec::new();

    if let Some(value) = rule.property("color")
        && let Some(replacement) = rewrite_text_color(value)
        && replacement != value
    {
        modifications.push(("color".to_owned(), replacement));
    }

    if let Some(value) = rule.property("background-color")
        && let Some(replacement) = rewrite_background_color(value)
        && replacement != value
    {
        modifications.push(("background-color".to_owned(), replacement));
    }

    // Shadows computed for a light background look wrong on dark.
    if let Some(value) = rule.property("box-shadow")
        && value != "none"
    {
        modifications.push(("box-shadow".to_owned(), "none".to_owned()));
    }

    if rule.selector == ROOT_SELECTOR || rule.selector == PAGE_RESET_SELECTOR {
        for declaration in rule.custom_properties() {
            let replacement = if declaration.name.contains("background") {
                rewrite_background_color(&declaration.value)
            } else {
                rewrite_text_color(&declaration.value)
            };
            if let Some(replacement) = replacement
                && replacement != declaration.value
            {
                modifications.push((declaration.name.clone(), replacement));
            }
        }
    }

    modifications
}
