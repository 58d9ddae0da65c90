//! Persisted user theme preferences and the settings-store seam.
//!
//! The store itself lives with the host (browser storage, a JSON file, an
//! in-memory map for tests); this module only defines the data shape, the
//! async access trait, and the normalization applied to stored values.

use crate::vars;
use anyhow::Result;
use async_trait::async_trait;
use lector_background::{CANONICAL_DARK_BACKGROUND, CANONICAL_LIGHT_BACKGROUND};
use lector_cssom::Document;
use log::debug;
use serde::{Deserialize, Serialize};

/// Storage key holding the user theme, shared by all store backends.
pub const USER_THEME_STORAGE_KEY: &str = "custom-global-theme";

/// Font size applied when nothing (or something malformed) is stored.
pub const DEFAULT_FONT_SIZE: &str = "18px";

/// Background of the sepia color theme.
pub const SEPIA_BACKGROUND: &str = "#F4ECD8";

/// The user-selectable color theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    /// Follow the system dark preference.
    #[default]
    Auto,
    White,
    Sepia,
    Dark,
}

impl ThemeName {
    /// Stable name used in storage and the theme-name style variable.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::White => "white",
            Self::Sepia => "sepia",
            Self::Dark => "dark",
        }
    }

    /// Parse a stored theme name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "white" => Some(Self::White),
            "sepia" => Some(Self::Sepia),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Concrete background color of a fixed theme; `Auto` has none, its
    /// background tracks the detected page color.
    pub fn background_color(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::White => Some(CANONICAL_LIGHT_BACKGROUND),
            Self::Sepia => Some(SEPIA_BACKGROUND),
            Self::Dark => Some(CANONICAL_DARK_BACKGROUND),
        }
    }
}

/// The persisted per-user theme configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserTheme {
    /// Reader font size, e.g. `18px`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    /// Reader page width, e.g. `780px`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_width: Option<String>,
    /// Selected color theme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_theme: Option<ThemeName>,
}

impl UserTheme {
    /// Overlay the set fields of `partial` onto this theme.
    pub fn merge(&mut self, partial: Self) {
        if partial.font_size.is_some() {
            self.font_size = partial.font_size;
        }
        if partial.page_width.is_some() {
            self.page_width = partial.page_width;
        }
        if partial.color_theme.is_some() {
            self.color_theme = partial.color_theme;
        }
    }
}

/// Replace a malformed stored theme with usable defaults.
///
/// A missing theme becomes `{font_size: 18px}`; a stored font size that is
/// not numeric (after stripping a `px` suffix) is replaced with the
/// default. Other fields pass through untouched.
pub fn normalize_user_theme(stored: Option<UserTheme>) -> UserTheme {
    match stored {
        Some(mut theme) => {
            if theme
                .font_size
                .as_deref()
                .is_some_and(|size| !is_wellformed_font_size(size))
            {
                theme.font_size = Some(DEFAULT_FONT_SIZE.to_owned());
            }
            theme
        }
        None => UserTheme {
            font_size: Some(DEFAULT_FONT_SIZE.to_owned()),
            ..UserTheme::default()
        },
    }
}

fn is_wellformed_font_size(value: &str) -> bool {
    value
        .trim()
        .trim_end_matches("px")
        .trim()
        .parse::<f32>()
        .is_ok()
}

/// Asynchronous key-value access to the persisted user theme.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the stored theme, normalized via [`normalize_user_theme`].
    async fn get_user_theme(&self) -> Result<UserTheme>;

    /// Merge the set fields of `partial` into the stored theme.
    async fn merge_user_theme(&self, partial: UserTheme) -> Result<()>;
}

/// Persist an explicit user change of font size, page width, or color
/// theme, applying the style variable where that is not handled by the
/// theme engine itself.
pub async fn apply_save_theme_override<S: SettingsStore + ?Sized>(
    store: &S,
    document: &mut Document,
    domain: &str,
    variable: &str,
    value: &str,
) -> Result<()> {
    debug!("saving theme override {variable}={value} on {domain}");
    match variable {
        vars::FONT_SIZE_VARIABLE => {
            vars::set_theme_variable(document, variable, value, true);
            store
                .merge_user_theme(UserTheme {
                    font_size: Some(value.to_owned()),
                    ..UserTheme::default()
                })
                .await
        }
        vars::PAGE_WIDTH_VARIABLE => {
            vars::set_theme_variable(document, variable, value, true);
            store
                .merge_user_theme(UserTheme {
                    page_width: Some(value.to_owned()),
                    ..UserTheme::default()
                })
                .await
        }
        vars::ACTIVE_COLOR_THEME_VARIABLE => {
            // Variable application is handled by the theme engine.
            let Some(theme_name) = ThemeName::from_name(value) else {
                debug!("ignoring unknown color theme {value:?}");
                return Ok(());
            };
            store
                .merge_user_theme(UserTheme {
                    color_theme: Some(theme_name),
                    ..UserTheme::default()
                })
                .await
        }
        _ => {
            debug!("ignoring override for unknown variable {variable}");
            Ok(())
        }
    }
}
