//! The theme variable bus.
//!
//! A fixed set of custom properties written to the document root is the
//! contract between the theme engine and dependent visual components (text
//! container, sidebar, background layer). Components only ever read these
//! variables; the engine is the sole writer.

use lector_cssom::Document;

/// Prefix shared by every engine variable, used for teardown.
pub const THEME_VARIABLE_PREFIX: &str = "--lector-";

// Persisted with the user theme.
pub const FONT_SIZE_VARIABLE: &str = "--lector-active-font-size";
pub const PAGE_WIDTH_VARIABLE: &str = "--lector-pagewidth";
pub const ACTIVE_COLOR_THEME_VARIABLE: &str = "--lector-color-theme";

// Computed by the engine.
pub const BACKGROUND_COLOR_VARIABLE: &str = "--lector-background-color";
pub const AUTO_BACKGROUND_VARIABLE: &str = "--lector-auto-background-color";
pub const DARK_THEME_TEXT_VARIABLE: &str = "--lector-dark-theme-text-color";

/// Write a theme variable to the document root.
///
/// With `overwrite` unset the call publishes an initial value only: an
/// existing value (typically an explicit user setting applied earlier) is
/// never replaced by one derived from the page.
pub fn set_theme_variable(document: &mut Document, name: &str, value: &str, overwrite: bool) {
    if !overwrite
        && document
            .root_style
            .value(name)
            .is_some_and(|existing| !existing.is_empty())
    {
        return;
    }
    document.root_style.set(name, value, false);
}

/// Read a theme variable from the document root.
pub fn theme_variable<'doc>(document: &'doc Document, name: &str) -> Option<&'doc str> {
    document.root_style.value(name)
}

/// Remove every engine variable from the document root.
pub fn clear_theme_variables(document: &mut Document) {
    let names: Vec<String> = document
        .root_style
        .iter()
        .filter(|declaration| declaration.name.starts_with(THEME_VARIABLE_PREFIX))
        .map(|declaration| declaration.name.clone())
        .collect();
    for name in names {
        document.root_style.remove(&name);
    }
}
