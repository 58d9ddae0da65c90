//! Theme resolution and application for the reader page view.
//!
//! Coordinates the leaf modules (color model, style document, background
//! heuristic) into the adaptive theme engine: deciding whether a page gets
//! dark styling, applying it reversibly, and publishing the result as
//! style variables for dependent components.

#![forbid(unsafe_code)]

pub mod rewrite;
pub mod settings;
pub mod theme;
pub mod vars;

pub use settings::{SettingsStore, ThemeName, UserTheme};
pub use theme::{ContentObservations, EngineState, SidebarSurface, ThemeModifier};
