//! Reader-mode page transformer.
//!
//! Strips page chrome and re-themes the remaining content while keeping the
//! page's visual identity where reasonable. The core is the adaptive theme
//! engine in [`lector_orchestrator`]; this crate wires it to a page view:
//! lifecycle, settings storage, the sidebar mirror, and the stylesheet
//! watch window.

#![forbid(unsafe_code)]

pub mod page_view;
pub mod storage;

pub use lector_cssom::Document;
pub use lector_orchestrator::{
    ContentObservations, EngineState, SettingsStore, SidebarSurface, ThemeModifier, ThemeName,
    UserTheme,
};
pub use page_view::{domain_from_url, PageView, SidebarProxy};
pub use storage::{JsonFileStore, MemoryStore};
