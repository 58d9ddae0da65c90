//! One activated reader page view.
//!
//! Owns the document style model and the theme engine for a single page,
//! and drives the activation lifecycle: `prepare` before the page is
//! touched, `transition_in` / `after_transition_in` while the reader view
//! appears, `transition_out` on deactivation. Incoming events (user theme
//! choice, system preference changes, stylesheet attachments) are methods;
//! the host event loop delivers them.

use anyhow::Result;
use lector_cssom::{Document, SheetId};
use lector_orchestrator::settings::SettingsStore;
use lector_orchestrator::{
    ContentObservations, EngineState, SidebarSurface, ThemeModifier, ThemeName,
};
use log::debug;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// How long after document load newly attached stylesheets are still
/// picked up for theming.
const STYLESHEET_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Recording mirror of the isolated sidebar surface.
///
/// The real sidebar renders in its own frame; the page view only pushes
/// theme state across the boundary. This proxy keeps the last pushed state
/// so the host (and tests) can read it back.
#[derive(Debug, Default)]
pub struct SidebarProxy {
    dark_mode: bool,
    variables: BTreeMap<String, String>,
}

impl SidebarProxy {
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

impl SidebarSurface for SidebarProxy {
    fn set_dark_mode(&mut self, dark: bool) {
        self.dark_mode = dark;
    }

    fn set_css_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_owned(), value.to_owned());
    }
}

/// The reader view of one page.
pub struct PageView<S: SettingsStore> {
    domain: String,
    document: Document,
    theme: ThemeModifier,
    sidebar: SidebarProxy,
    store: S,
    observations: ContentObservations,
    watching_stylesheets: bool,
}

impl<S: SettingsStore> PageView<S> {
    /// Create the view and load the saved theme, before touching the page.
    pub async fn prepare(url: &Url, store: S, system_prefers_dark: bool) -> Result<Self> {
        let domain = domain_from_url(url);
        let mut document = Document::new();
        let mut theme = ThemeModifier::new();
        theme
            .prepare(&domain, &store, system_prefers_dark, &mut document)
            .await?;
        Ok(Self {
            domain,
            document,
            theme,
            sidebar: SidebarProxy::default(),
            store,
            observations: ContentObservations::default(),
            watching_stylesheets: true,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn sidebar(&self) -> &SidebarProxy {
        &self.sidebar
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Provide the colors observed on the page before theming.
    pub fn set_content_observations(&mut self, observations: ContentObservations) {
        self.observations = observations;
    }

    /// Batch the pre-visibility theme work (early dark shell, background
    /// detection, font size).
    pub fn transition_in(&mut self) {
        self.theme.transition_in(&mut self.document, &self.observations);
    }

    /// Resolve and apply the active color theme.
    pub fn after_transition_in(&mut self) {
        self.theme
            .after_transition_in(&mut self.document, &mut self.sidebar);
    }

    /// Deactivate the view, restoring the document's original style.
    pub fn transition_out(&mut self) {
        self.theme
            .transition_out(&mut self.document, &mut self.sidebar);
        self.watching_stylesheets = false;
    }

    /// Explicit user theme choice: apply and persist.
    pub async fn change_color_theme(&mut self, new_theme: ThemeName) -> Result<()> {
        self.theme
            .change_color_theme(&mut self.document, &mut self.sidebar, &self.store, new_theme)
            .await
    }

    /// System dark-preference change notification.
    pub fn handle_system_preference_change(&mut self, prefers_dark: bool) {
        self.theme
            .handle_system_preference_change(&mut self.document, &mut self.sidebar, prefers_dark);
    }

    /// A page script attached another stylesheet. Within the settle window
    /// the new rules are themed like the initial ones; afterwards they are
    /// left alone.
    pub fn attach_stylesheet(&mut self, css: &str) -> SheetId {
        let sheet_id = self.document.attach_stylesheet(css);
        if self.watching_stylesheets {
            self.theme.handle_stylesheets_changed(&mut self.document);
        } else {
            debug!("stylesheet attached after settle window, not themed");
        }
        sheet_id
    }

    /// Wait out the settle period after document load, then stop watching
    /// for stylesheet attachments.
    pub async fn settle(&mut self) {
        tokio::time::sleep(STYLESHEET_SETTLE_DELAY).await;
        self.stop_watching();
    }

    /// Stop watching for stylesheet attachments.
    pub fn stop_watching(&mut self) {
        if self.watching_stylesheets {
            debug!("stylesheet watch window closed for {}", self.domain);
            self.watching_stylesheets = false;
        }
    }

    pub fn engine_state(&self) -> EngineState {
        self.theme.state()
    }

    pub fn active_color_theme(&self) -> ThemeName {
        self.theme.active_color_theme()
    }

    /// Subscribe to theme-name changes (used by the preference switcher).
    pub fn on_color_theme_change(&mut self, listener: impl FnMut(ThemeName) + 'static) {
        self.theme.on_color_theme_change(listener);
    }
}

/// Domain a page view is keyed by: the URL host without a `www.` prefix.
pub fn domain_from_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_owned()
}
