//! The dark mode decision and application engine.
//!
//! Owns all theme state for one page view: the active color theme, the
//! dark-mode flag, the detected page background, rule snapshots for exact
//! restoration, and the handles to any native dark rules it activated.
//! State is transitioned only through the lifecycle operations (`prepare`,
//! `transition_in`, `after_transition_in`, `transition_out`) and the two
//! event entry points (user theme change, system preference change).

use crate::rewrite;
use crate::settings::{self, SettingsStore, ThemeName, UserTheme};
use crate::vars;
use anyhow::Result;
use lector_background::{compute_background, CANONICAL_DARK_BACKGROUND, CANONICAL_LIGHT_BACKGROUND};
use lector_color::parse_color;
use lector_cssom::walker::for_each_style_rule_mut;
use lector_cssom::{
    ConditionalGroupRule, CssRule, Declaration, Document, InlineStyle, RuleId, SheetId, SheetOrigin,
};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Class tagging the engine's injected dark-UI stylesheet links.
pub const DARK_MODE_UI_CLASS: &str = "dark-mode-ui-style";

/// The shared dark text color published for UI elements and, in synthetic
/// mode, referenced by rewritten page rules.
pub const DARK_THEME_TEXT_COLOR: &str = "rgb(232, 230, 227)";

/// Root background applied before the page becomes visible, darker than
/// the reading surface so there is no white flash behind it.
const DARK_SHELL_BACKGROUND: &str = "#131516";

/// Domains whose native dark styles are known to misrender; they always
/// fall through to synthetic or default handling.
const NATIVE_DARK_EXCLUDED_DOMAINS: &[&str] = &["theatlantic.com"];

/// Dark styling for the engine's own UI surfaces.
const ENGINE_DARK_STYLESHEETS: &[&str] = &[
    "pageview/content-dark.css",
    "overlay/index-dark.css",
    "overlay/outline-dark.css",
];

/// How the current dark appearance was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum AppliedDarkStyle {
    /// Dark mode is off.
    #[default]
    None,
    /// The page is dark by default; its own styling is trusted.
    SiteDefault,
    /// The page's own dark-preference rules were activated.
    Native,
    /// Rule colors were rewritten by the engine.
    Synthetic,
}

/// Snapshot of the engine's externally visible state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineState {
    pub active_color_theme: ThemeName,
    pub dark_mode_active: bool,
    pub site_has_default_dark_background: bool,
    pub background_color: String,
}

/// Mirror of theme state into the isolated sidebar surface.
pub trait SidebarSurface {
    fn set_dark_mode(&mut self, dark: bool);
    fn set_css_variable(&mut self, name: &str, value: &str);
}

/// Style observations collected on the live page before theming, provided
/// by the text-container and body modifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentObservations {
    /// Background detected on the main content container.
    pub main_background_color: Option<String>,
    /// Background of the page body.
    pub body_background_color: Option<String>,
    /// Detected main text color.
    pub main_text_color: Option<String>,
}

/// Inline-style scope touched by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InlineScope {
    Root,
    Body,
}

type ThemeListener = Box<dyn FnMut(ThemeName)>;

/// The adaptive theme engine for one page view.
pub struct ThemeModifier {
    domain: String,
    theme: UserTheme,
    active_color_theme: ThemeName,
    system_prefers_dark: bool,
    subscribed_to_system_preference: bool,
    dark_mode_active: bool,
    site_has_default_dark_background: bool,
    background_color: String,
    applied_dark_style: AppliedDarkStyle,
    /// Original values of rewritten properties, keyed by rule. A rule is
    /// present at most once per dark interval.
    rule_snapshots: HashMap<RuleId, SmallVec<Declaration, 4>>,
    /// Handles to the always-active native dark clones.
    native_dark_clones: Vec<(SheetId, RuleId)>,
    /// Original values of engine-set inline properties.
    inline_restores: Vec<(InlineScope, String, Option<Declaration>)>,
    theme_listeners: Vec<ThemeListener>,
}

impl Default for ThemeModifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeModifier {
    pub fn new() -> Self {
        Self {
            domain: String::new(),
            theme: UserTheme::default(),
            active_color_theme: ThemeName::Auto,
            system_prefers_dark: false,
            subscribed_to_system_preference: false,
            dark_mode_active: false,
            site_has_default_dark_background: false,
            background_color: CANONICAL_LIGHT_BACKGROUND.to_owned(),
            applied_dark_style: AppliedDarkStyle::None,
            rule_snapshots: HashMap::new(),
            native_dark_clones: Vec::new(),
            inline_restores: Vec::new(),
            theme_listeners: Vec::new(),
        }
    }

    /// Load the saved theme and subscribe to the system preference.
    pub async fn prepare<S: SettingsStore + ?Sized>(
        &mut self,
        domain: &str,
        store: &S,
        system_prefers_dark: bool,
        document: &mut Document,
    ) -> Result<()> {
        self.domain = domain.to_owned();
        self.theme = store.get_user_theme().await?;

        if let Some(page_width) = self.theme.page_width.clone() {
            vars::set_theme_variable(document, vars::PAGE_WIDTH_VARIABLE, &page_width, false);
        }

        self.active_color_theme = self.theme.color_theme.unwrap_or_default();
        self.system_prefers_dark = system_prefers_dark;
        self.subscribed_to_system_preference = true;
        Ok(())
    }

    /// Apply the early appearance before the page becomes visible: a dark
    /// shell when dark mode is plausible, the detected page background, and
    /// the saved font size.
    pub fn transition_in(&mut self, document: &mut Document, observations: &ContentObservations) {
        let dark_likely = self.dark_mode_active
            || self.active_color_theme == ThemeName::Dark
            || (self.active_color_theme == ThemeName::Auto && self.system_prefers_dark);
        if dark_likely {
            self.set_inline(document, InlineScope::Root, "background", DARK_SHELL_BACKGROUND, true);
            self.set_inline(
                document,
                InlineScope::Body,
                "background",
                CANONICAL_DARK_BACKGROUND,
                true,
            );
        }

        // Pick the background now to avoid visible changes later.
        let scan = compute_background(
            &[
                observations.main_background_color.as_deref(),
                observations.body_background_color.as_deref(),
            ],
            observations.main_text_color.as_deref(),
            self.dark_mode_active,
        );
        self.background_color = scan.color;
        self.site_has_default_dark_background = scan.is_default_dark;
        vars::set_theme_variable(
            document,
            vars::BACKGROUND_COLOR_VARIABLE,
            &self.background_color,
            false,
        );

        if let Some(font_size) = self.theme.font_size.clone() {
            vars::set_theme_variable(document, vars::FONT_SIZE_VARIABLE, &font_size, false);
        }
    }

    /// Resolve and apply the active color theme.
    pub fn after_transition_in(&mut self, document: &mut Document, sidebar: &mut dyn SidebarSurface) {
        self.apply_active_color_theme(document, sidebar);
    }

    /// Tear down: unwind dark styling, drop subscriptions, restore every
    /// engine-touched inline property and variable. Safe to call even when
    /// activation was interrupted partway.
    pub fn transition_out(&mut self, document: &mut Document, sidebar: &mut dyn SidebarSurface) {
        if self.dark_mode_active {
            self.disable_dark_mode(document, sidebar);
            self.dark_mode_active = false;
        }
        self.subscribed_to_system_preference = false;

        self.restore_inline(document);
        document.text_container_style.remove(vars::DARK_THEME_TEXT_VARIABLE);
        vars::clear_theme_variables(document);
    }

    /// System dark-preference change; ignored once unsubscribed.
    pub fn handle_system_preference_change(
        &mut self,
        document: &mut Document,
        sidebar: &mut dyn SidebarSurface,
        prefers_dark: bool,
    ) {
        if !self.subscribed_to_system_preference {
            trace!("ignoring system preference change on torn-down page");
            return;
        }
        self.system_prefers_dark = prefers_dark;
        self.apply_active_color_theme(document, sidebar);
    }

    /// Explicit user theme change: apply, then persist.
    pub async fn change_color_theme<S: SettingsStore + ?Sized>(
        &mut self,
        document: &mut Document,
        sidebar: &mut dyn SidebarSurface,
        store: &S,
        new_theme: ThemeName,
    ) -> Result<()> {
        self.active_color_theme = new_theme;
        self.apply_active_color_theme(document, sidebar);

        settings::apply_save_theme_override(
            store,
            document,
            &self.domain,
            vars::ACTIVE_COLOR_THEME_VARIABLE,
            new_theme.as_str(),
        )
        .await
    }

    /// Re-run rule discovery after stylesheets were attached during the
    /// settle window. Only synthetic mode has per-rule work to extend;
    /// already-rewritten rules are skipped via their snapshots.
    pub fn handle_stylesheets_changed(&mut self, document: &mut Document) {
        if self.dark_mode_active && self.applied_dark_style == AppliedDarkStyle::Synthetic {
            self.apply_style_rewrites(document);
        }
    }

    /// Subscribe to theme-name changes. Listeners run synchronously, in
    /// subscription order, on every change path; handlers must be
    /// idempotent.
    pub fn on_color_theme_change(&mut self, listener: impl FnMut(ThemeName) + 'static) {
        self.theme_listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            active_color_theme: self.active_color_theme,
            dark_mode_active: self.dark_mode_active,
            site_has_default_dark_background: self.site_has_default_dark_background,
            background_color: self.background_color.clone(),
        }
    }

    pub fn active_color_theme(&self) -> ThemeName {
        self.active_color_theme
    }

    pub fn dark_mode_active(&self) -> bool {
        self.dark_mode_active
    }

    fn apply_active_color_theme(&mut self, document: &mut Document, sidebar: &mut dyn SidebarSurface) {
        vars::set_theme_variable(
            document,
            vars::ACTIVE_COLOR_THEME_VARIABLE,
            self.active_color_theme.as_str(),
            true,
        );
        let active = self.active_color_theme;
        for listener in &mut self.theme_listeners {
            listener(active);
        }

        let previously_dark = self.dark_mode_active;
        let mut want_dark = active == ThemeName::Dark
            || (active == ThemeName::Auto && self.system_prefers_dark);
        if self.site_has_default_dark_background {
            // A page that is dark by default must never render in a light
            // shell.
            want_dark = true;
        }
        self.dark_mode_active = want_dark;

        if want_dark && !previously_dark {
            self.enable_dark_mode(document, sidebar);
        } else if !want_dark && previously_dark {
            self.disable_dark_mode(document, sidebar);
        }

        if !self.dark_mode_active {
            let concrete = if active == ThemeName::Auto {
                self.background_color.clone()
            } else {
                active
                    .background_color()
                    .unwrap_or(CANONICAL_LIGHT_BACKGROUND)
                    .to_owned()
            };
            vars::set_theme_variable(document, vars::BACKGROUND_COLOR_VARIABLE, &concrete, true);
            sidebar.set_css_variable(vars::BACKGROUND_COLOR_VARIABLE, &concrete);
        }

        self.update_auto_mode_color(document);
    }

    /// Keep the auto-mode preview color tracking the system preference,
    /// even while a fixed theme is selected.
    fn update_auto_mode_color(&mut self, document: &mut Document) {
        let auto_color: &str = if self.system_prefers_dark {
            CANONICAL_DARK_BACKGROUND
        } else {
            &self.background_color
        };
        vars::set_theme_variable(document, vars::AUTO_BACKGROUND_VARIABLE, auto_color, true);
    }

    fn enable_dark_mode(&mut self, document: &mut Document, sidebar: &mut dyn SidebarSurface) {
        for href in ENGINE_DARK_STYLESHEETS {
            document.attach_engine_link(href, DARK_MODE_UI_CLASS);
        }
        sidebar.set_dark_mode(true);

        // Page text in synthetic mode references this; headings need it
        // even when the site's own dark styling is used.
        document
            .text_container_style
            .set(vars::DARK_THEME_TEXT_VARIABLE, DARK_THEME_TEXT_COLOR, false);

        if self.site_has_default_dark_background {
            debug!("entering dark mode: site default on {}", self.domain);
            self.applied_dark_style = AppliedDarkStyle::SiteDefault;
            self.publish_background(document, sidebar, &self.background_color.clone());
        } else if let Some(native_background) = self.enable_native_dark_rules(document) {
            debug!("entering dark mode: native rules on {}", self.domain);
            self.applied_dark_style = AppliedDarkStyle::Native;
            self.publish_background(document, sidebar, &native_background);
            if self.active_color_theme == ThemeName::Auto {
                vars::set_theme_variable(
                    document,
                    vars::AUTO_BACKGROUND_VARIABLE,
                    &native_background,
                    true,
                );
            }
        } else {
            debug!("entering dark mode: synthetic on {}", self.domain);
            self.applied_dark_style = AppliedDarkStyle::Synthetic;
            self.publish_background(document, sidebar, CANONICAL_DARK_BACKGROUND);
            self.apply_style_rewrites(document);
        }

        vars::set_theme_variable(
            document,
            vars::DARK_THEME_TEXT_VARIABLE,
            DARK_THEME_TEXT_COLOR,
            true,
        );
        sidebar.set_css_variable(vars::DARK_THEME_TEXT_VARIABLE, DARK_THEME_TEXT_COLOR);
    }

    fn disable_dark_mode(&mut self, document: &mut Document, sidebar: &mut dyn SidebarSurface) {
        debug!("exiting dark mode on {}", self.domain);

        document.root_style.remove(vars::DARK_THEME_TEXT_VARIABLE);
        document.text_container_style.remove(vars::DARK_THEME_TEXT_VARIABLE);

        self.restore_style_rewrites(document);

        for (sheet_id, rule_id) in core::mem::take(&mut self.native_dark_clones) {
            document.remove_rule(sheet_id, rule_id);
        }

        document.remove_engine_links(DARK_MODE_UI_CLASS);
        sidebar.set_dark_mode(false);

        // The early shell background is an engine artifact of dark mode;
        // put the original inline values back.
        self.restore_inline(document);

        self.applied_dark_style = AppliedDarkStyle::None;
    }

    fn publish_background(
        &self,
        document: &mut Document,
        sidebar: &mut dyn SidebarSurface,
        color: &str,
    ) {
        vars::set_theme_variable(document, vars::BACKGROUND_COLOR_VARIABLE, color, true);
        sidebar.set_css_variable(vars::BACKGROUND_COLOR_VARIABLE, color);
    }

    /// Activate the page's own dark-preference rules by cloning each as an
    /// always-active group, returning the dark background derived from
    /// them. `None` means the page has no usable native dark styling.
    fn enable_native_dark_rules(&mut self, document: &mut Document) -> Option<String> {
        if NATIVE_DARK_EXCLUDED_DOMAINS.contains(&self.domain.as_str()) {
            debug!("native dark styles are broken on {}, skipping", self.domain);
            return None;
        }

        // Top level only: nested dark queries are rare and ambiguous.
        let mut pending: Vec<(SheetId, Vec<CssRule>)> = Vec::new();
        for sheet in document.sheets() {
            if sheet.origin == SheetOrigin::Engine || sheet.cross_origin {
                continue;
            }
            for rule in &sheet.rules {
                if let CssRule::ConditionalGroup(group) = rule
                    && !group.engine_injected
                    && condition_prefers_dark(&group.condition)
                {
                    pending.push((sheet.id, group.rules.clone()));
                }
            }
        }
        if pending.is_empty() {
            return None;
        }

        let mut background: Option<String> = None;
        for (sheet_id, rules) in pending {
            if background.is_none() {
                background = first_background_declaration(&rules);
            }
            let clone = CssRule::ConditionalGroup(ConditionalGroupRule {
                id: 0,
                condition: "screen".to_owned(),
                rules,
                engine_injected: true,
            });
            if let Some(rule_id) = document.append_rule(sheet_id, clone) {
                self.native_dark_clones.push((sheet_id, rule_id));
            }
        }

        // Variable-driven declarations may not resolve to a color here;
        // fall back to the canonical dark background.
        let background = background
            .filter(|value| parse_color(value).is_some())
            .unwrap_or_else(|| CANONICAL_DARK_BACKGROUND.to_owned());
        Some(background)
    }

    /// Rewrite rule colors in place, snapshotting originals first. Rules
    /// already snapshotted are skipped, which makes re-application (and
    /// settle-window re-scans) idempotent.
    fn apply_style_rewrites(&mut self, document: &mut Document) {
        let snapshots = &mut self.rule_snapshots;
        let mut rewritten = 0_usize;
        for_each_style_rule_mut(document, &mut |rule| {
            if snapshots.contains_key(&rule.id) {
                return;
            }
            let modifications = rewrite::rule_modifications(rule);
            if modifications.is_empty() {
                return;
            }

            let mut originals: SmallVec<Declaration, 4> = SmallVec::new();
            for (name, _) in &modifications {
                if let Some(declaration) = rule.declaration(name) {
                    originals.push(declaration.clone());
                }
            }
            for (name, value) in &modifications {
                let important = rule.is_important(name);
                rule.set_property(name, value, important);
            }
            snapshots.insert(rule.id, originals);
            rewritten += 1;
        });
        trace!("rewrote colors of {rewritten} style rules");
    }

    /// Restore every snapshotted property to its recorded value.
    fn restore_style_rewrites(&mut self, document: &mut Document) {
        let snapshots = &mut self.rule_snapshots;
        for_each_style_rule_mut(document, &mut |rule| {
            if let Some(originals) = snapshots.remove(&rule.id) {
                for declaration in originals {
                    rule.set_property(&declaration.name, &declaration.value, declaration.important);
                }
            }
        });
        // Entries for rules that left the document have nothing to restore.
        snapshots.clear();
    }

    fn set_inline(
        &mut self,
        document: &mut Document,
        scope: InlineScope,
        name: &str,
        value: &str,
        important: bool,
    ) {
        let style = Self::scope_style(document, scope);
        let already_recorded = self
            .inline_restores
            .iter()
            .any(|(recorded_scope, recorded_name, _)| {
                *recorded_scope == scope && recorded_name == name
            });
        if !already_recorded {
            self.inline_restores
                .push((scope, name.to_owned(), style.declaration(name).cloned()));
        }
        style.set(name, value, important);
    }

    fn restore_inline(&mut self, document: &mut Document) {
        for (scope, name, original) in core::mem::take(&mut self.inline_restores) {
            let style = Self::scope_style(document, scope);
            match original {
                Some(declaration) => style.set(&name, &declaration.value, declaration.important),
                None => {
                    style.remove(&name);
                }
            }
        }
    }

    fn scope_style(document: &mut Document, scope: InlineScope) -> &mut InlineStyle {
        match scope {
            InlineScope::Root => &mut document.root_style,
            InlineScope::Body => &mut document.body_style,
        }
    }
}

/// Whether a media condition targets the dark preference and not the light
/// one; rules matching both are ambiguous and excluded.
fn condition_prefers_dark(condition: &str) -> bool {
    let normalized: String = condition
        .to_ascii_lowercase()
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect();
    normalized.contains("prefers-color-scheme:dark")
        && !normalized.contains("prefers-color-scheme:light")
}

/// First explicit background declaration within a native dark rule set.
fn first_background_declaration(rules: &[CssRule]) -> Option<String> {
    for rule in rules {
        match rule {
            CssRule::Style(style) => {
                if let Some(value) = style
                    .property("background")
                    .or_else(|| style.property("background-color"))
                {
                    return Some(value.to_owned());
                }
            }
            CssRule::ConditionalGroup(group) => {
                if let Some(found) = first_background_declaration(&group.rules) {
                    return Some(found);
                }
            }
            CssRule::Other(_) => {}
        }
    }
    None
}
