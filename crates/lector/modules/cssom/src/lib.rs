//! Document style model for the reader theme engine.
//! Spec: <https://www.w3.org/TR/cssom-1/>
//!
//! The engine runs against an explicit model of the page's style state:
//! attached stylesheets holding a tree of tagged rule variants, plus the
//! inline-style scopes the engine writes to (document root, body, and the
//! reader text container). Every rule carries a stable id so reversible
//! mutations can be keyed without holding references into the tree.

#![forbid(unsafe_code)]

pub mod parser;
pub mod walker;

/// Stable identifier of a rule within a [`Document`].
pub type RuleId = u32;

/// Identifier of an attached stylesheet.
pub type SheetId = u32;

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name.
    pub name: String,
    /// Raw value text (without trailing !important).
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

/// An ordered name → value map used for element inline styles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<Declaration>,
}

impl InlineStyle {
    /// Current value of a property, if set.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.declaration(name).map(|decl| decl.value.as_str())
    }

    /// Full declaration entry for a property, if set.
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|decl| decl.name == name)
    }

    /// Set a property, replacing an existing entry in place.
    pub fn set(&mut self, name: &str, value: &str, important: bool) {
        if let Some(existing) = self.declarations.iter_mut().find(|decl| decl.name == name) {
            existing.value = value.to_owned();
            existing.important = important;
            return;
        }
        self.declarations.push(Declaration {
            name: name.to_owned(),
            value: value.to_owned(),
            important,
        });
    }

    /// Remove a property, returning the removed entry.
    pub fn remove(&mut self, name: &str) -> Option<Declaration> {
        let position = self.declarations.iter().position(|decl| decl.name == name)?;
        Some(self.declarations.remove(position))
    }

    /// Iterate declarations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    /// Whether no properties are set.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A style rule: one selector plus its declared property/value pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Stable id, assigned when the rule enters a [`Document`].
    pub id: RuleId,
    /// Raw selector text.
    pub selector: String,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    /// Declared value of a property, if present.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.declaration(name).map(|decl| decl.value.as_str())
    }

    /// Full declaration for a property, if present.
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|decl| decl.name == name)
    }

    /// Whether a declared property carries `!important`.
    pub fn is_important(&self, name: &str) -> bool {
        self.declaration(name).is_some_and(|decl| decl.important)
    }

    /// Set a property value, updating an existing declaration in place so
    /// source order is preserved.
    pub fn set_property(&mut self, name: &str, value: &str, important: bool) {
        if let Some(existing) = self.declarations.iter_mut().find(|decl| decl.name == name) {
            existing.value = value.to_owned();
            existing.important = important;
            return;
        }
        self.declarations.push(Declaration {
            name: name.to_owned(),
            value: value.to_owned(),
            important,
        });
    }

    /// Iterate custom property declarations (`--*`).
    pub fn custom_properties(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|decl| decl.name.starts_with("--"))
    }
}

/// A conditional rule group (`@media …`) containing nested rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionalGroupRule {
    /// Stable id, assigned when the rule enters a [`Document`].
    pub id: RuleId,
    /// Raw condition text, e.g. `(prefers-color-scheme: dark)`.
    pub condition: String,
    /// Nested rules in source order.
    pub rules: Vec<CssRule>,
    /// Set on always-active clones the engine appends; the walker skips
    /// these so the engine never themes its own output.
    pub engine_injected: bool,
}

/// Any other at-rule, preserved as raw text and never themed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherRule {
    /// Stable id, assigned when the rule enters a [`Document`].
    pub id: RuleId,
    /// Raw rule text (block contents are not retained).
    pub text: String,
}

/// Tagged classification of a rule tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CssRule {
    /// A selector with declarations.
    Style(StyleRule),
    /// A `@media` group with nested rules.
    ConditionalGroup(ConditionalGroupRule),
    /// Anything else (`@font-face`, `@supports`, `@import`, …).
    Other(OtherRule),
}

impl CssRule {
    /// Stable id of the underlying rule.
    pub fn id(&self) -> RuleId {
        match self {
            Self::Style(rule) => rule.id,
            Self::ConditionalGroup(group) => group.id,
            Self::Other(other) => other.id,
        }
    }
}

/// Who attached a stylesheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetOrigin {
    /// Shipped by the page itself.
    Page,
    /// Injected by the theme engine (UI styling); never walked.
    Engine,
}

/// An attached stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stylesheet {
    /// Identifier within the document.
    pub id: SheetId,
    /// Who attached the sheet.
    pub origin: SheetOrigin,
    /// Link target for sheets attached by reference.
    pub href: Option<String>,
    /// Class name tagging engine-injected links for later removal.
    pub link_class: Option<String>,
    /// Rule access throws for cross-origin sheets; the walker skips them.
    pub cross_origin: bool,
    /// Top-level rules in source order.
    pub rules: Vec<CssRule>,
}

/// The page's style state: attached sheets plus inline-style scopes.
#[derive(Clone, Debug, Default)]
pub struct Document {
    sheets: Vec<Stylesheet>,
    /// Inline style of the document root element.
    pub root_style: InlineStyle,
    /// Inline style of the body element.
    pub body_style: InlineStyle,
    /// Inline style of the reader text container.
    pub text_container_style: InlineStyle,
    next_rule_id: RuleId,
    next_sheet_id: SheetId,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse stylesheet text and attach it as a page sheet.
    pub fn attach_stylesheet(&mut self, css: &str) -> SheetId {
        let mut rules = parser::parse_stylesheet_text(css);
        self.allocate_rule_ids(&mut rules);
        self.push_sheet(Stylesheet {
            id: 0,
            origin: SheetOrigin::Page,
            href: None,
            link_class: None,
            cross_origin: false,
            rules,
        })
    }

    /// Attach a page sheet whose rules cannot be read (cross-origin).
    pub fn attach_cross_origin_stylesheet(&mut self, href: &str) -> SheetId {
        self.push_sheet(Stylesheet {
            id: 0,
            origin: SheetOrigin::Page,
            href: Some(href.to_owned()),
            link_class: None,
            cross_origin: true,
            rules: Vec::new(),
        })
    }

    /// Attach an engine stylesheet link, tagged by class for removal.
    pub fn attach_engine_link(&mut self, href: &str, link_class: &str) -> SheetId {
        self.push_sheet(Stylesheet {
            id: 0,
            origin: SheetOrigin::Engine,
            href: Some(href.to_owned()),
            link_class: Some(link_class.to_owned()),
            cross_origin: false,
            rules: Vec::new(),
        })
    }

    /// Remove every engine link carrying the given class.
    pub fn remove_engine_links(&mut self, link_class: &str) -> usize {
        let before = self.sheets.len();
        self.sheets.retain(|sheet| {
            sheet.origin != SheetOrigin::Engine
                || sheet.link_class.as_deref() != Some(link_class)
        });
        before - self.sheets.len()
    }

    /// Attached sheets in attachment order.
    pub fn sheets(&self) -> &[Stylesheet] {
        &self.sheets
    }

    /// Mutable access to the attached sheets.
    pub fn sheets_mut(&mut self) -> &mut [Stylesheet] {
        &mut self.sheets
    }

    /// Look up a sheet by id.
    pub fn sheet(&self, id: SheetId) -> Option<&Stylesheet> {
        self.sheets.iter().find(|sheet| sheet.id == id)
    }

    /// Append a rule to the end of a sheet, assigning fresh ids to the rule
    /// and any nested rules. Returns the new rule's id.
    pub fn append_rule(&mut self, sheet_id: SheetId, mut rule: CssRule) -> Option<RuleId> {
        self.allocate_rule_ids_slice(core::slice::from_mut(&mut rule));
        let new_id = rule.id();
        let sheet = self.sheets.iter_mut().find(|sheet| sheet.id == sheet_id)?;
        sheet.rules.push(rule);
        Some(new_id)
    }

    /// Remove a top-level rule from a sheet by id.
    pub fn remove_rule(&mut self, sheet_id: SheetId, rule_id: RuleId) -> bool {
        let Some(sheet) = self.sheets.iter_mut().find(|sheet| sheet.id == sheet_id) else {
            return false;
        };
        let before = sheet.rules.len();
        sheet.rules.retain(|rule| rule.id() != rule_id);
        before != sheet.rules.len()
    }

    fn push_sheet(&mut self, mut sheet: Stylesheet) -> SheetId {
        sheet.id = self.next_sheet_id;
        self.next_sheet_id += 1;
        let id = sheet.id;
        self.sheets.push(sheet);
        id
    }

    fn allocate_rule_ids(&mut self, rules: &mut Vec<CssRule>) {
        self.allocate_rule_ids_slice(&mut rules[..]);
    }

    fn allocate_rule_ids_slice(&mut self, rules: &mut [CssRule]) {
        for rule in rules {
            match rule {
                CssRule::Style(style) => {
                    style.id = self.take_rule_id();
                }
                CssRule::ConditionalGroup(group) => {
                    group.id = self.take_rule_id();
                    self.allocate_rule_ids_slice(&mut group.rules[..]);
                }
                CssRule::Other(other) => {
                    other.id = self.take_rule_id();
                }
            }
        }
    }

    fn take_rule_id(&mut self) -> RuleId {
        let id = self.next_rule_id;
        self.next_rule_id += 1;
        id
    }
}
