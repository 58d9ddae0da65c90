//! Recursive traversal over every themable style rule in a document.
//!
//! The walker descends into conditional groups and skips everything the
//! engine must not touch: sheets the engine attached itself, always-active
//! clones it injected, and cross-origin sheets whose rules cannot be read.

use crate::CssRule;
use crate::Document;
use crate::SheetOrigin;
use crate::StyleRule;
use log::trace;

/// Visit every style rule in the document, in sheet and source order.
pub fn for_each_style_rule(document: &Document, visit: &mut dyn FnMut(&StyleRule)) {
    for sheet in document.sheets() {
        if sheet.origin == SheetOrigin::Engine {
            continue;
        }
        if sheet.cross_origin {
            trace!("skipping cross-origin stylesheet {:?}", sheet.href);
            continue;
        }
        visit_rules(&sheet.rules, visit);
    }
}

/// Mutable variant of [`for_each_style_rule`], used to apply and revert
/// per-rule color rewrites in place.
pub fn for_each_style_rule_mut(document: &mut Document, visit: &mut dyn FnMut(&mut StyleRule)) {
    for sheet in document.sheets_mut() {
        if sheet.origin == SheetOrigin::Engine {
            continue;
        }
        if sheet.cross_origin {
            trace!("skipping cross-origin stylesheet {:?}", sheet.href);
            continue;
        }
        visit_rules_mut(&mut sheet.rules, visit);
    }
}

fn visit_rules(rules: &[CssRule], visit: &mut dyn FnMut(&StyleRule)) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => visit(style),
            CssRule::ConditionalGroup(group) => {
                if !group.engine_injected {
                    visit_rules(&group.rules, visit);
                }
            }
            CssRule::Other(_) => {}
        }
    }
}

fn visit_rules_mut(rules: &mut [CssRule], visit: &mut dyn FnMut(&mut StyleRule)) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => visit(style),
            CssRule::ConditionalGroup(group) => {
                if !group.engine_injected {
                    visit_rules_mut(&mut group.rules, visit);
                }
            }
            CssRule::Other(_) => {}
        }
    }
}
