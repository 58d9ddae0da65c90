use lector_cssom::walker::{for_each_style_rule, for_each_style_rule_mut};
use lector_cssom::{ConditionalGroupRule, CssRule, Document, StyleRule};

const PAGE_CSS: &str = "
    body { color: rgb(20, 20, 20); background-color: white }
    .card { color: hsl(0, 0%, 20%) !important }
    @media (prefers-color-scheme: dark) {
        body { background: #111 }
    }
    @font-face { font-family: Custom; src: url(custom.woff2) }
";

fn visited_selectors(document: &Document) -> Vec<String> {
    let mut selectors = Vec::new();
    for_each_style_rule(document, &mut |rule| selectors.push(rule.selector.clone()));
    selectors
}

#[test]
fn walker_visits_nested_rules_in_order() {
    let mut document = Document::new();
    document.attach_stylesheet(PAGE_CSS);

    assert_eq!(visited_selectors(&document), ["body", ".card", "body"]);
}

#[test]
fn media_condition_and_classification_are_explicit() {
    let mut document = Document::new();
    let sheet_id = document.attach_stylesheet(PAGE_CSS);
    let sheet = document.sheet(sheet_id).expect("sheet should exist");

    let kinds: Vec<&'static str> = sheet
        .rules
        .iter()
        .map(|rule| match rule {
            CssRule::Style(_) => "style",
            CssRule::ConditionalGroup(_) => "group",
            CssRule::Other(_) => "other",
        })
        .collect();
    assert_eq!(kinds, ["style", "style", "group", "other"]);

    let CssRule::ConditionalGroup(group) = &sheet.rules[2] else {
        panic!("expected a conditional group");
    };
    assert_eq!(group.condition, "(prefers-color-scheme: dark)");
    assert!(!group.engine_injected);

    let CssRule::Other(other) = &sheet.rules[3] else {
        panic!("expected an opaque at-rule");
    };
    assert_eq!(other.text, "@font-face");
}

#[test]
fn important_is_split_from_values() {
    let mut document = Document::new();
    document.attach_stylesheet(PAGE_CSS);

    let mut card_color: Option<(String, bool)> = None;
    for_each_style_rule(&document, &mut |rule| {
        if rule.selector == ".card" {
            let declaration = rule.declaration("color").expect("color should be declared");
            card_color = Some((declaration.value.clone(), declaration.important));
        }
    });
    let (value, important) = card_color.expect(".card should be visited");
    assert_eq!(value, "hsl(0, 0%, 20%)");
    assert!(important);
}

#[test]
fn set_property_updates_in_place_and_preserves_order() {
    let mut document = Document::new();
    document.attach_stylesheet("p { color: black; margin: 0 }");

    for_each_style_rule_mut(&mut document, &mut |rule| {
        rule.set_property("color", "var(--text)", true);
    });

    let mut names = Vec::new();
    for_each_style_rule(&document, &mut |rule| {
        names = rule.declarations.iter().map(|decl| decl.name.clone()).collect();
        assert_eq!(rule.property("color"), Some("var(--text)"));
        assert!(rule.is_important("color"));
    });
    assert_eq!(names, ["color", "margin"]);
}

#[test]
fn engine_sheets_and_injected_groups_are_skipped() {
    let mut document = Document::new();
    let sheet_id = document.attach_stylesheet("p { color: black }");
    document.attach_engine_link("pageview/content-dark.css", "dark-mode-ui-style");

    let clone = CssRule::ConditionalGroup(ConditionalGroupRule {
        id: 0,
        condition: "screen".to_owned(),
        rules: vec![CssRule::Style(StyleRule {
            id: 0,
            selector: "p".to_owned(),
            declarations: Vec::new(),
        })],
        engine_injected: true,
    });
    document
        .append_rule(sheet_id, clone)
        .expect("append should succeed");

    // Only the page's own rule is visited.
    assert_eq!(visited_selectors(&document), ["p"]);

    assert_eq!(document.remove_engine_links("dark-mode-ui-style"), 1);
    assert_eq!(document.remove_engine_links("dark-mode-ui-style"), 0);
}

#[test]
fn cross_origin_sheets_are_skipped_silently() {
    let mut document = Document::new();
    document.attach_cross_origin_stylesheet("https://cdn.example/styles.css");
    document.attach_stylesheet("main { color: #222 }");

    assert_eq!(visited_selectors(&document), ["main"]);
}

#[test]
fn appended_rules_can_be_removed_exactly() {
    let mut document = Document::new();
    let sheet_id = document.attach_stylesheet("p { color: black }");
    let pristine = document.sheet(sheet_id).expect("sheet").clone();

    let rule_id = document
        .append_rule(
            sheet_id,
            CssRule::ConditionalGroup(ConditionalGroupRule {
                id: 0,
                condition: "screen".to_owned(),
                rules: Vec::new(),
                engine_injected: true,
            }),
        )
        .expect("append should succeed");
    assert_eq!(document.sheet(sheet_id).expect("sheet").rules.len(), 2);

    assert!(document.remove_rule(sheet_id, rule_id));
    assert_eq!(*document.sheet(sheet_id).expect("sheet"), pristine);
    assert!(!document.remove_rule(sheet_id, rule_id));
}

#[test]
fn malformed_rules_are_skipped_not_fatal() {
    let mut document = Document::new();
    document.attach_stylesheet("p { color: black } } garbage { ; a { margin: 0 }");

    let selectors = visited_selectors(&document);
    assert!(selectors.contains(&"p".to_owned()));
}

#[test]
fn inline_style_scopes_track_engine_writes() {
    let mut document = Document::new();
    document.root_style.set("--lector-background-color", "white", false);
    document.root_style.set("background", "#131516", true);
    assert_eq!(document.root_style.value("background"), Some("#131516"));
    assert!(
        document
            .root_style
            .declaration("background")
            .expect("background should be set")
            .important
    );

    let removed = document.root_style.remove("background");
    assert_eq!(removed.expect("entry should be removed").value, "#131516");
    assert!(document.root_style.value("background").is_none());
    assert!(!document.root_style.is_empty());
}
