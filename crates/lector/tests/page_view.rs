use lector::{
    domain_from_url, JsonFileStore, MemoryStore, PageView, SettingsStore, ThemeName, UserTheme,
};
use lector_orchestrator::{rewrite, vars};
use url::Url;

fn article_url() -> Url {
    Url::parse("https://www.example.com/posts/reader-mode").expect("url should parse")
}

const PAGE_CSS: &str = "
    body { color: rgb(34, 34, 34); background-color: white }
    .card { color: hsl(0, 0%, 20%) }
";

async fn dark_page_view() -> PageView<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = MemoryStore::new();
    store
        .merge_user_theme(UserTheme {
            color_theme: Some(ThemeName::Dark),
            ..UserTheme::default()
        })
        .await
        .expect("seeding the store should succeed");

    let mut view = PageView::prepare(&article_url(), store, false)
        .await
        .expect("prepare should succeed");
    view.document_mut().attach_stylesheet(PAGE_CSS);
    view.transition_in();
    view.after_transition_in();
    view
}

fn rule_color(view: &PageView<MemoryStore>, selector: &str) -> Option<String> {
    let mut found = None;
    lector_cssom::walker::for_each_style_rule(view.document(), &mut |rule| {
        if rule.selector == selector && found.is_none() {
            found = rule.property("color").map(str::to_owned);
        }
    });
    found
}

#[test]
fn domains_are_extracted_without_www() {
    assert_eq!(domain_from_url(&article_url()), "example.com");
    let bare = Url::parse("https://news.example.org/item?id=1").expect("url should parse");
    assert_eq!(domain_from_url(&bare), "news.example.org");
}

#[tokio::test]
async fn lifecycle_applies_and_mirrors_dark_mode() {
    let view = dark_page_view().await;

    let state = view.engine_state();
    assert!(state.dark_mode_active);
    assert_eq!(state.active_color_theme, ThemeName::Dark);
    assert_eq!(
        rule_color(&view, ".card"),
        Some(rewrite::dark_text_reference())
    );

    // The sidebar mirror received the resolved colors.
    assert!(view.sidebar().dark_mode());
    assert_eq!(
        view.sidebar().variable(vars::BACKGROUND_COLOR_VARIABLE),
        Some("#212121")
    );
    assert_eq!(
        view.sidebar().variable(vars::DARK_THEME_TEXT_VARIABLE),
        Some("rgb(232, 230, 227)")
    );
}

#[tokio::test]
async fn transition_out_restores_the_page() {
    let mut view = dark_page_view().await;
    view.transition_out();

    assert!(!view.engine_state().dark_mode_active);
    assert_eq!(rule_color(&view, ".card").as_deref(), Some("hsl(0, 0%, 20%)"));
    assert!(view.document().root_style.is_empty());
    assert!(view.document().text_container_style.is_empty());
    assert!(!view.sidebar().dark_mode());

    // Deactivated views ignore preference events.
    view.handle_system_preference_change(true);
    assert!(!view.engine_state().dark_mode_active);
}

#[tokio::test]
async fn explicit_theme_changes_are_persisted() {
    let mut view = dark_page_view().await;
    view.change_color_theme(ThemeName::Sepia)
        .await
        .expect("theme change should succeed");

    assert_eq!(view.active_color_theme(), ThemeName::Sepia);
    let stored = view
        .store()
        .get_user_theme()
        .await
        .expect("store read should succeed");
    assert_eq!(stored.color_theme, Some(ThemeName::Sepia));
    assert_eq!(
        view.engine_state().background_color,
        "white",
        "detected page background is unchanged by theme choice"
    );
}

#[tokio::test]
async fn stylesheets_attached_during_settle_are_themed() {
    let mut view = dark_page_view().await;

    view.attach_stylesheet(".early { color: #303030 }");
    assert_eq!(
        rule_color(&view, ".early"),
        Some(rewrite::dark_text_reference())
    );

    view.stop_watching();
    view.attach_stylesheet(".late { color: #303030 }");
    assert_eq!(rule_color(&view, ".late").as_deref(), Some("#303030"));
}

#[tokio::test(start_paused = true)]
async fn settle_closes_the_watch_window() {
    let mut view = dark_page_view().await;
    view.settle().await;

    view.attach_stylesheet(".late { color: #303030 }");
    assert_eq!(rule_color(&view, ".late").as_deref(), Some("#303030"));
}

#[tokio::test]
async fn default_dark_pages_enter_dark_regardless_of_theme() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut view = PageView::prepare(&article_url(), MemoryStore::new(), false)
        .await
        .expect("prepare should succeed");
    view.document_mut().attach_stylesheet(PAGE_CSS);
    view.set_content_observations(lector::ContentObservations {
        main_background_color: Some("rgb(25, 28, 32)".to_owned()),
        body_background_color: None,
        main_text_color: Some("rgb(220, 220, 220)".to_owned()),
    });
    view.transition_in();
    view.after_transition_in();

    let state = view.engine_state();
    assert!(state.dark_mode_active);
    assert!(state.site_has_default_dark_background);
    assert_eq!(state.background_color, "rgb(25, 28, 32)");
    assert_eq!(
        view.sidebar().variable(vars::BACKGROUND_COLOR_VARIABLE),
        Some("rgb(25, 28, 32)")
    );
    // The page's own dark styling is trusted: nothing was rewritten.
    assert_eq!(rule_color(&view, ".card").as_deref(), Some("hsl(0, 0%, 20%)"));
}

#[tokio::test]
async fn memory_store_normalizes_malformed_font_sizes() {
    let store = MemoryStore::new();
    store
        .merge_user_theme(UserTheme {
            font_size: Some("huge".to_owned()),
            ..UserTheme::default()
        })
        .await
        .expect("merge should succeed");

    let theme = store.get_user_theme().await.expect("read should succeed");
    assert_eq!(theme.font_size.as_deref(), Some("18px"));
}

#[tokio::test]
async fn json_file_store_round_trips_and_merges() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let path = directory.path().join("settings.json");
    let store = JsonFileStore::new(&path);

    // Missing file reads as defaults.
    let theme = store.get_user_theme().await.expect("read should succeed");
    assert_eq!(theme.font_size.as_deref(), Some("18px"));
    assert_eq!(theme.color_theme, None);

    store
        .merge_user_theme(UserTheme {
            color_theme: Some(ThemeName::Dark),
            ..UserTheme::default()
        })
        .await
        .expect("merge should succeed");
    store
        .merge_user_theme(UserTheme {
            page_width: Some("780px".to_owned()),
            ..UserTheme::default()
        })
        .await
        .expect("merge should succeed");

    // A fresh handle sees both merged fields.
    let reopened = JsonFileStore::new(&path);
    let theme = reopened.get_user_theme().await.expect("read should succeed");
    assert_eq!(theme.color_theme, Some(ThemeName::Dark));
    assert_eq!(theme.page_width.as_deref(), Some("780px"));
}

#[tokio::test]
async fn json_file_store_survives_a_corrupt_file() {
    let directory = tempfile::tempdir().expect("temp dir should be created");
    let path = directory.path().join("settings.json");
    tokio::fs::write(&path, b"{not json")
        .await
        .expect("write should succeed");

    let store = JsonFileStore::new(&path);
    let theme = store.get_user_theme().await.expect("read should succeed");
    assert_eq!(theme.font_size.as_deref(), Some("18px"));
}
