//! Integration tests for the handlebars view driver
//!
//! These tests build real application layouts on disk and drive the
//! template-handler contract end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tempfile::TempDir;
use viewdriver::{App, HandlebarsDriver, HostApp, TemplateHandler, ViewData, ViewError, inline_view_name};
use viewfactory::ViewFinder;

// =============================================================================
// Fixtures
// =============================================================================

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

fn driver_for(app: App, options: Value) -> HandlebarsDriver<Vec<u8>> {
    let app: Arc<dyn HostApp> = Arc::new(app);
    HandlebarsDriver::with_output(app, object(options), Vec::new())
}

fn rendered(driver: &HandlebarsDriver<Vec<u8>>) -> String {
    String::from_utf8(driver.output().clone()).unwrap()
}

/// Finder whose every lookup fails with an I/O error
struct BrokenFinder {
    paths: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl ViewFinder for BrokenFinder {
    fn find(&self, _name: &str) -> viewfactory::Result<PathBuf> {
        Err(ViewError::Io(std::io::Error::other("disk on fire")))
    }

    fn add_location(&mut self, location: PathBuf) {
        self.paths.push(location);
    }

    fn add_namespace(&mut self, _namespace: &str, _hints: Vec<PathBuf>) {}

    fn add_extension(&mut self, extension: &str) {
        self.extensions.push(extension.to_string());
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

// =============================================================================
// Naming and fetch
// =============================================================================

#[test]
fn test_fetch_resolves_snake_case_action() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/user/get_user_info.hbs", "Hello {{name}}");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver
        .fetch("user/getUserInfo", &object(json!({"name": "Ann"})))
        .unwrap();
    assert_eq!(rendered(&driver), "Hello Ann");
}

#[test]
fn test_fetch_lowercase_rule() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/user/getuserinfo.hbs", "lower");

    let mut driver = driver_for(App::new(dir.path()), json!({"auto_rule": 2}));
    driver.fetch("user/GetUserInfo", &ViewData::new()).unwrap();
    assert_eq!(rendered(&driver), "lower");
}

#[test]
fn test_fetch_preserve_rule() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/user/getUserInfo.hbs", "as-is");

    let mut driver = driver_for(App::new(dir.path()), json!({"auto_rule": 3}));
    assert!(driver.exists("user/getUserInfo"));
    driver.fetch("user/getUserInfo", &ViewData::new()).unwrap();
    assert_eq!(rendered(&driver), "as-is");
}

#[test]
fn test_fetch_missing_template_propagates() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("view")).unwrap();

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let err = driver.fetch("user/missing", &ViewData::new()).unwrap_err();
    assert!(err.is_not_found());
    assert!(driver.output().is_empty());
}

#[test]
fn test_fetch_compile_error_propagates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/broken.hbs", "{{#each items}}never closed");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let err = driver.fetch("broken", &ViewData::new()).unwrap_err();
    assert!(matches!(err, ViewError::Template(_)));
}

#[test]
fn test_shared_app_and_helpers_in_templates() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "app/index/view/form/edit.hbs",
        "{{#each app.modules}}{{this}};{{/each}}{{method_field \"PUT\"}}",
    );

    let app = App::new(dir.path()).with_modules(["index", "admin"]);
    let mut driver = driver_for(app, json!({}));
    driver.fetch("form/edit", &ViewData::new()).unwrap();
    assert_eq!(
        rendered(&driver),
        r#"index;admin;<input type="hidden" name="_method" value="PUT">"#
    );
}

#[test]
fn test_configured_html_suffix_is_compiled() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.html", "<h1>{{title}}</h1>");

    let mut driver = driver_for(App::new(dir.path()), json!({"view_suffix": "html"}));
    driver
        .fetch("index/index", &object(json!({"title": "Home"})))
        .unwrap();
    assert_eq!(rendered(&driver), "<h1>Home</h1>");
}

#[test]
fn test_namespaced_fetch() {
    let dir = TempDir::new().unwrap();
    let mail_dir = dir.path().join("mail_templates");
    write(&mail_dir, "welcome/send_now.hbs", "Welcome {{who}}");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver.add_namespace("mail", &mail_dir);
    driver
        .fetch("mail::welcome/sendNow", &object(json!({"who": "Bo"})))
        .unwrap();
    assert_eq!(rendered(&driver), "Welcome Bo");
}

#[test]
fn test_fetch_includes_view_by_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "{{> common/header}} body");
    write(dir.path(), "view/common/header.hbs", "<h1>{{title}}</h1>");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver
        .fetch("index/index", &object(json!({"title": "Home"})))
        .unwrap();
    assert_eq!(rendered(&driver), "<h1>Home</h1> body");
}

#[test]
fn test_included_view_found_in_module_directory() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "{{#if user}}{{> user/badge}}{{/if}}!");
    write(dir.path(), "app/index/view/user/badge.hbs", "[{{user}}]");

    let app = App::new(dir.path()).with_modules(["index"]);
    let mut driver = driver_for(app, json!({}));
    driver
        .fetch("index/index", &object(json!({"user": "ann"})))
        .unwrap();
    assert_eq!(rendered(&driver), "[ann]!");
}

#[test]
fn test_missing_include_is_a_render_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "{{> common/nowhere}}");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let err = driver.fetch("index/index", &ViewData::new()).unwrap_err();
    assert!(matches!(err, ViewError::Render(_)));
}

#[test]
fn test_data_key_named_like_builtin_helper() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "{{this.raw}}|{{this.log}}");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver
        .fetch("index/index", &object(json!({"raw": "cooked", "log": "kept"})))
        .unwrap();
    assert_eq!(rendered(&driver), "cooked|kept");
}

#[test]
fn test_compiled_templates_live_under_cache_path() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cc");
    write(dir.path(), "view/a.hbs", "A{{n}}");

    let mut driver = driver_for(
        App::new(dir.path()),
        json!({"cache_path": cache.to_string_lossy()}),
    );
    driver.fetch("a", &object(json!({"n": 1}))).unwrap();
    assert!(cache.is_dir());
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);

    // a rebuilt engine reuses the artifact
    driver.config(Map::new());
    driver.fetch("a", &object(json!({"n": 2}))).unwrap();
    assert_eq!(rendered(&driver), "A1A2");
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
}

#[test]
fn test_edited_view_recompiled_after_reconfigure() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/a.hbs", "old");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver.fetch("a", &ViewData::new()).unwrap();

    write(dir.path(), "view/a.hbs", "brand new");
    driver.config(Map::new());
    driver.fetch("a", &ViewData::new()).unwrap();
    assert_eq!(rendered(&driver), "oldbrand new");
}

// =============================================================================
// CSRF
// =============================================================================

#[test]
fn test_csrf_field_uses_host_token() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/form.hbs", "{{csrf_field}}");

    let app = App::new(dir.path()).with_csrf_token("session-token");
    let mut driver = driver_for(app, json!({}));
    driver.fetch("form", &ViewData::new()).unwrap();
    driver.fetch("form", &ViewData::new()).unwrap();
    let field = r#"<input type="hidden" name="__token__" value="session-token">"#;
    assert_eq!(rendered(&driver), format!("{field}{field}"));
}

#[test]
fn test_csrf_field_prefers_token_in_view_data() {
    let dir = TempDir::new().unwrap();
    let app = App::new(dir.path()).with_csrf_token("session-token");
    let mut driver = driver_for(app, json!({}));

    driver
        .display("{{csrf_field}}", &object(json!({"csrf_token": "given"})))
        .unwrap();
    assert_eq!(
        rendered(&driver),
        r#"<input type="hidden" name="__token__" value="given">"#
    );
}

#[test]
fn test_csrf_field_without_token_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/form.hbs", "{{csrf_field}}");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let err = driver.fetch("form", &ViewData::new()).unwrap_err();
    assert!(matches!(err, ViewError::Render(_)));
    assert!(driver.output().is_empty());
}

// =============================================================================
// exists
// =============================================================================

#[test]
fn test_exists() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "x");

    let driver = driver_for(App::new(dir.path()), json!({}));
    assert!(driver.exists("index/index"));
    assert!(!driver.exists("index/other"));
    assert!(!driver.exists("unknown::index/index"));
    assert!(!driver.exists("a::b::c"));
}

#[test]
fn test_exists_swallows_lookup_errors() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "x");

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    driver.factory_mut().set_finder(Box::new(BrokenFinder {
        paths: Vec::new(),
        extensions: Vec::new(),
    }));
    assert!(!driver.exists("index/index"));
}

// =============================================================================
// display
// =============================================================================

#[test]
fn test_display_renders_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let content = "Inline {{value}}";

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let temp_path = driver.cache_path().join(inline_view_name(content, "hbs"));

    driver
        .display(content, &object(json!({"value": 42})))
        .unwrap();
    assert_eq!(rendered(&driver), "Inline 42");
    assert!(driver.cache_path().is_dir());
    assert!(!temp_path.exists());
}

#[test]
fn test_display_cleans_up_after_compile_failure() {
    let dir = TempDir::new().unwrap();
    let content = "{{#if flag}}unterminated";

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    let temp_path = driver.cache_path().join(inline_view_name(content, "hbs"));

    assert!(driver.display(content, &ViewData::new()).is_err());
    assert!(!temp_path.exists());
    assert!(driver.output().is_empty());
}

#[test]
fn test_display_cleans_up_after_render_failure() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("custom_cache");
    let content = "{{missing_variable}}";

    let mut driver = driver_for(
        App::new(dir.path()),
        json!({"cache_path": cache.to_string_lossy(), "strict_variables": true}),
    );
    let temp_path = cache.join(inline_view_name(content, "hbs"));

    let err = driver.display(content, &ViewData::new()).unwrap_err();
    assert!(matches!(err, ViewError::Render(_)));
    assert!(!temp_path.exists());
}

#[test]
fn test_display_uses_first_configured_suffix() {
    let dir = TempDir::new().unwrap();
    let content = "<b>{{x}}</b>";

    let mut driver = driver_for(App::new(dir.path()), json!({"view_suffix": "tpl,html"}));
    driver.display(content, &object(json!({"x": "y"}))).unwrap();
    assert_eq!(rendered(&driver), "<b>y</b>");
    assert!(!driver.cache_path().join(inline_view_name(content, "tpl")).exists());
}

#[test]
fn test_display_twice_with_same_content() {
    let dir = TempDir::new().unwrap();
    let mut driver = driver_for(App::new(dir.path()), json!({}));

    driver.display("[{{n}}]", &object(json!({"n": 1}))).unwrap();
    driver.display("[{{n}}]", &object(json!({"n": 2}))).unwrap();
    assert_eq!(rendered(&driver), "[1][2]");
}

// =============================================================================
// Search paths and configuration
// =============================================================================

#[test]
fn test_search_paths_single_module() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("view")).unwrap();
    fs::create_dir_all(dir.path().join("app/view")).unwrap();

    let driver = driver_for(App::new(dir.path()), json!({}));
    assert_eq!(
        driver.search_paths(),
        [dir.path().join("view"), dir.path().join("app").join("view")]
    );
}

#[test]
fn test_search_paths_multi_module() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("app/view")).unwrap();
    fs::create_dir_all(dir.path().join("app/admin/view")).unwrap();
    fs::create_dir_all(dir.path().join("app/index/view")).unwrap();

    let app = App::new(dir.path()).with_modules(["index", "missing", "admin"]);
    let driver = driver_for(app, json!({}));
    assert_eq!(
        driver.search_paths(),
        [
            dir.path().join("app").join("index").join("view"),
            dir.path().join("app").join("admin").join("view"),
        ]
    );
}

#[test]
fn test_search_paths_skip_missing() {
    let dir = TempDir::new().unwrap();
    let driver = driver_for(App::new(dir.path()), json!({}));
    assert!(driver.search_paths().is_empty());
    assert!(!driver.exists("index/index"));
}

#[test]
fn test_root_view_dir_wins_over_module() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "view/index/index.hbs", "root");
    write(dir.path(), "app/index/view/index/index.hbs", "module");

    let app = App::new(dir.path()).with_modules(["index"]);
    let mut driver = driver_for(app, json!({}));
    driver.fetch("index/index", &ViewData::new()).unwrap();
    assert_eq!(rendered(&driver), "root");
}

#[test]
fn test_reconfigure_recomputes_search_paths() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("view")).unwrap();
    fs::create_dir_all(dir.path().join("tpl")).unwrap();

    let mut driver = driver_for(App::new(dir.path()), json!({}));
    assert_eq!(driver.search_paths(), [dir.path().join("view")]);

    driver.config(object(json!({"view_dir_name": "tpl"})));
    assert_eq!(driver.search_paths(), [dir.path().join("tpl")]);

    driver.config(object(json!({"view_dir_name": "tpl"})));
    assert_eq!(driver.search_paths().len(), 1);
}

#[test]
fn test_config_merge_semantics() {
    let dir = TempDir::new().unwrap();
    let mut driver = driver_for(App::new(dir.path()), json!({}));

    driver.config(object(json!({"auto_rule": 2, "view_dir_name": "tpl"})));
    driver.config(object(json!({"auto_rule": 1, "layout": "main"})));

    assert_eq!(driver.get_config("auto_rule"), Some(&json!(1)));
    assert_eq!(driver.get_config("view_dir_name"), Some(&json!("tpl")));
    assert_eq!(driver.get_config("layout"), Some(&json!("main")));
    assert_eq!(driver.get_config("nonexistent"), None);
}

#[test]
fn test_empty_view_dir_name_searches_base_directories() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "index/index.hbs", "at root");

    let mut driver = driver_for(App::new(dir.path()), json!({"view_dir_name": ""}));
    assert_eq!(driver.search_paths()[0], dir.path().join(""));
    driver.fetch("index/index", &ViewData::new()).unwrap();
    assert_eq!(rendered(&driver), "at root");
}

#[test]
fn test_reconfigure_picks_up_new_directory() {
    let dir = TempDir::new().unwrap();
    let mut driver = driver_for(App::new(dir.path()), json!({}));
    assert!(!driver.exists("index/index"));

    write(dir.path(), "view/index/index.hbs", "late");
    driver.config(Map::new());
    assert!(driver.exists("index/index"));
}
