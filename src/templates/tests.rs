//! Template engine tests

use super::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn feedback_context() -> TeraContext {
    let mut ctx = TeraContext::new();
    let form = crate::models::FeedbackForm {
        name: "Ana".to_string(),
        email: "nope".to_string(),
        message: "Hi".to_string(),
    };
    ctx.insert("form", &form);
    ctx.insert("errors", &BTreeMap::<String, Vec<String>>::new());
    ctx
}

#[test]
fn test_builtin_templates_load() {
    let engine = TemplateEngine::builtin().expect("built-in templates should parse");
    for name in [
        "base.html",
        "error.html",
        "app1/index.html",
        "app3/index.html",
        "feedback/form.html",
        "feedback/feedbacks.html",
        "todo_list/tasks.html",
        "todo_list/add_task.html",
        "image_share/gallery.html",
        "image_share/upload.html",
        "accounts/login.html",
        "accounts/register.html",
        "admin/index.html",
        "admin/change_list.html",
        "admin/change_form.html",
        "admin/delete_confirmation.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_escapes_values() {
    let engine = TemplateEngine::builtin().unwrap();
    let mut ctx = TeraContext::new();
    ctx.insert("username", "<script>alert(1)</script>");
    ctx.insert("age", &25);

    let html = engine.render("app1/index.html", &ctx).unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>alert"));
}

#[test]
fn test_render_feedback_form_with_errors() {
    let engine = TemplateEngine::builtin().unwrap();
    let mut ctx = feedback_context();
    let mut errors = BTreeMap::new();
    errors.insert("email".to_string(), vec!["Enter a valid email address.".to_string()]);
    ctx.insert("errors", &errors);

    let html = engine.render("feedback/form.html", &ctx).unwrap();
    assert!(html.contains("Enter a valid email address."));
    assert!(html.contains("value=\"Ana\""));
}

#[test]
fn test_gallery_keeps_urls_and_escapes_titles() {
    let engine = TemplateEngine::builtin().unwrap();
    let mut ctx = TeraContext::new();
    ctx.insert(
        "photos",
        &[serde_json::json!({"url": "/uploads/photos/a.png", "title": "<b>Sea</b>"})],
    );

    let html = engine.render("image_share/gallery.html", &ctx).unwrap();
    assert!(html.contains("src=\"/uploads/photos/a.png\""));
    assert!(html.contains("&lt;b&gt;Sea&lt;&#x2F;b&gt;"));
}

#[test]
fn test_unknown_template_is_an_error() {
    let engine = TemplateEngine::builtin().unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(matches!(err, TemplateError::Render(_)));
}

#[test]
fn test_fallback_renders_error_page() {
    let engine = TemplateEngine::builtin().unwrap();
    let html = engine.render_with_fallback("nope.html", &TeraContext::new());
    assert!(html.contains("500"));
    assert!(html.contains("Server Error"));
}

#[test]
fn test_override_directory_replaces_builtin() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("app3")).unwrap();
    std::fs::write(
        dir.path().join("app3/index.html"),
        "{% for f in fruits %}[{{ f }}]{% endfor %}",
    )
    .unwrap();
    std::fs::write(dir.path().join("extra.html"), "extra page").unwrap();

    let engine = TemplateEngine::new(Some(dir.path())).unwrap();
    let mut ctx = TeraContext::new();
    ctx.insert("fruits", &["Apple", "Mango"]);

    assert_eq!(engine.render("app3/index.html", &ctx).unwrap(), "[Apple][Mango]");
    assert_eq!(engine.render("extra.html", &ctx).unwrap(), "extra page");
    // untouched templates still come from the binary
    assert!(engine.has_template("feedback/form.html"));
}

#[test]
fn test_broken_override_fails_to_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("base.html"), "{% block content %}").unwrap();
    assert!(TemplateEngine::new(Some(dir.path())).is_err());
}

#[test]
fn test_simple_error_page_escapes() {
    let page = simple_error_page(404, "<b>Not Found</b>");
    assert!(page.contains("404"));
    assert!(page.contains("&lt;b&gt;"));
}
