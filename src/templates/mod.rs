//! Template engine
//!
//! HTML pages are rendered with Tera. The built-in templates under
//! `templates/` are embedded in the binary; an optional override directory
//! can replace any of them by name (e.g. `feedback/form.html`).

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

#[cfg(test)]
mod tests;

pub use error::TemplateError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct BuiltinTemplates;

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Engine over the embedded templates only
    pub fn builtin() -> Result<Self> {
        Self::new(None)
    }

    /// Engine over the embedded templates, overridden by `override_dir`
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::new();

        for name in BuiltinTemplates::iter() {
            let file = BuiltinTemplates::get(&name)
                .ok_or_else(|| TemplateError::Load(format!("embedded template vanished: {}", name)))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| TemplateError::Load(format!("{} is not UTF-8", name)))?;
            templates.push((name.to_string(), content));
        }

        if let Some(dir) = override_dir {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)
                .with_context(|| format!("Failed to read template directory {:?}", dir))?;
            for (name, content) in overrides {
                tracing::info!(template = %name, "using template override");
                match templates.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(slot) => slot.1 = content,
                    None => templates.push((name, content)),
                }
            }
        }

        // Inheritance chains are built once every template is in
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| TemplateError::Load(error_chain(&e)))?;

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::Render(format!("Failed to render '{}': {}", template, error_chain(&e))))
    }

    /// Render a template, falling back to `error.html` and then to a bare
    /// page when that fails too
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(template, error = %e, "template rendering failed");

                let mut error_context = TeraContext::new();
                error_context.insert("status", &500);
                error_context.insert("message", "Server Error");
                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(_) => simple_error_page(500, "Server Error"),
                }
            }
        }
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }
}

/// Flatten an error and its sources into one line
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!(": {}", s));
        source = s.source();
    }
    message
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), TemplateError> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative = path
                .strip_prefix(base_path)
                .map_err(|_| TemplateError::Load(format!("bad template path {:?}", path)))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

/// Last-resort page when even `error.html` cannot be rendered
pub fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{status} {message}</title></head>
<body><h1>{status}</h1><p>{message}</p></body>
</html>"#,
        status = status,
        message = tera::escape_html(message)
    )
}
