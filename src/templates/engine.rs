//! Tera template engine wrapper.
//!
//! Server-block templates ship inside the binary. An optional directory of
//! `.tera` files can override any of them by name.

use std::path::Path;

use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::ProvisionError;

/// Temporary HTTP-only block served while the ACME challenge runs.
pub const ACME_CHALLENGE_TEMPLATE: &str = "nginx/acme-challenge.conf.tera";

/// Final HTTPS block with PHP-FPM and security headers.
pub const HTTPS_SITE_TEMPLATE: &str = "nginx/https-site.conf.tera";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        ACME_CHALLENGE_TEMPLATE,
        include_str!("../../templates/nginx/acme-challenge.conf.tera"),
    ),
    (
        HTTPS_SITE_TEMPLATE,
        include_str!("../../templates/nginx/https-site.conf.tera"),
    ),
];

/// Template engine for rendering Nginx configuration files.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create an engine holding only the built-in templates.
    pub fn builtin() -> Result<Self, ProvisionError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())
            .map_err(|e| ProvisionError::Template {
                message: format!("Failed to load built-in templates: {}", e),
            })?;

        Ok(Self { tera })
    }

    /// Create an engine whose templates in `override_dir` take precedence
    /// over the built-in ones.
    ///
    /// Templates are loaded recursively with the `.tera` extension; names
    /// are relative to the directory (e.g. `nginx/https-site.conf.tera`).
    pub fn with_overrides(override_dir: &Path) -> Result<Self, ProvisionError> {
        let pattern = override_dir.join("**/*.tera");
        let pattern_str = pattern.to_string_lossy();

        debug!(pattern = %pattern_str, "Loading template overrides");

        let mut tera = Tera::new(&pattern_str).map_err(|e| ProvisionError::Template {
            message: format!(
                "Failed to load templates from '{}': {}",
                override_dir.display(),
                e
            ),
        })?;

        let overridden = tera.get_template_names().count();

        // extend() keeps templates already present, so overrides win.
        let builtin = Self::builtin()?;
        tera.extend(&builtin.tera).map_err(|e| ProvisionError::Template {
            message: format!("Failed to merge built-in templates: {}", e),
        })?;

        info!(
            directory = %override_dir.display(),
            overridden,
            "Template overrides loaded"
        );

        Ok(Self { tera })
    }

    /// Build the engine for a run: overrides when the directory is
    /// configured and present, built-ins otherwise.
    pub fn load(override_dir: Option<&Path>) -> Result<Self, ProvisionError> {
        match override_dir {
            Some(dir) if dir.is_dir() => Self::with_overrides(dir),
            Some(dir) => {
                debug!(directory = %dir.display(), "Template directory absent, using built-ins");
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    /// Render a template with the given context.
    pub fn render(
        &self,
        template_name: &str,
        context: &serde_json::Value,
    ) -> Result<String, ProvisionError> {
        let tera_context = Context::from_serialize(context).map_err(|e| ProvisionError::Template {
            message: format!("Invalid template context: {}", e),
        })?;

        self.tera
            .render(template_name, &tera_context)
            .map_err(|e| ProvisionError::Template {
                message: format!("Failed to render template '{}': {}", template_name, e),
            })
    }

    /// Check if a template exists.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_builtin_templates_present() {
        let engine = TemplateEngine::builtin().unwrap();
        assert!(engine.has_template(ACME_CHALLENGE_TEMPLATE));
        assert!(engine.has_template(HTTPS_SITE_TEMPLATE));
    }

    #[test]
    fn test_render_acme_challenge() {
        let engine = TemplateEngine::builtin().unwrap();
        let rendered = engine
            .render(
                ACME_CHALLENGE_TEMPLATE,
                &serde_json::json!({
                    "domain": "example.com",
                    "web_root": "/var/www/example.com",
                }),
            )
            .unwrap();

        assert!(rendered.contains("server_name example.com;"));
        assert!(rendered.contains("root /var/www/example.com;"));
        assert!(rendered.contains("/.well-known/acme-challenge/"));
        assert!(!rendered.contains("443"));
    }

    #[test]
    fn test_missing_variable_is_error() {
        let engine = TemplateEngine::builtin().unwrap();
        let result = engine.render(ACME_CHALLENGE_TEMPLATE, &serde_json::json!({}));
        assert!(matches!(result, Err(ProvisionError::Template { .. })));
    }

    #[test]
    fn test_missing_template() {
        let engine = TemplateEngine::builtin().unwrap();
        let result = engine.render("nonexistent.tera", &serde_json::json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn test_override_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nginx")).unwrap();
        fs::write(
            dir.path().join("nginx/acme-challenge.conf.tera"),
            "# custom {{ domain }}\n",
        )
        .unwrap();

        let engine = TemplateEngine::load(Some(dir.path())).unwrap();
        let rendered = engine
            .render(
                ACME_CHALLENGE_TEMPLATE,
                &serde_json::json!({"domain": "example.com", "web_root": "/srv"}),
            )
            .unwrap();
        assert_eq!(rendered.trim(), "# custom example.com");

        // Non-overridden templates still come from the built-ins
        assert!(engine.has_template(HTTPS_SITE_TEMPLATE));
    }

    #[test]
    fn test_absent_override_directory_falls_back() {
        let engine = TemplateEngine::load(Some(Path::new("/nonexistent/templates"))).unwrap();
        assert!(engine.has_template(HTTPS_SITE_TEMPLATE));
    }
}
