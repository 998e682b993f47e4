//! Per-domain site layout and config writing.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PathsConfig;
use crate::error::ProvisionError;
use crate::php::FpmIdentity;
use crate::templates::{TemplateEngine, ACME_CHALLENGE_TEMPLATE, HTTPS_SITE_TEMPLATE};
use crate::validation::{validate_php_socket, validate_template_path};

/// Everything derived from the domain for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteLayout {
    pub domain: String,
    pub web_root: PathBuf,
    pub config_path: PathBuf,
    pub enabled_path: PathBuf,
    pub ssl_certificate: PathBuf,
    pub ssl_certificate_key: PathBuf,
}

impl SiteLayout {
    /// Derive paths for an already validated domain.
    pub fn new(domain: &str, paths: &PathsConfig) -> Self {
        let live = paths.letsencrypt_live_dir.join(domain);
        Self {
            domain: domain.to_string(),
            web_root: paths.web_root_base.join(domain),
            config_path: paths.nginx_sites_available.join(domain),
            enabled_path: paths.nginx_sites_enabled.join(domain),
            ssl_certificate: live.join("fullchain.pem"),
            ssl_certificate_key: live.join("privkey.pem"),
        }
    }

    /// Directory certbot writes challenge tokens into.
    pub fn challenge_dir(&self) -> PathBuf {
        self.web_root.join(".well-known").join("acme-challenge")
    }

    /// Create the web root and its challenge directory.
    pub fn prepare_web_root(&self) -> Result<(), ProvisionError> {
        let challenge_dir = self.challenge_dir();
        fs::create_dir_all(&challenge_dir).map_err(|e| {
            ProvisionError::execution_failed(format!(
                "Failed to create {}: {}",
                challenge_dir.display(),
                e
            ))
        })?;
        debug!(web_root = %self.web_root.display(), "Web root ready");
        Ok(())
    }

    fn acme_context(&self) -> Result<serde_json::Value, ProvisionError> {
        Ok(serde_json::json!({
            "domain": self.domain,
            "web_root": template_path(&self.web_root, "web_root")?,
        }))
    }

    fn https_context(&self, fpm: &FpmIdentity) -> Result<serde_json::Value, ProvisionError> {
        let socket = fpm.socket.to_string_lossy();
        Ok(serde_json::json!({
            "domain": self.domain,
            "web_root": template_path(&self.web_root, "web_root")?,
            "php_fpm": fpm.name,
            "php_socket": validate_php_socket(&socket)?,
            "ssl_certificate": template_path(&self.ssl_certificate, "ssl_certificate")?,
            "ssl_certificate_key": template_path(&self.ssl_certificate_key, "ssl_certificate_key")?,
        }))
    }
}

fn template_path(path: &Path, param: &str) -> Result<String, ProvisionError> {
    let text = path.to_string_lossy();
    validate_template_path(&text, param)?;
    Ok(text.into_owned())
}

/// Renders and writes the two server block variants.
pub struct SiteConfigurator {
    engine: TemplateEngine,
}

impl SiteConfigurator {
    pub fn new(engine: TemplateEngine) -> Self {
        Self { engine }
    }

    /// Write the temporary HTTP-only block used during the ACME challenge.
    pub fn write_acme_config(&self, layout: &SiteLayout) -> Result<usize, ProvisionError> {
        let content = self
            .engine
            .render(ACME_CHALLENGE_TEMPLATE, &layout.acme_context()?)?;
        write_config_file(&layout.config_path, &content)
    }

    /// Replace the site config with the final HTTPS block.
    pub fn write_https_config(
        &self,
        layout: &SiteLayout,
        fpm: &FpmIdentity,
    ) -> Result<usize, ProvisionError> {
        let content = self
            .engine
            .render(HTTPS_SITE_TEMPLATE, &layout.https_context(fpm)?)?;
        write_config_file(&layout.config_path, &content)
    }
}

/// Write `content` to `path`, replacing any previous version.
///
/// Renders into a uniquely named sibling first and renames it over the
/// target, so Nginx never reads a half-written file and reruns simply
/// overwrite.
pub fn write_config_file(path: &Path, content: &str) -> Result<usize, ProvisionError> {
    let parent = path.parent().ok_or_else(|| {
        ProvisionError::invalid_parameter("config_path", format!("{} has no parent", path.display()))
    })?;
    fs::create_dir_all(parent).map_err(|e| {
        ProvisionError::execution_failed(format!(
            "Failed to create {}: {}",
            parent.display(),
            e
        ))
    })?;

    let temp_path = parent.join(format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let write_result = (|| -> Result<(), std::io::Error> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(ProvisionError::execution_failed(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    info!(path = %path.display(), bytes = content.len(), "Nginx config written");
    Ok(content.len())
}

/// Result of enabling a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Created,
    AlreadyEnabled,
    Relinked,
}

/// Link the site config into `sites-enabled`.
///
/// An existing correct link is left alone and a link pointing elsewhere is
/// replaced. A regular file in its place is refused.
pub fn enable_site(layout: &SiteLayout) -> Result<EnableOutcome, ProvisionError> {
    let link = &layout.enabled_path;
    let target = &layout.config_path;

    let outcome = match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(link)? == *target {
                return Ok(EnableOutcome::AlreadyEnabled);
            }
            fs::remove_file(link).map_err(|e| {
                ProvisionError::execution_failed(format!(
                    "Failed to remove stale link {}: {}",
                    link.display(),
                    e
                ))
            })?;
            EnableOutcome::Relinked
        }
        Ok(_) => {
            return Err(ProvisionError::execution_failed(format!(
                "A file (not symlink) already exists at {}",
                link.display()
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => EnableOutcome::Created,
        Err(e) => return Err(e.into()),
    };

    if let Some(dir) = link.parent() {
        fs::create_dir_all(dir)?;
    }

    unix_fs::symlink(target, link).map_err(|e| {
        ProvisionError::execution_failed(format!(
            "Failed to link {} -> {}: {}",
            link.display(),
            target.display(),
            e
        ))
    })?;

    info!(link = %link.display(), target = %target.display(), "Site enabled");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::php::DetectionSource;

    fn paths_in(root: &Path) -> PathsConfig {
        PathsConfig {
            nginx_sites_available: root.join("sites-available"),
            nginx_sites_enabled: root.join("sites-enabled"),
            web_root_base: root.join("www"),
            php_fpm_socket_dir: root.join("run/php"),
            letsencrypt_live_dir: root.join("letsencrypt/live"),
            templates_dir: None,
        }
    }

    fn fpm_in(root: &Path) -> FpmIdentity {
        FpmIdentity {
            name: "php8.3".to_string(),
            socket: root.join("run/php/php8.3-fpm.sock"),
            source: DetectionSource::CliVersion,
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = SiteLayout::new("example.com", &PathsConfig::default());
        assert_eq!(layout.web_root, PathBuf::from("/var/www/example.com"));
        assert_eq!(
            layout.config_path,
            PathBuf::from("/etc/nginx/sites-available/example.com")
        );
        assert_eq!(
            layout.ssl_certificate,
            PathBuf::from("/etc/letsencrypt/live/example.com/fullchain.pem")
        );
        assert_eq!(
            layout.challenge_dir(),
            PathBuf::from("/var/www/example.com/.well-known/acme-challenge")
        );
    }

    #[test]
    fn test_https_config_contents() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new("example.com", &paths_in(dir.path()));
        let configurator = SiteConfigurator::new(TemplateEngine::builtin().unwrap());

        configurator
            .write_https_config(&layout, &fpm_in(dir.path()))
            .unwrap();
        let written = fs::read_to_string(&layout.config_path).unwrap();

        assert!(written.contains("listen 443 ssl;"));
        assert!(written.contains("listen [::]:443 ssl;"));
        assert!(written.contains("http2 on;"));
        assert!(!written.contains("ssl http2"));
        assert!(written.contains(&format!(
            "fastcgi_pass unix:{};",
            dir.path().join("run/php/php8.3-fpm.sock").display()
        )));
        assert!(written.contains(&format!(
            "ssl_certificate {};",
            layout.ssl_certificate.display()
        )));
        assert!(written.contains("Strict-Transport-Security"));
        assert!(written.contains("X-Content-Type-Options"));
        assert!(written.contains("return 301 https://$host$request_uri;"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new("example.com", &paths_in(dir.path()));
        let configurator = SiteConfigurator::new(TemplateEngine::builtin().unwrap());

        configurator.write_acme_config(&layout).unwrap();
        configurator.write_acme_config(&layout).unwrap();
        let first = fs::read_to_string(&layout.config_path).unwrap();
        configurator.write_acme_config(&layout).unwrap();
        assert_eq!(fs::read_to_string(&layout.config_path).unwrap(), first);

        // No temp files left behind
        let entries: Vec<_> = fs::read_dir(layout.config_path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unsafe_web_root_is_rejected() {
        let mut paths = paths_in(Path::new("/tmp"));
        paths.web_root_base = PathBuf::from("/srv/my sites");
        let layout = SiteLayout::new("example.com", &paths);
        let configurator = SiteConfigurator::new(TemplateEngine::builtin().unwrap());
        assert!(configurator.write_acme_config(&layout).is_err());
    }

    #[test]
    fn test_enable_site_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new("example.com", &paths_in(dir.path()));
        write_config_file(&layout.config_path, "server {}\n").unwrap();

        assert_eq!(enable_site(&layout).unwrap(), EnableOutcome::Created);
        assert_eq!(enable_site(&layout).unwrap(), EnableOutcome::AlreadyEnabled);
        assert_eq!(fs::read_link(&layout.enabled_path).unwrap(), layout.config_path);
    }

    #[test]
    fn test_enable_site_replaces_stale_link() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new("example.com", &paths_in(dir.path()));
        fs::create_dir_all(layout.enabled_path.parent().unwrap()).unwrap();
        unix_fs::symlink(dir.path().join("elsewhere"), &layout.enabled_path).unwrap();

        assert_eq!(enable_site(&layout).unwrap(), EnableOutcome::Relinked);
        assert_eq!(fs::read_link(&layout.enabled_path).unwrap(), layout.config_path);
    }

    #[test]
    fn test_enable_site_refuses_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SiteLayout::new("example.com", &paths_in(dir.path()));
        fs::create_dir_all(layout.enabled_path.parent().unwrap()).unwrap();
        fs::write(&layout.enabled_path, "server {}").unwrap();

        assert!(enable_site(&layout).is_err());
    }
}
