//! Schema templates.
//!
//! A template is plain SurrealQL text containing the placeholder
//! [`PLACEHOLDER`]. Rendering replaces every occurrence with the tenant's
//! database name; nothing else is interpreted.
//!
//! Templates are looked up as `<dir>/<tenant_type>.surql`, or served from the
//! copies built into this crate when no directory is configured.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tenantry_core::{TenantError, TenantResult, TenantType};
use tracing::debug;

/// Token replaced by the tenant's database name.
pub const PLACEHOLDER: &str = "{{DATABASE_NAME}}";

/// File extension of template files.
pub const TEMPLATE_EXTENSION: &str = "surql";

const EMBEDDED_RETAIL: &str = include_str!("../templates/retail.surql");
const EMBEDDED_RESTAURANT: &str = include_str!("../templates/restaurant.surql");

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Tenant type this template provisions.
    pub tenant_type: TenantType,
    /// Where it was loaded from.
    pub origin: String,
    /// Raw text.
    pub content: String,
    /// Checksum of the raw text, for logging which version was applied.
    pub checksum: String,
}

impl Template {
    fn new(tenant_type: TenantType, origin: String, content: String) -> Self {
        let checksum = compute_checksum(&content);
        Self {
            tenant_type,
            origin,
            content,
            checksum,
        }
    }

    /// Substitute the database name into this template.
    pub fn render(&self, database: &str) -> TenantResult<String> {
        render(&self.content, database).map_err(|message| TenantError::template(&self.origin, message))
    }
}

/// Replace every [`PLACEHOLDER`] in `template` with `database`.
///
/// Fails when the template has no placeholder, since applying it would
/// provision some other database.
///
/// ```rust
/// use tenantry_provision::template::render;
///
/// let script = render("DEFINE DATABASE {{DATABASE_NAME}}; USE DB {{DATABASE_NAME}};", "org_acme").unwrap();
/// assert_eq!(script, "DEFINE DATABASE org_acme; USE DB org_acme;");
/// ```
pub fn render(template: &str, database: &str) -> Result<String, String> {
    if database.is_empty() {
        return Err("database name must not be empty".to_string());
    }
    if !template.contains(PLACEHOLDER) {
        return Err(format!("template does not contain {}", PLACEHOLDER));
    }
    Ok(template.replace(PLACEHOLDER, database))
}

fn compute_checksum(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Directory(PathBuf),
    Embedded,
}

/// Resolves tenant types to templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    source: Source,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::embedded()
    }
}

impl TemplateStore {
    /// Read templates from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(dir.into()),
        }
    }

    /// Serve the built-in templates.
    pub fn embedded() -> Self {
        Self {
            source: Source::Embedded,
        }
    }

    /// Use `dir` when given, the built-in templates otherwise.
    pub fn from_directory(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::new(dir),
            None => Self::embedded(),
        }
    }

    /// The template directory, if any.
    pub fn directory(&self) -> Option<&Path> {
        match &self.source {
            Source::Directory(dir) => Some(dir),
            Source::Embedded => None,
        }
    }

    /// Path of the template for `tenant_type`.
    pub fn path_for(&self, tenant_type: TenantType) -> String {
        let file = format!("{}.{}", tenant_type.as_str(), TEMPLATE_EXTENSION);
        match &self.source {
            Source::Directory(dir) => dir.join(file).display().to_string(),
            Source::Embedded => format!("embedded:{}", file),
        }
    }

    /// Load the template for `tenant_type`.
    pub async fn load(&self, tenant_type: TenantType) -> TenantResult<Template> {
        let origin = self.path_for(tenant_type);
        let content = match &self.source {
            Source::Embedded => match tenant_type {
                TenantType::Retail => EMBEDDED_RETAIL.to_string(),
                TenantType::Restaurant => EMBEDDED_RESTAURANT.to_string(),
            },
            Source::Directory(_) => tokio::fs::read_to_string(&origin)
                .await
                .map_err(|e| TenantError::template(&origin, e.to_string()))?,
        };

        debug!(template = %origin, "Loaded schema template");
        Ok(Template::new(tenant_type, origin, content))
    }

    /// Load and render the script provisioning `database` as `tenant_type`.
    pub async fn script_for(&self, tenant_type: TenantType, database: &str) -> TenantResult<String> {
        self.load(tenant_type).await?.render(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let script = render("A {{DATABASE_NAME}} B {{DATABASE_NAME}}{{DATABASE_NAME}}", "org_x").unwrap();
        assert_eq!(script, "A org_x B org_xorg_x");
    }

    #[test]
    fn test_render_without_placeholder_fails() {
        assert!(render("DEFINE TABLE product;", "org_x").is_err());
        assert!(render("{{DATABASE_NAME}}", "").is_err());
    }

    #[tokio::test]
    async fn test_embedded_templates_render() {
        let store = TemplateStore::embedded();
        for tenant_type in TenantType::ALL {
            let template = store.load(tenant_type).await.unwrap();
            assert!(template.origin.starts_with("embedded:"));

            let script = template.render("org_acme").unwrap();
            assert!(!script.contains(PLACEHOLDER));
            assert!(script.contains("DEFINE DATABASE IF NOT EXISTS org_acme;"));
        }
    }

    #[tokio::test]
    async fn test_directory_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("retail.surql"),
            "USE DB {{DATABASE_NAME}}; DEFINE TABLE shelf;",
        )
        .unwrap();

        let store = TemplateStore::new(dir.path());
        let script = store.script_for(TenantType::Retail, "org_1").await.unwrap();
        assert_eq!(script, "USE DB org_1; DEFINE TABLE shelf;");

        match store.load(TenantType::Restaurant).await {
            Err(TenantError::Template { path, .. }) => assert!(path.ends_with("restaurant.surql")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_template_without_placeholder_is_template_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("retail.surql"), "DEFINE TABLE shelf;").unwrap();

        let err = TemplateStore::new(dir.path())
            .script_for(TenantType::Retail, "org_1")
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::Template { .. }));
    }

    #[test]
    fn test_checksum_tracks_content() {
        let a = Template::new(TenantType::Retail, "a".into(), "x".into());
        let b = Template::new(TenantType::Retail, "b".into(), "x".into());
        let c = Template::new(TenantType::Retail, "c".into(), "y".into());
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
    }
}
