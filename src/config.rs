//! YAML configuration for schema-cycles.
//!
//! Settings are read from `--config FILE` or, when present, from
//! `<config_dir>/schema-cycles/config.yaml`. Command-line flags override file
//! values; the result is resolved once into [`Settings`].
//!
//! ```yaml
//! schema: public
//! audit_suffixes: [_aud, _audit]
//! exclude: ["tmp_*"]
//! connection:
//!   host: localhost
//!   port: 5432
//!   database: app
//!   user: app
//! render:
//!   engine: sfdp
//!   layout: lr
//! ```

use crate::catalog::{AuditFilter, DEFAULT_AUDIT_SUFFIXES};
use crate::error::{Error, Result};
use crate::graph::{Layout, LayoutEngine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// PostgreSQL connection parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    /// Falls back to the `PGPASSWORD` environment variable
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// libpq connection string, taking the password from `PGPASSWORD` if unset
    pub fn dsn(&self) -> String {
        let env_password = std::env::var("PGPASSWORD").ok();
        self.dsn_with_password(self.password.as_deref().or(env_password.as_deref()))
    }

    fn dsn_with_password(&self, password: Option<&str>) -> String {
        let port = self.port.map(|p| p.to_string());
        [
            ("host", self.host.as_deref()),
            ("port", port.as_deref()),
            ("dbname", self.database.as_deref()),
            ("user", self.user.as_deref()),
            ("password", password),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("{}={}", key, quote_dsn_value(v))))
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Password-free label such as `app@localhost:5432/app`
    pub fn target(&self) -> String {
        let mut target = String::new();
        if let Some(user) = &self.user {
            target.push_str(user);
            target.push('@');
        }
        target.push_str(self.host.as_deref().unwrap_or("localhost"));
        if let Some(port) = self.port {
            target.push_str(&format!(":{}", port));
        }
        if let Some(db) = &self.database {
            target.push('/');
            target.push_str(db);
        }
        target
    }
}

/// Quote a libpq keyword value when it is empty or contains spaces or quotes
fn quote_dsn_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Graphviz rendering defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub engine: LayoutEngine,
    pub layout: Layout,
}

/// Contents of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Schema to inspect
    pub schema: Option<String>,
    /// Audit table suffixes; `_aud` and `_audit` when absent
    pub audit_suffixes: Option<Vec<String>>,
    /// Glob patterns of additional tables to leave out
    pub exclude: Vec<String>,
    pub connection: ConnectionConfig,
    pub render: RenderConfig,
}

impl FileConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content)
    }

    /// Per-user config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("schema-cycles").join("config.yaml"))
    }

    /// Load `explicit` if given, else the per-user file if it exists
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading user config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub schema: Option<String>,
    /// Replaces the configured suffixes when non-empty
    pub audit_suffixes: Vec<String>,
    /// Added to the configured patterns
    pub exclude: Vec<String>,
    pub engine: Option<LayoutEngine>,
    pub layout: Option<Layout>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub schema: Option<String>,
    pub audit_suffixes: Vec<String>,
    pub exclude: Vec<String>,
    pub connection: ConnectionConfig,
    pub engine: LayoutEngine,
    pub layout: Layout,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(FileConfig::default(), Overrides::default())
    }
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let audit_suffixes = if !overrides.audit_suffixes.is_empty() {
            overrides.audit_suffixes
        } else {
            file.audit_suffixes.unwrap_or_else(|| {
                DEFAULT_AUDIT_SUFFIXES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
        };

        let mut exclude = file.exclude;
        exclude.extend(overrides.exclude);

        Self {
            schema: overrides.schema.or(file.schema),
            audit_suffixes,
            exclude,
            connection: file.connection,
            engine: overrides.engine.unwrap_or(file.render.engine),
            layout: overrides.layout.unwrap_or(file.render.layout),
        }
    }

    /// Configured schema, or the backend's default
    pub fn schema_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.schema.as_deref().unwrap_or(default)
    }

    pub fn audit_filter(&self) -> AuditFilter {
        AuditFilter::new(self.audit_suffixes.iter().cloned()).with_patterns(&self.exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
schema: sales
audit_suffixes: [_hist]
exclude: ["tmp_*", "scratch"]
connection:
  host: db.internal
  port: 6543
  database: app
  user: reader
render:
  engine: dot
  layout: tb
"#;
        let config = FileConfig::parse(yaml).unwrap();

        assert_eq!(config.schema.as_deref(), Some("sales"));
        assert_eq!(config.audit_suffixes, Some(vec!["_hist".to_string()]));
        assert_eq!(config.exclude.len(), 2);
        assert_eq!(config.connection.port, Some(6543));
        assert_eq!(config.render.engine, LayoutEngine::Dot);
        assert_eq!(config.render.layout, Layout::TB);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::parse("").unwrap();
        let settings = Settings::resolve(config, Overrides::default());

        assert_eq!(settings.schema, None);
        assert_eq!(settings.audit_suffixes, vec!["_aud", "_audit"]);
        assert_eq!(settings.engine, LayoutEngine::Sfdp);
        assert_eq!(settings.layout, Layout::LR);
        assert_eq!(settings.schema_or("public"), "public");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(FileConfig::parse("shema: public\n").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let file = FileConfig::parse("schema: sales\nexclude: [\"tmp_*\"]\naudit_suffixes: [_hist]\n")
            .unwrap();
        let overrides = Overrides {
            schema: Some("billing".to_string()),
            audit_suffixes: vec!["_log".to_string()],
            exclude: vec!["legacy_*".to_string()],
            engine: Some(LayoutEngine::Circo),
            layout: None,
        };
        let settings = Settings::resolve(file, overrides);

        assert_eq!(settings.schema_or("public"), "billing");
        assert_eq!(settings.audit_suffixes, vec!["_log"]);
        assert_eq!(settings.exclude, vec!["tmp_*", "legacy_*"]);
        assert_eq!(settings.engine, LayoutEngine::Circo);

        let filter = settings.audit_filter();
        assert!(filter.is_excluded("orders_log"));
        assert!(filter.is_excluded("legacy_users"));
        assert!(!filter.is_excluded("orders_hist"));
    }

    #[test]
    fn test_dsn() {
        let conn = ConnectionConfig {
            host: Some("localhost".to_string()),
            port: Some(5432),
            database: Some("app".to_string()),
            user: Some("reader".to_string()),
            password: None,
        };

        assert_eq!(
            conn.dsn_with_password(Some("it's secret")),
            r"host=localhost port=5432 dbname=app user=reader password='it\'s secret'"
        );
        assert_eq!(conn.target(), "reader@localhost:5432/app");
        assert!(!conn.target().contains("secret"));
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            FileConfig::discover(Some(&missing)),
            Err(Error::Io { .. })
        ));

        let broken = dir.path().join("broken.yaml");
        fs::write(&broken, "schema: [unclosed\n").unwrap();
        assert!(matches!(
            FileConfig::load(&broken),
            Err(Error::Config { .. })
        ));
    }
}
