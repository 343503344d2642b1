//! Application settings, layered with the `config` crate:
//!
//! 1. built-in defaults,
//! 2. an optional `linkpage.toml` in the working directory,
//! 3. `LINKPAGE_`-prefixed environment variables, `__` between sections
//!    (`LINKPAGE_AUTH__MIN_PASSWORD_LEN=8`). A `.env` file is read first.
//!
//! ```toml
//! [auth]
//! redirect_target = "https://example.com/auth/callback"
//! min_password_len = 6
//!
//! [import]
//! shopify_api_url = ""        # empty disables the platform
//! shopify_store_url = ""
//! woocommerce_api_url = ""
//!
//! [storage]
//! data_dir = "/var/lib/linkpage"   # optional
//! ```

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;
use store::FileStore;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// Where the sign-up confirmation link sends the user.
    pub redirect_target: String,
    pub min_password_len: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            redirect_target: "http://localhost:8080/auth/callback".into(),
            min_password_len: 6,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImportSettings {
    pub shopify_api_url: String,
    /// Base of the public product pages, `{store}/products/{handle}`.
    pub shopify_store_url: String,
    pub woocommerce_api_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub auth: AuthSettings,
    pub import: ImportSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load from `linkpage.toml` and the process environment.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(
            File::with_name("linkpage")
                .format(FileFormat::Toml)
                .required(false),
            None,
        )
    }

    /// Load from a TOML string and an explicit environment map.
    pub fn from_sources(toml: &str, env: Map<String, String>) -> Result<Self, ConfigError> {
        Self::build(File::from_str(toml, FileFormat::Toml), Some(env))
    }

    fn build<F>(file: F, env: Option<Map<String, String>>) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let defaults = AuthSettings::default();
        let config = Config::builder()
            .set_default("auth.redirect_target", defaults.redirect_target)?
            .set_default("auth.min_password_len", defaults.min_password_len as i64)?
            .set_default("import.shopify_api_url", "")?
            .set_default("import.shopify_store_url", "")?
            .set_default("import.woocommerce_api_url", "")?
            .add_source(file)
            .add_source(
                Environment::with_prefix("LINKPAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Directory holding per-user page files.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("linkpage")
        })
    }
}

/// A file-backed page store rooted at the configured data directory.
pub fn open_store(settings: &Settings) -> FileStore {
    FileStore::new(settings.data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_sources("", Map::new()).unwrap();
        assert_eq!(settings.auth, AuthSettings::default());
        assert_eq!(settings.import, ImportSettings::default());
        assert!(settings.data_dir().ends_with("linkpage"));
    }

    #[test]
    fn test_sections_are_optional() {
        let toml = r#"
            [import]
            shopify_api_url = "https://shop.example/admin"
        "#;
        let settings = Settings::from_sources(toml, Map::new()).unwrap();
        assert_eq!(settings.storage, StorageSettings::default());
        assert_eq!(settings.auth, AuthSettings::default());
        assert_eq!(settings.import.woocommerce_api_url, "");
    }

    #[test]
    fn test_file_then_env() {
        let toml = r#"
            [auth]
            redirect_target = "https://page.example/cb"
            min_password_len = 10

            [storage]
            data_dir = "/tmp/pages"
        "#;
        let mut env = Map::new();
        env.insert("LINKPAGE_AUTH__MIN_PASSWORD_LEN".to_string(), "8".to_string());
        env.insert(
            "LINKPAGE_IMPORT__SHOPIFY_API_URL".to_string(),
            "https://shop.example/admin".to_string(),
        );

        let settings = Settings::from_sources(toml, env).unwrap();
        assert_eq!(settings.auth.redirect_target, "https://page.example/cb");
        assert_eq!(settings.auth.min_password_len, 8);
        assert_eq!(settings.import.shopify_api_url, "https://shop.example/admin");
        assert_eq!(open_store(&settings).base(), PathBuf::from("/tmp/pages"));
    }
}
