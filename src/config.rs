use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::query::DEFAULT_QUERY;
use crate::remote::{Credentials, VirtualHosts, DEFAULT_PER_PAGE, MAX_PER_PAGE, MIN_PER_PAGE};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "hostscope";

/// Search service reached when the config does not name one.
pub const DEFAULT_API_URL: &str = "https://search.censys.io";

/// Environment variables that override the `[api]` section.
pub const ENV_API_ID: &str = "HOSTSCOPE_API_ID";
pub const ENV_API_SECRET: &str = "HOSTSCOPE_API_SECRET";

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub api_url: String,
    api_id: Option<String>,
    api_secret: Option<String>,
    pub per_page: u32,
    pub virtual_hosts: Option<VirtualHosts>,
    pub sort: Option<String>,
    pub startup_query: String,
}

impl Config {
    /// The configured credential pair, or None when either half is
    /// missing or blank. Absent credentials are a valid state to report,
    /// not an error to raise here.
    pub fn credentials(&self) -> Option<Credentials> {
        let id = non_blank(self.api_id.as_deref())?;
        let secret = non_blank(self.api_secret.as_deref())?;
        Some(Credentials {
            id: id.to_string(),
            secret: secret.to_string(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// Whether an API ID is present at all (for the status report).
    pub fn has_api_id(&self) -> bool {
        non_blank(self.api_id.as_deref()).is_some()
    }

    /// Whether an API secret is present at all (for the status report).
    pub fn has_api_secret(&self) -> bool {
        non_blank(self.api_secret.as_deref()).is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// Raw config file shape
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    search: SearchSection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    id: Option<String>,
    secret: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchSection {
    per_page: Option<u32>,
    virtual_hosts: Option<String>,
    sort: Option<String>,
    query: Option<String>,
}

fn config_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("could not determine home directory")?;
    Ok(base.config_dir().join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration from `override_path` or the default location.
///
/// A missing file is not an error: every setting has a default and the
/// credentials may arrive via environment variables instead.
pub fn load(override_path: Option<&Path>) -> Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    let cfg_file = if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

        warn_unknown_keys(&value);

        value
            .try_into()
            .with_context(|| format!("failed to deserialize config from {}", path.display()))?
    } else {
        ConfigFile::default()
    };

    // Environment wins over the file for credentials.
    let api_id = env_non_blank(ENV_API_ID).or(cfg_file.api.id);
    let api_secret = env_non_blank(ENV_API_SECRET).or(cfg_file.api.secret);

    let api_url = non_blank(cfg_file.api.url.as_deref())
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let per_page = match cfg_file.search.per_page {
        Some(value) if (MIN_PER_PAGE..=MAX_PER_PAGE).contains(&value) => value,
        Some(value) => {
            let clamped = value.clamp(MIN_PER_PAGE, MAX_PER_PAGE);
            eprintln!(
                "warning: search.per_page = {} is out of range {}-{}; using {}",
                value, MIN_PER_PAGE, MAX_PER_PAGE, clamped
            );
            clamped
        }
        None => DEFAULT_PER_PAGE,
    };

    let virtual_hosts = match cfg_file.search.virtual_hosts.as_deref() {
        Some(value) => {
            let parsed = VirtualHosts::from_str(value);
            if parsed.is_none() {
                eprintln!(
                    "warning: unknown search.virtual_hosts value `{}` (expected exclude, include, or only)",
                    value
                );
            }
            parsed
        }
        None => None,
    };

    let startup_query = non_blank(cfg_file.search.query.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    Ok(Config {
        config_path: path,
        api_url,
        api_id,
        api_secret,
        per_page,
        virtual_hosts,
        sort: non_blank(cfg_file.search.sort.as_deref()).map(str::to_string),
        startup_query,
    })
}

fn env_non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["api", "search"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            eprintln!("warning: unknown configuration key `{}`", key);
        }
    }

    if let Some(api_val) = table.get("api") {
        warn_unknown_in_section(api_val, "api", &["id", "secret", "url"]);
    }
    if let Some(search_val) = table.get("search") {
        warn_unknown_in_section(
            search_val,
            "search",
            &["per_page", "virtual_hosts", "sort", "query"],
        );
    }
}

fn warn_unknown_in_section(value: &toml::Value, section: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            eprintln!("warning: unknown configuration key `{}.{}`", section, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.startup_query, DEFAULT_QUERY);
        assert_eq!(config.virtual_hosts, None);
    }

    #[test]
    fn reads_api_and_search_sections() {
        let (_dir, path) = write_config(
            r#"
[api]
id = "client-id"
secret = "client-secret"
url = "https://search.example.net/"

[search]
per_page = 25
virtual_hosts = "include"
sort = "+ip"
query = "services.port: 443"
"#,
        );
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.api_url, "https://search.example.net");
        assert_eq!(config.per_page, 25);
        assert_eq!(config.virtual_hosts, Some(VirtualHosts::Include));
        assert_eq!(config.sort.as_deref(), Some("+ip"));
        assert_eq!(config.startup_query, "services.port: 443");
        let creds = config.credentials().unwrap();
        assert_eq!(creds.id, "client-id");
        assert_eq!(creds.secret, "client-secret");
    }

    #[test]
    fn blank_credentials_are_not_configured() {
        let (_dir, path) = write_config(
            r#"
[api]
id = "client-id"
secret = "   "
"#,
        );
        let config = load(Some(&path)).unwrap();
        assert!(config.has_api_id());
        assert!(!config.has_api_secret());
        assert!(config.credentials().is_none());
    }

    #[test]
    fn out_of_range_per_page_is_clamped() {
        let (_dir, path) = write_config("[search]\nper_page = 500\n");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.per_page, MAX_PER_PAGE);

        let (_dir, path) = write_config("[search]\nper_page = 0\n");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.per_page, MIN_PER_PAGE);
    }

    #[test]
    fn unknown_virtual_hosts_value_is_ignored() {
        let (_dir, path) = write_config("[search]\nvirtual_hosts = \"sometimes\"\n");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.virtual_hosts, None);
    }
}
