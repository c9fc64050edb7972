//! Kiosk configuration: an optional TOML file overridden by flags and
//! environment variables.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use techmarket_catalog::{Backend, Catalog, DEFAULT_TABLE, LocalBackend, PostgrestBackend};

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "techmarket.toml";

/// Passcode for the admin screen when none is configured.
///
/// Compared in plaintext on this machine. It only keeps casual customers
/// out of the inventory screen; the backend's own API key and row policies
/// are the real access control.
pub const DEFAULT_PASSCODE: &str = "1234";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend and kiosk settings accepted on the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct BackendArgs {
    /// Path to a TOML config file [default: ./techmarket.toml if present]
    #[arg(long, global = true, env = "TECHMARKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend project URL, e.g. https://xyz.supabase.co
    #[arg(long, global = true, env = "TECHMARKET_URL")]
    pub url: Option<String>,

    /// Anonymous API key for the backend
    #[arg(long, global = true, env = "TECHMARKET_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Table holding the catalog
    #[arg(long, global = true, env = "TECHMARKET_TABLE")]
    pub table: Option<String>,

    /// Use a local JSON catalog file instead of the hosted backend
    #[arg(long, global = true, env = "TECHMARKET_CATALOG_FILE")]
    pub catalog_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Admin screen passcode
    #[arg(long, global = true, env = "TECHMARKET_PASSCODE", hide_env_values = true)]
    pub passcode: Option<String>,
}

/// Contents of `techmarket.toml`. Every key is optional.
#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    url: Option<String>,
    anon_key: Option<String>,
    table: Option<String>,
    catalog_file: Option<PathBuf>,
    timeout_secs: Option<u64>,
    passcode: Option<String>,
}

/// Where catalog rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    Remote {
        url: String,
        anon_key: String,
        timeout: Duration,
    },
    Local(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KioskConfig {
    pub source: CatalogSource,
    pub table: String,
    pub passcode: String,
}

impl KioskConfig {
    /// Merge the config file (if any) with command-line and environment
    /// overrides. A local catalog file wins over remote settings.
    pub fn resolve(args: &BackendArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => load_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    load_file(default)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::merge(args.clone(), file)
    }

    fn merge(args: BackendArgs, file: FileConfig) -> Result<Self> {
        let table = args
            .table
            .or(file.table)
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let passcode = args
            .passcode
            .or(file.passcode)
            .unwrap_or_else(|| DEFAULT_PASSCODE.to_string());

        let source = match args.catalog_file.or(file.catalog_file) {
            Some(path) => CatalogSource::Local(path),
            None => {
                let Some(url) = args.url.or(file.url) else {
                    bail!(
                        "No catalog configured. Set TECHMARKET_URL and TECHMARKET_ANON_KEY, \
                         pass --url/--anon-key, or use --catalog-file for a local catalog"
                    );
                };
                let Some(anon_key) = args.anon_key.or(file.anon_key) else {
                    bail!("Backend URL is set but the anon key is missing (TECHMARKET_ANON_KEY or --anon-key)");
                };
                let secs = args
                    .timeout_secs
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS);
                CatalogSource::Remote {
                    url,
                    anon_key,
                    timeout: Duration::from_secs(secs),
                }
            }
        };

        Ok(Self {
            source,
            table,
            passcode,
        })
    }

    /// Build the catalog facade for the configured source.
    pub fn open_catalog(&self) -> Result<Catalog<Box<dyn Backend>>> {
        let backend: Box<dyn Backend> = match &self.source {
            CatalogSource::Remote {
                url,
                anon_key,
                timeout,
            } => {
                tracing::info!(%url, table = %self.table, "using hosted catalog");
                Box::new(
                    PostgrestBackend::new(url, anon_key, *timeout)
                        .context("Failed to set up the backend client")?,
                )
            }
            CatalogSource::Local(path) => {
                tracing::info!(path = %path.display(), table = %self.table, "using local catalog");
                Box::new(
                    LocalBackend::open(path)
                        .with_context(|| format!("Failed to open catalog file {}", path.display()))?,
                )
            }
        };
        Ok(Catalog::with_table(backend, &self.table))
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn file_only_remote_config() {
        let file = parse(indoc! {r#"
            url = "https://demo.supabase.co"
            anon_key = "key"
            timeout_secs = 5
        "#});
        let config = KioskConfig::merge(BackendArgs::default(), file).unwrap();
        assert_eq!(
            config,
            KioskConfig {
                source: CatalogSource::Remote {
                    url: "https://demo.supabase.co".to_string(),
                    anon_key: "key".to_string(),
                    timeout: Duration::from_secs(5),
                },
                table: "products".to_string(),
                passcode: "1234".to_string(),
            }
        );
    }

    #[test]
    fn flags_override_file() {
        let file = parse(indoc! {r#"
            url = "https://file.supabase.co"
            anon_key = "file-key"
            table = "file_table"
            passcode = "0000"
        "#});
        let args = BackendArgs {
            url: Some("https://flag.supabase.co".to_string()),
            table: Some("flag_table".to_string()),
            ..Default::default()
        };
        let config = KioskConfig::merge(args, file).unwrap();
        assert_eq!(config.table, "flag_table");
        assert_eq!(config.passcode, "0000");
        assert!(matches!(
            config.source,
            CatalogSource::Remote { ref url, ref anon_key, .. }
                if url == "https://flag.supabase.co" && anon_key == "file-key"
        ));
    }

    #[test]
    fn catalog_file_wins_over_remote() {
        let file = parse(r#"url = "https://demo.supabase.co""#);
        let args = BackendArgs {
            catalog_file: Some(PathBuf::from("catalog.json")),
            ..Default::default()
        };
        let config = KioskConfig::merge(args, file).unwrap();
        assert_eq!(config.source, CatalogSource::Local(PathBuf::from("catalog.json")));
    }

    #[test]
    fn missing_backend_is_an_error() {
        let err = KioskConfig::merge(BackendArgs::default(), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No catalog configured"));
    }

    #[test]
    fn missing_anon_key_is_an_error() {
        let file = parse(r#"url = "https://demo.supabase.co""#);
        let err = KioskConfig::merge(BackendArgs::default(), file).unwrap_err();
        assert!(err.to_string().contains("anon key is missing"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = \"red\"").is_err());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let args = BackendArgs {
            config: Some(PathBuf::from("/nonexistent/techmarket.toml")),
            ..Default::default()
        };
        assert!(KioskConfig::resolve(&args).is_err());
    }

    #[test]
    fn resolve_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        std::fs::write(&path, "catalog_file = \"rows.json\"\npasscode = \"9999\"\n").unwrap();
        let args = BackendArgs {
            config: Some(path),
            ..Default::default()
        };
        let config = KioskConfig::resolve(&args).unwrap();
        assert_eq!(config.source, CatalogSource::Local(PathBuf::from("rows.json")));
        assert_eq!(config.passcode, "9999");
    }
}
