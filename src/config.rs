use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Fallback session-signing secret. Publicly known: anyone can forge
/// cookies for deployments that keep it.
pub const DEFAULT_SECRET_KEY: &str = "default_secret_key";

#[derive(Parser, Debug)]
#[command(name = "bookswap", about = "A community board for listing used books")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded pictures are written to and served from
    pub path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    /// Lifetime of a login without "remember me"
    pub session_hours: u64,
    /// Lifetime of a remembered login
    pub remember_hours: u64,
    pub secret_key: Option<String>,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_upload_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "bookswap_session".to_string(),
            session_hours: 24,
            remember_hours: 24 * 365,
            secret_key: None,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_secret(cli, std::env::var("SECRET_KEY").ok())
    }

    /// `env_secret` wins over the file; with neither, the default secret is used.
    pub fn load_with_secret(cli: &Cli, env_secret: Option<String>) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if let Some(secret) = env_secret.filter(|s| !s.is_empty()) {
            config.auth.secret_key = Some(secret);
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("bookswap.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("static"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".bookswap")
        })
    }

    /// Config rooted in `data_dir` with no file or CLI input. Handy for tests and tools.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let mut config = Config::default();
        config.database.path = Some(data_dir.join("bookswap.db"));
        config.storage.path = Some(data_dir.join("static"));
        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("bookswap.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("static"))
    }

    pub fn secret_key(&self) -> &str {
        self.auth.secret_key.as_deref().unwrap_or(DEFAULT_SECRET_KEY)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key() == DEFAULT_SECRET_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(tmp: &tempfile::TempDir) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.cookie_name, "bookswap_session");
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.auth.remember_hours, 8760);
        assert!(config.database.path.is_none());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(PathBuf::from("/tmp/test-bookswap")),
        };
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-bookswap"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_bookswap() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".bookswap"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_secret(&cli_for(&tmp), None).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), tmp.path().join("bookswap.db"));
        assert_eq!(config.uploads_path(), tmp.path().join("static"));
    }

    #[test]
    fn missing_secret_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_secret(&cli_for(&tmp), None).unwrap();
        assert_eq!(config.secret_key(), DEFAULT_SECRET_KEY);
        assert!(config.uses_default_secret());
    }

    #[test]
    fn env_secret_beats_file_secret() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[auth]\nsecret_key = \"from-file\"\n",
        )
        .unwrap();

        let from_file = Config::load_with_secret(&cli_for(&tmp), None).unwrap();
        assert_eq!(from_file.secret_key(), "from-file");

        let from_env =
            Config::load_with_secret(&cli_for(&tmp), Some("from-env".to_string())).unwrap();
        assert_eq!(from_env.secret_key(), "from-env");
        assert!(!from_env.uses_default_secret());
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[storage]
max_upload_bytes = 1024

[auth]
cookie_name = "my_cookie"
session_hours = 2
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load_with_secret(&cli, None).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.max_upload_bytes, 1024);
        assert_eq!(config.auth.cookie_name, "my_cookie");
        assert_eq!(config.auth.session_hours, 2);
        assert_eq!(config.auth.remember_hours, 8760);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load_with_secret(&cli, None).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }
}
