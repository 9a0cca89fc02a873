use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub public_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Customer file storage API")]
pub struct Args {
    /// Host to bind to (overrides FILE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where file payloads are stored (overrides FILE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FILE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Prefix for download URLs in file listings, e.g. `https://files.example.com`
    /// (overrides FILE_STORE_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        Self::from_args(args)
    }

    fn from_args(args: Args) -> Result<(Self, bool)> {
        // --- Environment fallback ---
        let env_host = env::var("FILE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FILE_STORE_PORT") {
            Ok(value) => parse_port(&value)?,
            Err(env::VarError::NotPresent) => 8080,
            Err(err) => return Err(err).context("reading FILE_STORE_PORT"),
        };
        let env_storage =
            env::var("FILE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/files".into());
        let env_db = env::var("FILE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/file_store.db".into());
        let env_public_url = env::var("FILE_STORE_PUBLIC_URL").unwrap_or_default();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_url: args.public_url.unwrap_or(env_public_url),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .with_context(|| format!("parsing FILE_STORE_PORT value `{}`", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_take_precedence() {
        let args = Args::parse_from([
            "customer-file-store",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--storage-dir",
            "/srv/files",
            "--database-url",
            "sqlite:///srv/meta.db",
            "--public-url",
            "https://files.example.com",
            "--migrate",
        ]);

        let (cfg, migrate) = AppConfig::from_args(args).unwrap();
        assert!(migrate);
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.storage_dir, "/srv/files");
        assert_eq!(cfg.database_url, "sqlite:///srv/meta.db");
        assert_eq!(cfg.public_url, "https://files.example.com");
    }

    #[test]
    fn bad_port_values_are_reported() {
        let err = parse_port("eighty").unwrap_err();
        assert!(format!("{:#}", err).contains("FILE_STORE_PORT value `eighty`"));
        assert_eq!(parse_port("8080").unwrap(), 8080);
    }
}
