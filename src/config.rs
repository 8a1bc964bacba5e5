use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub fonts: FontSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Upper bound on concurrent renders per request.
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default)]
    pub local_save: bool,
    #[serde(default = "default_dir_name")]
    pub dir_name: PathBuf,
    #[serde(default)]
    pub upload: bool,
    /// Object store host, with an optional port and no scheme.
    pub endpoint: String,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    /// Eg. `TICKET_STORAGE__SECRET_ACCESS_KEY`
    #[serde(default)]
    pub secret_access_key: String,
    /// Talk to the object store over HTTPS.
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FontSettings {
    pub regular: PathBuf,
    pub bold: PathBuf,
    /// Use the standard Helvetica faces instead of font files.
    #[serde(default)]
    pub builtin: bool,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_worker_limit() -> usize { 10 }
fn default_dir_name() -> PathBuf { PathBuf::from("tickets") }
fn default_region() -> String { "us-east-1".into() }
fn default_use_ssl() -> bool { true }

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TICKET_SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("TICKET").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_keys() {
        let raw = r#"
            [server]
            port = 8080

            [storage]
            endpoint = "minio.local:9000"
            bucket = "tickets"

            [fonts]
            regular = "a.ttf"
            bold = "b.ttf"
        "#;

        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.worker_limit, 10);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(!settings.storage.local_save);
        assert!(!settings.storage.upload);
        assert_eq!(settings.storage.dir_name, PathBuf::from("tickets"));
        assert_eq!(settings.storage.region, "us-east-1");
        assert!(settings.storage.use_ssl);
        assert!(settings.storage.access_key_id.is_empty());
        assert!(!settings.fonts.builtin);
    }
}
