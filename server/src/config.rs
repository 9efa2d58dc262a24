use anyhow::ensure;
use anyhow::Context;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    #[serde(rename = "bind-address")]
    pub bind_address: SocketAddr,

    /// A built front-end to serve for every non-api route.
    #[serde(rename = "public-directory")]
    pub public_directory: Option<PathBuf>,

    #[serde(default)]
    pub jikan: ConfigJikan,

    #[serde(default)]
    pub providers: ConfigProviders,

    #[serde(default)]
    pub cache: ConfigCache,

    #[serde(default)]
    pub logging: ConfigLogging,
}

impl Config {
    /// Load and validate a config.
    pub fn load_path<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to load config file at \"{}\"", path.display()))?;
        let config = Self::parse(&data)
            .with_context(|| format!("failed to parse config file at \"{}\"", path.display()))?;

        Ok(config)
    }

    /// Parse and validate a config.
    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(data)?;

        if let Some(public_directory) = config.public_directory.as_ref() {
            let public_directory_exists = public_directory.try_exists().with_context(|| {
                format!(
                    "failed to check if the public directory path \"{}\" exists",
                    public_directory.display()
                )
            })?;
            ensure!(
                public_directory_exists,
                "the public directory path \"{}\" does not exist",
                public_directory.display()
            );
        }

        Ok(config)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ConfigJikan {
    #[serde(rename = "base-url", default = "default_jikan_base_url")]
    pub base_url: Url,

    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl ConfigJikan {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for ConfigJikan {
    fn default() -> Self {
        Self {
            base_url: default_jikan_base_url(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

fn default_jikan_base_url() -> Url {
    Url::parse("https://api.jikan.moe/v4").expect("invalid default jikan url")
}

fn default_request_delay_ms() -> u64 {
    jikan::DEFAULT_REQUEST_DELAY.as_millis() as u64
}

#[derive(Debug, serde::Deserialize)]
pub struct ConfigProviders {
    #[serde(rename = "primary-url", default = "default_primary_url")]
    pub primary_url: Url,

    #[serde(rename = "backup-url", default = "default_backup_url")]
    pub backup_url: Url,

    #[serde(rename = "backup-mirror-urls", default)]
    pub backup_mirror_urls: Vec<Url>,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConfigProviders {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            backup_url: default_backup_url(),
            backup_mirror_urls: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_primary_url() -> Url {
    Url::parse("http://127.0.0.1:3001/").expect("invalid default primary url")
}

fn default_backup_url() -> Url {
    Url::parse("http://127.0.0.1:3002/").expect("invalid default backup url")
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, serde::Deserialize)]
pub struct ConfigCache {
    /// How long catalog pages are reused for. 0 only merges identical in-flight requests.
    #[serde(rename = "catalog-seconds", default = "default_catalog_seconds")]
    pub catalog_seconds: u64,

    /// How long derived provider ids are remembered for. 0 turns it off.
    #[serde(rename = "mapping-seconds", default)]
    pub mapping_seconds: u64,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self {
            catalog_seconds: default_catalog_seconds(),
            mapping_seconds: 0,
        }
    }
}

fn default_catalog_seconds() -> u64 {
    5 * 60
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ConfigLogging {
    #[serde(rename = "include-headers", default)]
    pub include_headers: bool,

    #[serde(default)]
    pub directives: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(r#"bind-address = "127.0.0.1:8080""#).expect("failed to parse");

        assert_eq!(config.bind_address.port(), 8080);
        assert!(config.public_directory.is_none());
        assert_eq!(config.jikan.request_delay(), jikan::DEFAULT_REQUEST_DELAY);
        assert_eq!(config.jikan.base_url.as_str(), "https://api.jikan.moe/v4");
        assert!(config.providers.backup_mirror_urls.is_empty());
        assert_eq!(config.cache.mapping_seconds, 0);
        assert_eq!(config.cache.catalog_seconds, 300);
        assert!(config.logging.directives.is_empty());
    }

    #[test]
    fn full_config() {
        let config = Config::parse(
            r#"
            bind-address = "0.0.0.0:3000"

            [jikan]
            base-url = "http://localhost:9000/v4"
            request-delay-ms = 350

            [providers]
            primary-url = "http://localhost:9001/"
            backup-url = "http://localhost:9002/"
            backup-mirror-urls = ["http://localhost:9003/"]
            timeout-secs = 3

            [cache]
            catalog-seconds = 0
            mapping-seconds = 600

            [logging]
            include-headers = true
            directives = ["stream_resolver=debug"]
            "#,
        )
        .expect("failed to parse");

        assert_eq!(config.jikan.request_delay(), Duration::from_millis(350));
        assert_eq!(config.providers.backup_mirror_urls.len(), 1);
        assert_eq!(config.providers.timeout_secs, 3);
        assert_eq!(config.cache.mapping_seconds, 600);
        assert!(config.logging.include_headers);
        assert_eq!(config.logging.directives, ["stream_resolver=debug"]);
    }

    #[test]
    fn missing_public_directory_is_rejected() {
        let error = Config::parse(
            r#"
            bind-address = "127.0.0.1:8080"
            public-directory = "/this/path/does/not/exist"
            "#,
        )
        .expect_err("config should be rejected");

        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn missing_bind_address_is_rejected() {
        assert!(Config::parse("").is_err());
    }
}
