use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "prod")]
    Prod,
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Test => write!(f, "test"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

/// Origins allowed by the cross-origin policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `*`, any origin. Not usable together with credentials.
    Any,
    /// An explicit allow-list, each entry a valid header value.
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let trimmed = raw.trim();
        if trimmed == "*" {
            return Ok(Self::Any);
        }

        let origins: Vec<String> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        if origins.is_empty() {
            anyhow::bail!("CORS_ALLOWED_ORIGINS must be `*` or a comma separated list of origins");
        }

        for origin in &origins {
            if origin == "*" {
                anyhow::bail!("CORS_ALLOWED_ORIGINS cannot mix `*` with explicit origins");
            }
            if http::HeaderValue::from_str(origin).is_err() {
                anyhow::bail!("CORS_ALLOWED_ORIGINS contains an invalid origin: {origin}");
            }
        }

        Ok(Self::List(origins))
    }
}

// The final, validated configuration.
// Both MongoDB settings are guaranteed non-blank.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    mongo_url: String,
    mongo_db: String,
    server_addr: String,
    port: u16,
    cors_allowed_origins: CorsOrigins,
    cors_allow_credentials: bool,
}

// Intermediate struct deserialized straight from the environment.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    mongo_url: String,
    mongo_db: String,
    server_addr: Option<String>,
    port: Option<u16>,
    cors_allowed_origins: Option<String>,
    cors_allow_credentials: Option<bool>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Available to unit and integration tests; never used by the binary.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            mongo_url: "mongodb://localhost:27017".to_owned(),
            mongo_db: "usuarios_test".to_owned(),
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            cors_allowed_origins: CorsOrigins::Any,
            cors_allow_credentials: false,
        }
    }

    /// Test configuration with an explicit origin allow-list and credentials enabled.
    pub fn new_for_test_with_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cors_allowed_origins: CorsOrigins::List(origins.into_iter().map(Into::into).collect()),
            cors_allow_credentials: true,
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn mongo_url(&self) -> &str {
        &self.mongo_url
    }

    pub fn mongo_db(&self) -> &str {
        &self.mongo_db
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn cors_allowed_origins(&self) -> &CorsOrigins {
        &self.cors_allowed_origins
    }

    pub fn cors_allow_credentials(&self) -> bool {
        self.cors_allow_credentials
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    /// Reads the configuration from environment variables and applies
    /// environment-aware defaults.
    ///
    /// Fails when `MONGO_URL` or `MONGO_DB` is missing or blank.
    pub fn init() -> anyhow::Result<Self> {
        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            mongo_url,
            mongo_db,
            server_addr,
            port,
            cors_allowed_origins,
            cors_allow_credentials,
        } = raw_config;

        if mongo_url.trim().is_empty() {
            anyhow::bail!("MONGO_URL must not be blank");
        }
        if mongo_db.trim().is_empty() {
            anyhow::bail!("MONGO_DB must not be blank");
        }

        let server_addr = server_addr.unwrap_or_else(|| {
            match env {
                Env::Local => "127.0.0.1",
                _ => "0.0.0.0",
            }
            .to_owned()
        });

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => 8080,
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        let cors_allowed_origins = match cors_allowed_origins {
            Some(raw) => CorsOrigins::parse(&raw)?,
            None if matches!(env, Env::Local | Env::Test) => CorsOrigins::Any,
            None => anyhow::bail!("CORS_ALLOWED_ORIGINS must be set for {} environment", env),
        };

        let cors_allow_credentials = cors_allow_credentials.unwrap_or(false);
        if cors_allow_credentials && cors_allowed_origins == CorsOrigins::Any {
            anyhow::bail!(
                "CORS_ALLOW_CREDENTIALS requires an explicit CORS_ALLOWED_ORIGINS list, \
                 browsers reject `*` for credentialed requests"
            );
        }

        Ok(Config {
            env,
            mongo_url,
            mongo_db,
            server_addr,
            port,
            cors_allowed_origins,
            cors_allow_credentials,
        })
    }
}
