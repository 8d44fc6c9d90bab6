use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL prepended to object keys when building stored locators.
    /// Defaults to path-style `{endpoint}/{bucket}`.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub estimator: EstimatorConfig,
    pub pending_ttl_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "macrolog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "macrolog-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let endpoint =
            std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".into());
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "macrolog".into());
        let storage = StorageConfig {
            public_base_url: std::env::var("S3_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket)),
            endpoint,
            bucket,
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".into()),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".into()),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };

        let estimator = EstimatorConfig {
            api_key: std::env::var("ESTIMATOR_API_KEY")?,
            base_url: std::env::var("ESTIMATOR_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("ESTIMATOR_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
            request_timeout_secs: env_parse("ESTIMATOR_TIMEOUT_SECS", 30),
            max_attempts: env_parse("ESTIMATOR_MAX_ATTEMPTS", 3),
            backoff_ms: env_parse("ESTIMATOR_BACKOFF_MS", 1_000),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            estimator,
            pending_ttl_secs: env_parse("PENDING_TTL_SECS", 300),
        })
    }
}
