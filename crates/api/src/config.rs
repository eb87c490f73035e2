use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings for user bearer tokens.
    pub jwt: JwtConfig,
    /// Job pipeline settings.
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        }
    }
}

/// Default stalled-job threshold.
const DEFAULT_JOB_EXPIRY_SECS: u64 = 3600;
/// Longest accepted stalled-job threshold: 30 days.
pub const MAX_JOB_EXPIRY_SECS: u64 = 30 * 24 * 3600;
/// Default expiry sweep period.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Default bounded retries on a version conflict.
const DEFAULT_STORE_CONFLICT_RETRIES: u32 = 3;
/// Default multipart body cap: 50 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Job pipeline settings: worker authentication, upload limits, expiry.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Shared secret workers send in `X-API-Key`.
    pub worker_api_key: String,
    /// Cap on multipart upload bodies.
    pub max_upload_bytes: usize,
    /// Jobs waiting on a worker and untouched for this long are expired.
    pub job_expiry_secs: u64,
    /// How often the expiry sweep runs.
    pub job_sweep_interval_secs: u64,
    /// Extra attempts after a version conflict before giving up.
    pub store_conflict_retries: u32,
}

impl PipelineConfig {
    /// Load pipeline configuration from environment variables.
    ///
    /// | Env Var                   | Required | Default    |
    /// |---------------------------|----------|------------|
    /// | `WORKER_API_KEY`          | **yes**  | --         |
    /// | `MAX_UPLOAD_BYTES`        | no       | `52428800` |
    /// | `JOB_EXPIRY_SECS`         | no       | `3600`     |
    /// | `JOB_SWEEP_INTERVAL_SECS` | no       | `60`       |
    /// | `STORE_CONFLICT_RETRIES`  | no       | `3`        |
    ///
    /// # Panics
    ///
    /// Panics if `WORKER_API_KEY` is not set or is empty, or if
    /// `JOB_EXPIRY_SECS` is not in `1..=MAX_JOB_EXPIRY_SECS`.
    pub fn from_env() -> Self {
        let worker_api_key =
            std::env::var("WORKER_API_KEY").expect("WORKER_API_KEY must be set in the environment");
        assert!(!worker_api_key.is_empty(), "WORKER_API_KEY must not be empty");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let job_expiry_secs: u64 = std::env::var("JOB_EXPIRY_SECS")
            .unwrap_or_else(|_| DEFAULT_JOB_EXPIRY_SECS.to_string())
            .parse()
            .expect("JOB_EXPIRY_SECS must be a valid u64");
        assert!(
            valid_expiry(job_expiry_secs),
            "JOB_EXPIRY_SECS must be between 1 and {MAX_JOB_EXPIRY_SECS}"
        );

        let job_sweep_interval_secs: u64 = std::env::var("JOB_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("JOB_SWEEP_INTERVAL_SECS must be a valid u64");

        let store_conflict_retries: u32 = std::env::var("STORE_CONFLICT_RETRIES")
            .unwrap_or_else(|_| DEFAULT_STORE_CONFLICT_RETRIES.to_string())
            .parse()
            .expect("STORE_CONFLICT_RETRIES must be a valid u32");

        Self {
            worker_api_key,
            max_upload_bytes,
            job_expiry_secs,
            job_sweep_interval_secs,
            store_conflict_retries,
        }
    }
}

fn valid_expiry(secs: u64) -> bool {
    (1..=MAX_JOB_EXPIRY_SECS).contains(&secs)
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test ,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn expiry_threshold_is_bounded() {
        assert!(valid_expiry(DEFAULT_JOB_EXPIRY_SECS));
        assert!(valid_expiry(MAX_JOB_EXPIRY_SECS));
        assert!(!valid_expiry(0));
        assert!(!valid_expiry(MAX_JOB_EXPIRY_SECS + 1));
        assert!(!valid_expiry(u64::MAX));
    }
}
