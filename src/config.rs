use serde::Deserialize;

/// Which `PipelineStore` implementation the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>, // Required for the postgres backend only
    pub db_max_connections: u32,
    pub port: u16,
    pub cors_allowed_origin: Option<String>,
    pub sweep_enabled: bool,
    pub sweep_cron: String,
    pub sweep_repair: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

fn parse_bool(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false", name),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match get("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("STORE_BACKEND must be postgres or memory, got {}", other),
        };

        let database_url = get("DATABASE_URL")
            .or_else(|| get("DB_URL"))
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                }
                Ok(url)
            })
            .transpose()?;

        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL or DB_URL environment variable required");
        }

        let config = Self {
            store_backend,
            database_url,
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a positive number"))?,
            port: get("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN").filter(|s| !s.trim().is_empty()),
            sweep_enabled: get("SWEEP_ENABLED")
                .map(|v| parse_bool("SWEEP_ENABLED", &v))
                .transpose()?
                .unwrap_or(true),
            sweep_cron: get("SWEEP_CRON")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "0 0 6 * * *".to_string()),
            sweep_repair: get("SWEEP_REPAIR")
                .map(|v| parse_bool("SWEEP_REPAIR", &v))
                .transpose()?
                .unwrap_or(true),
            rate_limit_per_second: get("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a positive number"))?,
            rate_limit_burst: get("RATE_LIMIT_BURST")
                .unwrap_or_else(|| "20".to_string())
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Store backend: {:?}", config.store_backend);
        if let Some(ref url) = config.database_url {
            tracing::debug!("Database URL: {}...", &url[..20.min(url.len())]);
        }
        if let Some(ref origin) = config.cors_allowed_origin {
            tracing::info!("CORS restricted to origin: {}", origin);
        }
        tracing::debug!(
            "Sweep: enabled={} cron='{}' repair={}",
            config.sweep_enabled,
            config.sweep_cron,
            config.sweep_repair
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
