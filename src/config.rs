use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub impersonation_ttl_minutes: i64,
    pub stripe_webhook_secret: Option<String>,
    /// Platform commission in basis points of the order total.
    pub commission_rate_bps: i64,
    pub tax_rate_bps: i64,
    pub client_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
            impersonation_ttl_minutes: parse_or("IMPERSONATION_TTL_MINUTES", 60),
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            commission_rate_bps: parse_or("COMMISSION_RATE_BPS", 200),
            tax_rate_bps: parse_or("TAX_RATE_BPS", 850),
            client_url: non_empty("CLIENT_URL"),
        })
    }

    /// Config with defaults for everything except the connection string and secret.
    pub fn with_defaults(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: 24,
            impersonation_ttl_minutes: 60,
            stripe_webhook_secret: None,
            commission_rate_bps: 200,
            tax_rate_bps: 850,
            client_url: None,
        }
    }
}

fn parse_or(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
