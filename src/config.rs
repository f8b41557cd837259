use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    /// Host (and port) used when building links sent to users.
    pub domain: String,
    pub jwt: JwtConfig,
    pub verify_token_max_age_secs: u64,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let domain = std::env::var("DOMAIN").unwrap_or_else(|_| "localhost:8000".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            access_ttl_secs: std::env::var("ACCESS_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(3600),
            refresh_ttl_days: std::env::var("REFRESH_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(2),
        };
        let verify_token_max_age_secs = std::env::var("VERIFY_TOKEN_MAX_AGE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60 * 60 * 24);
        let mail = MailConfig {
            smtp_host: std::env::var("MAIL_SERVER").unwrap_or_default(),
            smtp_port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("MAIL_USERNAME").ok(),
            password: std::env::var("MAIL_PASSWORD").ok(),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@bookery.dev".into()),
            from_name: std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Bookery".into()),
        };
        Ok(Self {
            database_url,
            redis_url,
            domain,
            jwt,
            verify_token_max_age_secs,
            mail,
        })
    }
}
