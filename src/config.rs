use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Privileged connection string used only by user administration.
    pub admin_database_url: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    /// Run the three checkout writes inside one store transaction.
    pub checkout_atomic: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let admin_database_url =
            env::var("ADMIN_DATABASE_URL").unwrap_or_else(|_| database_url.clone());
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);
        let checkout_atomic = env::var("CHECKOUT_ATOMIC")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            admin_database_url,
            jwt_secret,
            session_ttl_hours,
            checkout_atomic,
            host,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flag_accepts_common_truthy_spellings() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
