use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub magic_link_secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub magic_link_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YookassaConfig {
    pub api_url: String,
    pub shop_id: String,
    pub secret_key: String,
    pub webhook_secret: String,
    /// Gateway id of the platform's own account, used as the platform recipient.
    pub platform_gateway_id: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    /// Public origin used to build magic-link, activation and return URLs.
    pub app_url: String,
    pub production: bool,
    pub jwt: JwtConfig,
    pub yookassa: YookassaConfig,
    pub smtp: Option<SmtpConfig>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match env_or("STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => bail!("unknown STORE_BACKEND '{}'", other),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required for the postgres store backend");
        }

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            magic_link_secret: std::env::var("MAGIC_LINK_SECRET")
                .context("MAGIC_LINK_SECRET is not set")?,
            issuer: env_or("JWT_ISSUER", "coursegate"),
            audience: env_or("JWT_AUDIENCE", "coursegate-users"),
            session_ttl_minutes: env_parse("SESSION_TTL_MINUTES", 60 * 24 * 7),
            magic_link_ttl_minutes: env_parse("MAGIC_LINK_EXPIRES_IN_MINUTES", 15),
        };

        let yookassa = YookassaConfig {
            api_url: env_or("YOOKASSA_API_URL", "https://api.yookassa.ru/v3"),
            shop_id: std::env::var("YOOKASSA_SHOP_ID").context("YOOKASSA_SHOP_ID is not set")?,
            secret_key: std::env::var("YOOKASSA_SECRET_KEY")
                .context("YOOKASSA_SECRET_KEY is not set")?,
            webhook_secret: std::env::var("YOOKASSA_WEBHOOK_SECRET")
                .context("YOOKASSA_WEBHOOK_SECRET is not set")?,
            platform_gateway_id: std::env::var("YOOKASSA_GATEWAY_ID_PLATFORM")
                .context("YOOKASSA_GATEWAY_ID_PLATFORM is not set")?,
            currency: env_or("PAYMENT_CURRENCY", "RUB"),
        };

        // All-or-nothing: a partial SMTP setup falls back to the console mailer.
        let smtp = match (
            std::env::var("SMTP_HOST"),
            std::env::var("SMTP_USERNAME"),
            std::env::var("SMTP_PASSWORD"),
            std::env::var("SMTP_FROM_EMAIL"),
        ) {
            (Ok(host), Ok(username), Ok(password), Ok(from_email)) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587),
                username,
                password,
                from_email,
            }),
            _ => None,
        };

        let config = Self {
            database_url,
            store_backend,
            app_url: env_or("APP_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            production: env_or("APP_ENV", "development") == "production",
            jwt,
            yookassa,
            smtp,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.is_empty() || self.jwt.magic_link_secret.is_empty() {
            bail!("JWT secrets must not be empty");
        }
        if self.jwt.secret == self.jwt.magic_link_secret {
            bail!("JWT_SECRET and MAGIC_LINK_SECRET must differ");
        }
        if self.jwt.session_ttl_minutes <= 0 || self.jwt.magic_link_ttl_minutes <= 0 {
            bail!("token lifetimes must be positive");
        }
        if self.yookassa.webhook_secret.is_empty() {
            bail!("YOOKASSA_WEBHOOK_SECRET must not be empty");
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            store_backend: StoreBackend::Memory,
            app_url: "http://app.test".into(),
            production: false,
            jwt: JwtConfig {
                secret: "test-session-secret".into(),
                magic_link_secret: "test-magic-link-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                session_ttl_minutes: 60 * 24 * 7,
                magic_link_ttl_minutes: 15,
            },
            yookassa: YookassaConfig {
                api_url: "http://gateway.test/v3".into(),
                shop_id: "shop-1".into(),
                secret_key: "shop-secret".into(),
                webhook_secret: "webhook-secret".into(),
                platform_gateway_id: "gw-platform".into(),
                currency: "RUB".into(),
            },
            smtp: None,
        }
    }
}
