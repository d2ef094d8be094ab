//! Application configuration, read from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use std::time::Duration;

/// Placeholder secret that must never reach production.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Connection details for a hosted (GoTrue-compatible) identity service.
#[derive(Debug, Clone)]
pub struct HostedIdentityConfig {
    pub url: String,
    pub anon_key: String,
}

/// Timings of the simulated widgets.
#[derive(Debug, Clone, Copy)]
pub struct WidgetTimings {
    pub booking_delay: Duration,
    pub chat_delay_min: Duration,
    pub chat_delay_jitter: Duration,
}

impl Default for WidgetTimings {
    fn default() -> Self {
        Self {
            booking_delay: Duration::from_millis(2000),
            chat_delay_min: Duration::from_millis(1500),
            chat_delay_jitter: Duration::from_millis(1000),
        }
    }
}

impl WidgetTimings {
    /// No artificial latency at all.
    pub fn instant() -> Self {
        Self {
            booking_delay: Duration::ZERO,
            chat_delay_min: Duration::ZERO,
            chat_delay_jitter: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Public origin of the site, used to build OAuth/e-mail redirect targets.
    pub site_url: String,
    pub site_title: String,
    pub site_description: String,
    pub allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
    pub admin_password: Option<String>,
    pub hosted_identity: Option<HostedIdentityConfig>,
    pub static_dir: Option<String>,
    pub widgets: WidgetTimings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3001,
            site_url: "http://localhost:3000".to_string(),
            site_title: "GSGROUPS Blog".to_string(),
            site_description: "Digital marketing, web design and AI insights".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_email: None,
            admin_password_hash: None,
            admin_password: None,
            hosted_identity: None,
            static_dir: None,
            widgets: WidgetTimings::default(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_millis(key: &str, fallback: Duration) -> Duration {
    env_opt(key)
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(fallback)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| env_opt("FRONTEND_ORIGIN").map(|o| vec![o]))
            .unwrap_or(defaults.allowed_origins);

        let hosted_identity = match (env_opt("IDENTITY_URL"), env_opt("IDENTITY_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(HostedIdentityConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        let widget_defaults = WidgetTimings::default();

        Self {
            environment: Environment::parse(&env_opt("ENVIRONMENT").unwrap_or_default()),
            host: env_opt("HOST").unwrap_or(defaults.host),
            port: env_opt("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            site_url: env_opt("SITE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            site_title: env_opt("SITE_TITLE").unwrap_or(defaults.site_title),
            site_description: env_opt("SITE_DESCRIPTION").unwrap_or(defaults.site_description),
            allowed_origins,
            jwt_secret: env_opt("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            admin_email: env_opt("ADMIN_EMAIL"),
            admin_password_hash: env_opt("ADMIN_PASSWORD_HASH"),
            admin_password: env_opt("ADMIN_PASSWORD"),
            hosted_identity,
            static_dir: env_opt("STATIC_DIR"),
            widgets: WidgetTimings {
                booking_delay: env_millis("BOOKING_DELAY_MS", widget_defaults.booking_delay),
                chat_delay_min: env_millis("CHAT_DELAY_MIN_MS", widget_defaults.chat_delay_min),
                chat_delay_jitter: env_millis(
                    "CHAT_DELAY_JITTER_MS",
                    widget_defaults.chat_delay_jitter,
                ),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Where the identity provider sends users back after OAuth or e-mail confirmation.
    pub fn auth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url)
    }

    /// Reasons the process should refuse to start.
    pub fn startup_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.is_production()
            && self.hosted_identity.is_none()
            && (self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET)
        {
            problems.push(
                "JWT_SECRET must be set to a secure, unique value in production".to_string(),
            );
        }
        problems
    }
}
