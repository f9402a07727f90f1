use std::{env, net::SocketAddr};

use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub public_base_url: Url,
    pub smtp: SmtpConfig,
    pub notify_workers: usize,
    pub notify_queue_size: usize,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = var("DATABASE_URL", "sqlite://journey.db");
        let listen_addr: SocketAddr = var("APP_LISTEN_ADDR", "127.0.0.1:3000")
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;
        let public_base_url = Url::parse(&var("PUBLIC_BASE_URL", "http://localhost:3000"))
            .map_err(|err| AppError::Config(format!("invalid PUBLIC_BASE_URL: {err}")))?;

        let port = var("SMTP_PORT", "1025")
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SMTP_PORT: {err}")))?;
        let credentials = match (lookup("SMTP_USERNAME"), lookup("SMTP_PASSWORD")) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => {
                return Err(AppError::Config(
                    "SMTP_USERNAME and SMTP_PASSWORD must be set together".into(),
                ))
            }
        };
        let smtp = SmtpConfig {
            host: var("SMTP_HOST", "localhost"),
            port,
            credentials,
            from: var("MAIL_FROM", "mailpit@journey.com"),
        };

        let notify_workers = positive(&var("NOTIFY_WORKERS", "2"), "NOTIFY_WORKERS")?;
        let notify_queue_size = positive(&var("NOTIFY_QUEUE_SIZE", "256"), "NOTIFY_QUEUE_SIZE")?;

        Ok(Self {
            database_url,
            listen_addr,
            public_base_url,
            smtp,
            notify_workers,
            notify_queue_size,
        })
    }
}

fn positive(raw: &str, key: &str) -> Result<usize, AppError> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_mailpit() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite://journey.db");
        assert_eq!(config.smtp.host, "localhost");
        assert_eq!(config.smtp.port, 1025);
        assert!(config.smtp.credentials.is_none());
        assert_eq!(config.notify_workers, 2);
        assert_eq!(config.notify_queue_size, 256);
    }

    #[test]
    fn rejects_half_configured_credentials() {
        let err = config_from(&[("SMTP_USERNAME", "bob")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = config_from(&[("NOTIFY_WORKERS", "0")]).unwrap_err();
        assert!(err.to_string().contains("NOTIFY_WORKERS"));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("APP_LISTEN_ADDR", "0.0.0.0:8080"),
            ("PUBLIC_BASE_URL", "https://journey.example"),
            ("SMTP_USERNAME", "bob"),
            ("SMTP_PASSWORD", "hunter2"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.public_base_url.host_str(), Some("journey.example"));
        assert_eq!(
            config.smtp.credentials,
            Some(("bob".to_string(), "hunter2".to_string()))
        );
    }
}
