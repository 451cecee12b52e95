use std::str::FromStr;

use anyhow::Context;
use serde::Serialize;

/// Deployment mode, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Whether internal error details may be sent to clients.
    pub fn exposes_errors(&self) -> bool {
        !matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => anyhow::bail!("unknown APP_ENV '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    /// Explicit database name; falls back to the one in the URI.
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub mongo: MongoConfig,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = match std::env::var("APP_ENV") {
            Ok(v) => v.parse::<Environment>()?,
            Err(_) => Environment::Development,
        };

        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("invalid APP_PORT '{}'", v))?,
            Err(_) if environment == Environment::Test => 5001,
            Err(_) => 5000,
        };

        let uri = match (std::env::var("MONGODB_URI"), environment) {
            (Ok(uri), _) => uri,
            (Err(_), Environment::Production) => {
                anyhow::bail!("MONGODB_URI must be set in production")
            }
            (Err(_), Environment::Test) => "mongodb://localhost:27017/crud_database_test".into(),
            (Err(_), Environment::Development) => "mongodb://localhost:27017/crud_database".into(),
        };

        Ok(Self {
            environment,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            mongo: MongoConfig {
                uri,
                database: std::env::var("MONGODB_DATABASE").ok().filter(|v| !v.is_empty()),
            },
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "https://yourdomain.com".into()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_environment_names() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(" test ".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn only_production_hides_errors() {
        assert!(Environment::Development.exposes_errors());
        assert!(Environment::Test.exposes_errors());
        assert!(!Environment::Production.exposes_errors());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = AppConfig {
            environment: Environment::Test,
            host: "127.0.0.1".into(),
            port: 5001,
            mongo: MongoConfig {
                uri: "mongodb://localhost:27017".into(),
                database: None,
            },
            cors_origin: "*".into(),
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:5001");
    }
}
