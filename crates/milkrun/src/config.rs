use std::env;
use std::net::SocketAddr;
use std::num::NonZeroU32;

use anyhow::{Context, Result};
use milkrun_core::db::DEFAULT_MAX_CONNECTIONS;
use milkrun_core::schema::TableName;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:65530";
pub const WEBHOOK_PATH: &str = "/webhook-endpoint";

/// Process settings, read from the environment (and `.env`) once at start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub table: TableName,
    pub listen_addr: SocketAddr,
    pub max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").or_else(|| lookup("MILKRUN_DATABASE_URL"));

        let table = match lookup("MILKRUN_TABLE") {
            Some(name) => TableName::new(name).context("MILKRUN_TABLE is invalid")?,
            None => TableName::default(),
        };

        let listen_addr = lookup("MILKRUN_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("MILKRUN_LISTEN_ADDR must be a socket address such as 127.0.0.1:65530")?;

        let max_connections = match lookup("MILKRUN_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<NonZeroU32>()
                .with_context(|| format!("MILKRUN_MAX_CONNECTIONS must be a positive integer, got `{raw}`"))?
                .get(),
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            table,
            listen_addr,
            max_connections,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL (or MILKRUN_DATABASE_URL) must be set")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = load(&[]).expect("defaults");
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.table, TableName::default());
        assert_eq!(settings.listen_addr, DEFAULT_LISTEN_ADDR.parse().expect("addr"));
        assert_eq!(settings.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(settings.require_database_url().is_err());
    }

    #[test]
    fn database_url_falls_back_to_prefixed_name() {
        let settings = load(&[("MILKRUN_DATABASE_URL", "postgres://fallback/db")]).expect("settings");
        assert_eq!(settings.require_database_url().expect("url"), "postgres://fallback/db");

        let settings = load(&[
            ("DATABASE_URL", "postgres://primary/db"),
            ("MILKRUN_DATABASE_URL", "postgres://fallback/db"),
        ])
        .expect("settings");
        assert_eq!(settings.database_url.as_deref(), Some("postgres://primary/db"));
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = load(&[
            ("MILKRUN_TABLE", "trip_events"),
            ("MILKRUN_LISTEN_ADDR", "0.0.0.0:8080"),
            ("MILKRUN_MAX_CONNECTIONS", "12"),
        ])
        .expect("settings");
        assert_eq!(settings.table.as_str(), "trip_events");
        assert_eq!(settings.listen_addr.port(), 8080);
        assert_eq!(settings.max_connections, 12);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for vars in [
            [("MILKRUN_TABLE", "Trip-Events")],
            [("MILKRUN_TABLE", "TripEvents")],
            [("MILKRUN_LISTEN_ADDR", "localhost")],
            [("MILKRUN_MAX_CONNECTIONS", "0")],
            [("MILKRUN_MAX_CONNECTIONS", "-3")],
            [("MILKRUN_MAX_CONNECTIONS", "many")],
        ] {
            assert!(load(&vars).is_err(), "{vars:?} should be rejected");
        }
    }
}
