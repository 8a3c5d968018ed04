//! Server configuration, loaded from `WARDEN_*` environment variables.

use std::env;

use anyhow::{Context, bail};
use warden_auth::AuthConfig;
use warden_db::DbConfig;

/// Everything the binary needs to start.
#[derive(Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub db: DbConfig,
    /// Interval between expired-session sweeps, in seconds. `0` disables
    /// the sweeper.
    pub session_sweep_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token_lifetime_secs", &self.auth.access_token_lifetime_secs)
            .field("refresh_token_lifetime_secs", &self.auth.refresh_token_lifetime_secs)
            .field("ip_change_notify_url", &self.auth.ip_change_notify_url)
            .field("db_url", &self.db.url)
            .field("db_namespace", &self.db.namespace)
            .field("db_database", &self.db.database)
            .field("session_sweep_secs", &self.session_sweep_secs)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let signing_secret = var("WARDEN_SECRET_KEY").unwrap_or_default();
        if signing_secret.is_empty() {
            bail!("WARDEN_SECRET_KEY must be set");
        }

        let auth_defaults = AuthConfig::default();
        let db_defaults = DbConfig::default();

        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let config = Self {
            auth: AuthConfig {
                signing_secret,
                access_token_lifetime_secs: number(
                    "WARDEN_ACCESS_TTL_SECS",
                    auth_defaults.access_token_lifetime_secs,
                )?,
                refresh_token_lifetime_secs: number(
                    "WARDEN_REFRESH_TTL_SECS",
                    auth_defaults.refresh_token_lifetime_secs,
                )?,
                pepper: var("WARDEN_PEPPER").filter(|v| !v.is_empty()),
                ip_change_notify_url: var("WARDEN_NEW_IP_URL").filter(|v| !v.is_empty()),
                notify_timeout_secs: number(
                    "WARDEN_NOTIFY_TIMEOUT_SECS",
                    auth_defaults.notify_timeout_secs,
                )?,
            },
            db: DbConfig {
                url: var("WARDEN_DB_URL").unwrap_or(db_defaults.url),
                namespace: var("WARDEN_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
                database: var("WARDEN_DB_DATABASE").unwrap_or(db_defaults.database),
                username: var("WARDEN_DB_USER").or(db_defaults.username),
                password: var("WARDEN_DB_PASSWORD").or(db_defaults.password),
            },
            session_sweep_secs: number("WARDEN_SESSION_SWEEP_SECS", 3600)?,
        };
        config.auth.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn secret_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("WARDEN_SECRET_KEY"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("WARDEN_SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.auth.signing_secret, "s3cret");
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert_eq!(config.auth.refresh_token_lifetime_secs, 604_800);
        assert_eq!(config.auth.ip_change_notify_url, None);
        assert_eq!(config.db.namespace, "warden");
        assert_eq!(config.session_sweep_secs, 3600);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("WARDEN_SECRET_KEY", "s3cret"),
            ("WARDEN_ACCESS_TTL_SECS", "60"),
            ("WARDEN_NEW_IP_URL", "http://alerts.internal/new-ip"),
            ("WARDEN_DB_URL", "mem://"),
        ]))
        .unwrap();
        assert_eq!(config.auth.access_token_lifetime_secs, 60);
        assert_eq!(
            config.auth.ip_change_notify_url.as_deref(),
            Some("http://alerts.internal/new-ip")
        );
        assert!(config.db.is_embedded());
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("WARDEN_SECRET_KEY", "s3cret"),
            ("WARDEN_REFRESH_TTL_SECS", "a week"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("WARDEN_REFRESH_TTL_SECS"));
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("WARDEN_SECRET_KEY", "s3cret"),
            ("WARDEN_REFRESH_TTL_SECS", "1000000000000000"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("refresh_token_lifetime_secs"));

        let err = Config::from_lookup(lookup(&[
            ("WARDEN_SECRET_KEY", "s3cret"),
            ("WARDEN_ACCESS_TTL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("access_token_lifetime_secs"));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("WARDEN_SECRET_KEY", "s3cret"),
            ("WARDEN_PEPPER", "pepper!"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("pepper!"));
    }
}
