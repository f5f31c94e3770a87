//! Environment variable overlay for any [`ConfigPort`].
//!
//! | Variable          | Overrides                  |
//! |-------------------|----------------------------|
//! | `SIGNATURE`       | `[agent] signature`        |
//! | `INIT_DATE`       | `[date_range] init_date`   |
//! | `END_DATE`        | `[date_range] end_date`    |
//! | `ASSET_TYPE`      | `[agent] asset_type`       |
//! | `TRADING_SYMBOLS` | `[agent] symbols`          |
//! | `INITIAL_CASH`    | `[agent] initial_cash`     |

use crate::ports::config_port::ConfigPort;
use std::collections::HashMap;
use tracing::info;

pub const ENV_OVERRIDES: &[(&str, &str, &str)] = &[
    ("SIGNATURE", "agent", "signature"),
    ("INIT_DATE", "date_range", "init_date"),
    ("END_DATE", "date_range", "end_date"),
    ("ASSET_TYPE", "agent", "asset_type"),
    ("TRADING_SYMBOLS", "agent", "symbols"),
    ("INITIAL_CASH", "agent", "initial_cash"),
];

pub struct EnvOverrideConfig<C> {
    inner: C,
    overrides: HashMap<(String, String), String>,
}

impl<C: ConfigPort> EnvOverrideConfig<C> {
    pub fn from_env(inner: C) -> Self {
        Self::from_lookup(inner, |var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values are ignored.
    pub fn from_lookup(inner: C, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut overrides = HashMap::new();
        for &(var, section, key) in ENV_OVERRIDES {
            let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            info!(variable = var, section, key, "configuration overridden from environment");
            overrides.insert((section.to_string(), key.to_string()), value);
        }
        Self { inner, overrides }
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&String> {
        self.overrides.get(&(section.to_string(), key.to_string()))
    }
}

impl<C: ConfigPort> ConfigPort for EnvOverrideConfig<C> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .cloned()
            .or_else(|| self.inner.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key).and_then(|v| v.trim().parse().ok()) {
            Some(v) => v,
            None => self.inner.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key).and_then(|v| v.trim().parse().ok()) {
            Some(v) => v,
            None => self.inner.get_double(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }
}
