//! Loadable snapshot of scheduler tunables.
//!
//! [`SchedulerSettings`] is plain data: it can be read from a JSON document or
//! from `GC_SCHEDULER_*` environment variables, validated, and then applied
//! to a live [`SchedulerConfig`](crate::SchedulerConfig). Absent fields leave
//! the live value untouched.
//!
//! # Examples
//!
//! ```
//! use gc_scheduler::{SchedulerConfig, SchedulerSettings};
//!
//! let settings = SchedulerSettings::from_json(r#"{ "regular_interval_us": 50000 }"#).unwrap();
//! settings.validate(false).unwrap();
//!
//! let config = SchedulerConfig::default();
//! config.apply(&settings);
//! assert_eq!(config.regular_interval_us(), 50_000);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Prefix shared by all environment variables read by [`SchedulerSettings::from_env`].
pub const ENV_PREFIX: &str = "GC_SCHEDULER_";

/// Optional values for each tunable of [`SchedulerConfig`](crate::SchedulerConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSettings {
    /// Weighted safepoint count at which a thread escalates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safepoint_count_threshold: Option<usize>,
    /// Allocated bytes at which a thread escalates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_threshold_bytes: Option<usize>,
    /// Cooldown since the last collection, in nanoseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_threshold_ns: Option<u64>,
    /// Period of the regular timer, in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_interval_us: Option<u64>,
    /// Reserved flag for an external tuner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_tune: Option<bool>,
}

impl SchedulerSettings {
    /// Parses settings from a JSON object.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the present fields as a JSON object.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reads settings from `GC_SCHEDULER_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    ///
    /// Variable names are the upper-cased field names prefixed with
    /// [`ENV_PREFIX`], e.g. `GC_SCHEDULER_REGULAR_INTERVAL_US`.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(SchedulerSettings {
            safepoint_count_threshold: parse_var(&lookup, "SAFEPOINT_COUNT_THRESHOLD")?,
            allocation_threshold_bytes: parse_var(&lookup, "ALLOCATION_THRESHOLD_BYTES")?,
            cooldown_threshold_ns: parse_var(&lookup, "COOLDOWN_THRESHOLD_NS")?,
            regular_interval_us: parse_var(&lookup, "REGULAR_INTERVAL_US")?,
            auto_tune: parse_var(&lookup, "AUTO_TUNE")?,
        })
    }

    /// Checks that the present values are usable.
    ///
    /// A zero timer period would make the timer thread spin. A zero
    /// allocation threshold collects on every allocation and is only
    /// accepted in aggressive mode.
    pub fn validate(&self, aggressive_mode: bool) -> ConfigResult<()> {
        if self.regular_interval_us == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "regular_interval_us",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.allocation_threshold_bytes == Some(0) && !aggressive_mode {
            return Err(ConfigError::InvalidValue {
                field: "allocation_threshold_bytes",
                reason: "zero is only allowed in aggressive mode".to_string(),
            });
        }
        Ok(())
    }

    /// Overlays `other` on top of `self`; fields present in `other` win.
    pub fn merge(mut self, other: SchedulerSettings) -> Self {
        self.safepoint_count_threshold = other.safepoint_count_threshold.or(self.safepoint_count_threshold);
        self.allocation_threshold_bytes = other.allocation_threshold_bytes.or(self.allocation_threshold_bytes);
        self.cooldown_threshold_ns = other.cooldown_threshold_ns.or(self.cooldown_threshold_ns);
        self.regular_interval_us = other.regular_interval_us.or(self.regular_interval_us);
        self.auto_tune = other.auto_tune.or(self.auto_tune);
        self
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let var = format!("{}{}", ENV_PREFIX, name);
    match lookup(&var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value: raw }),
    }
}
