//! Resolver configuration.
//!
//! Loaded from TOML or built in code. Every field has a default, so an empty
//! document yields the production settings (UTC+05:30, 12-hour noise cutoff,
//! identity-based class policy).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidates::{ClassPolicy, IdentityClassPolicy, ModeClassPolicy};
use crate::civil::{CivilClock, ZoneOffset};
use crate::error::ConfigError;

/// Which [`ClassPolicy`] the resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassPolicyKind {
    /// Long-session membership by principal identity.
    #[default]
    Identity,
    /// Long sessions for physical meetings, short for virtual.
    Mode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Fixed UTC offset of the principals' civil time, in minutes.
    pub zone_offset_minutes: i32,
    pub gateway_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Calendar periods strictly longer than this are treated as all-day noise.
    pub max_busy_hours: u32,
    /// Principal ids or calendar identities offered long sessions.
    pub long_session_principals: Vec<String>,
    pub class_policy: ClassPolicyKind,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            zone_offset_minutes: ZoneOffset::IST.minutes(),
            gateway_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
            max_busy_hours: 12,
            long_session_principals: Vec::new(),
            class_policy: ClassPolicyKind::Identity,
        }
    }
}

impl ResolverConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ZoneOffset::from_minutes(self.zone_offset_minutes)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.gateway_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "gateway_timeout_ms must be positive".to_string(),
            ));
        }
        if self.request_timeout_ms < self.gateway_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms ({}) is shorter than gateway_timeout_ms ({})",
                self.request_timeout_ms, self.gateway_timeout_ms
            )));
        }
        if self.max_busy_hours == 0 {
            return Err(ConfigError::Invalid(
                "max_busy_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn clock(&self) -> Result<CivilClock, ConfigError> {
        ZoneOffset::from_minutes(self.zone_offset_minutes)
            .map(CivilClock::new)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn class_policy(&self) -> Arc<dyn ClassPolicy> {
        match self.class_policy {
            ClassPolicyKind::Identity => {
                Arc::new(IdentityClassPolicy::new(&self.long_session_principals))
            }
            ClassPolicyKind::Mode => Arc::new(ModeClassPolicy),
        }
    }
}
