// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::PathBuf;

use serde::de;
use tracing::warn;

use crate::error::SyncError;

/// The application name, used for the default work directory.
pub const APP_NAME: &str = "icalsync";

/// Floor for the calendar cache TTL, seconds.
const MIN_CACHE_TTL_SECS: u64 = 60;

/// Floor for a non-zero backup retention, days.
const MIN_BACKUP_RETENTION_DAYS: u64 = 1;

/// Synchronizer configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Directory for backups, the to-do mirror and the name cache.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Calendar cache TTL in seconds. Values below 60 are clamped.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Backup retention in days. `0` disables backups entirely; non-zero
    /// values below one day are clamped.
    #[serde(default = "default_backup_retention")]
    pub backup_retention_days: u64,

    /// Reminder delivery channels pushed to the remote side.
    #[serde(default)]
    pub alarm_channels: AlarmChannels,

    /// Whether non-standard properties are carried through downloads.
    #[serde(default = "default_true")]
    pub extensions_enabled: bool,

    /// Optional HTTP proxy host.
    #[serde(default)]
    pub proxy_host: Option<String>,

    /// Optional HTTP proxy port.
    #[serde(default)]
    pub proxy_port: Option<u16>,
}

const fn default_cache_ttl() -> u64 {
    180
}

const fn default_backup_retention() -> u64 {
    7
}

const fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: None,
            cache_ttl_secs: default_cache_ttl(),
            backup_retention_days: default_backup_retention(),
            alarm_channels: AlarmChannels::default(),
            extensions_enabled: true,
            proxy_host: None,
            proxy_port: None,
        }
    }
}

impl Config {
    /// Clamps out-of-range values and resolves the work directory.
    ///
    /// # Errors
    ///
    /// Returns an error when no work directory is configured and the user's
    /// home directory cannot be determined.
    pub fn normalize(&mut self) -> Result<(), SyncError> {
        if self.cache_ttl_secs < MIN_CACHE_TTL_SECS {
            warn!(
                configured = self.cache_ttl_secs,
                "cache TTL below minimum, clamping"
            );
            self.cache_ttl_secs = MIN_CACHE_TTL_SECS;
        }

        if self.backup_retention_days != 0 && self.backup_retention_days < MIN_BACKUP_RETENTION_DAYS
        {
            warn!(
                configured = self.backup_retention_days,
                "backup retention below minimum, clamping"
            );
            self.backup_retention_days = MIN_BACKUP_RETENTION_DAYS;
        }

        if self.work_dir.is_none() {
            let home = dirs::home_dir()
                .ok_or_else(|| SyncError::Config("home directory not found".to_string()))?;
            self.work_dir = Some(home.join(format!(".{APP_NAME}")));
        }
        Ok(())
    }

    /// The resolved work directory. Call [`Config::normalize`] first.
    ///
    /// # Errors
    ///
    /// Returns an error when the work directory is still unset.
    pub fn work_dir(&self) -> Result<&PathBuf, SyncError> {
        self.work_dir
            .as_ref()
            .ok_or_else(|| SyncError::Config("work directory not resolved".to_string()))
    }
}

/// Reminder delivery channel flags, parsed from a comma list like
/// `"popup,email"`. The default is popup only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmChannels {
    /// Pop-up reminders.
    pub popup: bool,
    /// Email reminders.
    pub email: bool,
    /// SMS reminders.
    pub sms: bool,
}

impl Default for AlarmChannels {
    fn default() -> Self {
        Self {
            popup: true,
            email: false,
            sms: false,
        }
    }
}

impl AlarmChannels {
    fn parse(value: &str) -> Self {
        let mut channels = Self {
            popup: false,
            email: false,
            sms: false,
        };
        for part in value.split(',') {
            match part.trim().to_lowercase().as_str() {
                "popup" => channels.popup = true,
                "email" => channels.email = true,
                "sms" => channels.sms = true,
                "" => {}
                other => warn!(channel = other, "unknown alarm channel ignored"),
            }
        }
        if !channels.popup && !channels.email && !channels.sms {
            channels.popup = true;
        }
        channels
    }
}

impl<'de> serde::Deserialize<'de> for AlarmChannels {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ChannelsVisitor;

        impl de::Visitor<'_> for ChannelsVisitor {
            type Value = AlarmChannels;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(r#"a channel list like "popup,email,sms""#)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(AlarmChannels::parse(value))
            }
        }

        deserializer.deserialize_str(ChannelsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let mut config = Config {
            cache_ttl_secs: 5,
            backup_retention_days: 0,
            work_dir: Some(PathBuf::from("/tmp/sync")),
            ..Default::default()
        };
        config.normalize().unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        // Zero stays zero: it means "backups disabled"
        assert_eq!(config.backup_retention_days, 0);
    }

    #[test]
    fn parses_alarm_channels() {
        let channels = AlarmChannels::parse("popup, email");
        assert!(channels.popup && channels.email && !channels.sms);

        // Nothing recognized falls back to popup
        let channels = AlarmChannels::parse("carrier-pigeon");
        assert!(channels.popup && !channels.email);
    }

    #[test]
    fn deserializes_from_toml() {
        let config: Config = toml::from_str(
            r#"
            work_dir = "/tmp/sync"
            cache_ttl_secs = 300
            alarm_channels = "email,sms"
            extensions_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(!config.extensions_enabled);
        assert!(config.alarm_channels.email && config.alarm_channels.sms);
        assert!(!config.alarm_channels.popup);
    }
}
