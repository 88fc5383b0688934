//! Configuration for issue construction.
//!
//! An [`IssueConfig`] can be passed to a single
//! [`IssueBuilder`](crate::IssueBuilder), or installed as the process-wide
//! default that every other construction reads.
//!
//! ```rust
//! use moth::{IssueConfig, RecordStyle};
//!
//! IssueConfig {
//!     trace_limit: 20,
//!     context_record_style: RecordStyle::Inspect,
//!     ..IssueConfig::DEFAULT
//! }
//! .install()
//! .expect("failed to install issue configuration");
//!
//! assert_eq!(IssueConfig::current().trace_limit, 20);
//! ```
//!
//! # Environment Variables
//!
//! Read once, the first time the process default is needed and nothing has
//! been installed:
//!
//! - `MOTH_TRACE_LIMIT` - Maximum number of captured stack frames
//! - `MOTH_RECORDS` - Record style for the primary value: `inspect`, `json` or
//!   `flat`
//! - `MOTH_CONTEXT_RECORDS` - Record style for context values

use std::{env, sync::OnceLock};

use spin::RwLock;

use crate::normalize::{RecordStyle, UnknownRecordStyle};

/// The trace limit used when none is configured.
pub const DEFAULT_TRACE_LIMIT: usize = 100;

/// Settings read by every issue construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IssueConfig {
    /// Maximum number of stack frames captured for an issue.
    ///
    /// Only applies to stacks captured natively; stack text supplied through
    /// [`IssueBuilder::stack`](crate::IssueBuilder::stack) is parsed in full.
    pub trace_limit: usize,
    /// How a primary record value becomes the issue's state.
    pub record_style: RecordStyle,
    /// How record context values become entries of the issue's states.
    ///
    /// Defaults to [`RecordStyle::Flat`], which is shallower than the primary
    /// value's default. Set both fields to the same style to treat primary and
    /// context records alike.
    pub context_record_style: RecordStyle,
}

impl IssueConfig {
    /// Default settings: 100 frames, inspected primary records, flat context
    /// records.
    pub const DEFAULT: Self = Self {
        trace_limit: DEFAULT_TRACE_LIMIT,
        record_style: RecordStyle::Inspect,
        context_record_style: RecordStyle::Flat,
    };

    /// Reads settings from the environment, falling back to
    /// [`IssueConfig::DEFAULT`] when a variable is invalid.
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|error| {
            warn_invalid(&error);
            Self::DEFAULT
        })
    }

    /// Reads settings from the environment.
    ///
    /// Unset variables keep their default.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::DEFAULT;

        if let Some(limit) = env_var("MOTH_TRACE_LIMIT") {
            config.trace_limit = limit
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTraceLimit(limit))?;
        }
        if let Some(style) = env_var("MOTH_RECORDS") {
            config.record_style = style.parse()?;
        }
        if let Some(style) = env_var("MOTH_CONTEXT_RECORDS") {
            config.context_record_style = style.parse()?;
        }

        Ok(config)
    }

    /// Returns the installed configuration, or the process default.
    ///
    /// The process default is [`IssueConfig::from_env`], read once.
    pub fn current() -> Self {
        let installed = *INSTALLED.read();
        installed.unwrap_or_else(Self::process_default)
    }

    /// Installs this configuration as the process-wide default.
    ///
    /// If a configuration is already installed, returns an error containing
    /// the configuration that was attempted to be installed. See also
    /// [`replace`](Self::replace), which never fails.
    pub fn install(self) -> Result<(), ConfigAlreadyInstalledError> {
        let mut installed = INSTALLED.write();
        if installed.is_some() {
            return Err(ConfigAlreadyInstalledError(self));
        }
        *installed = Some(self);
        Ok(())
    }

    /// Replaces the process-wide configuration, returning the previously
    /// installed one, if any.
    pub fn replace(self) -> Option<IssueConfig> {
        INSTALLED.write().replace(self)
    }

    // The warning is emitted only after the value is stored, so a subscriber
    // that reads the configuration while handling it sees the stored value.
    fn process_default() -> Self {
        static FROM_ENV: OnceLock<IssueConfig> = OnceLock::new();
        if let Some(config) = FROM_ENV.get() {
            return *config;
        }

        let (config, error) = match Self::try_from_env() {
            Ok(config) => (config, None),
            Err(error) => (Self::DEFAULT, Some(error)),
        };
        let stored = FROM_ENV.set(config).is_ok();
        if let Some(error) = error.filter(|_| stored) {
            warn_invalid(&error);
        }
        FROM_ENV.get().copied().unwrap_or(config)
    }
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static INSTALLED: RwLock<Option<IssueConfig>> = RwLock::new(None);

/// Sets the process-wide trace limit, keeping the other current settings.
///
/// The last call wins.
pub fn set_trace_limit(limit: usize) {
    // Resolved before locking, since reading the environment may log.
    let fallback = IssueConfig::process_default();
    let mut installed = INSTALLED.write();
    let base = (*installed).unwrap_or(fallback);
    *installed = Some(IssueConfig {
        trace_limit: limit,
        ..base
    });
}

fn warn_invalid(error: &ConfigError) {
    tracing::warn!(
        %error,
        "ignoring invalid issue configuration from the environment"
    );
}

fn env_var(name: &str) -> Option<String> {
    env::var_os(name).map(|value| value.to_string_lossy().into_owned())
}

/// Error returned when installing a configuration while one is already
/// installed.
///
/// Contains the configuration that was attempted to be installed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("an issue configuration is already installed")]
pub struct ConfigAlreadyInstalledError(pub IssueConfig);

/// Error returned when the environment holds an invalid setting.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `MOTH_TRACE_LIMIT` is not a non-negative integer.
    #[error("`MOTH_TRACE_LIMIT` must be a non-negative integer, got `{0}`")]
    InvalidTraceLimit(String),
    /// A record style variable names an unknown style.
    #[error(transparent)]
    RecordStyle(#[from] UnknownRecordStyle),
}
