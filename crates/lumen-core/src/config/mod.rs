// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide settings of the render-cache subsystem.
//!
//! Settings are read from the environment once, on first use, and never
//! re-read. Applications and tests that need a specific configuration can
//! install one with [`CacheSettings::init_once`] before anything queries
//! [`CacheSettings::global`], or pass a `CacheSettings` value explicitly to
//! the types that accept one.

use std::sync::OnceLock;

/// Enables or disables automatic caching (`0` disables).
pub const ENV_AUTO_CACHING: &str = "LUMEN_AUTO_CACHING";
/// Enables the graduated shape-count table (non-zero enables).
pub const ENV_SMART_CACHING: &str = "LUMEN_SMART_CACHING";
/// Default number of recordings kept per caching group.
pub const ENV_MAX_CACHES: &str = "LUMEN_MAX_CACHES";
/// Verbosity of cache decision logging.
pub const ENV_DEBUG_CACHING: &str = "LUMEN_DEBUG_CACHING";
/// Polls the GPU error state after every replay (non-zero enables).
pub const ENV_GPU_ERROR_CHECKS: &str = "LUMEN_GPU_ERROR_CHECKS";

static GLOBAL: OnceLock<CacheSettings> = OnceLock::new();

/// Settings steering cache creation and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheSettings {
    /// If `false`, cache lists opened in automatic mode never record.
    pub auto_caching: bool,
    /// If `true`, automatic mode also consults the number of shapes drawn
    /// below the group before deciding to record.
    pub smart_caching: bool,
    /// Default capacity of caching groups.
    pub max_caches: usize,
    /// `0` is silent, `1` logs cache decisions, `2` and above also logs invalidations.
    pub debug_level: u32,
    /// If `true`, the GPU error state is polled after every replay.
    pub gpu_error_checks: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            auto_caching: true,
            smart_caching: false,
            max_caches: 2,
            debug_level: 0,
            gpu_error_checks: false,
        }
    }
}

impl CacheSettings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from an arbitrary key lookup. Missing keys keep
    /// their defaults; malformed values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let int = |key: &str| -> Option<i64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring {key}={raw:?}: not an integer.");
                    None
                }
            }
        };

        let max_caches = match int(ENV_MAX_CACHES).map(|value| (value, usize::try_from(value))) {
            Some((_, Ok(value))) => value,
            Some((value, Err(_))) => {
                log::warn!(
                    "Ignoring {ENV_MAX_CACHES}={value}: must be between 0 and {}.",
                    usize::MAX
                );
                defaults.max_caches
            }
            None => defaults.max_caches,
        };

        Self {
            auto_caching: int(ENV_AUTO_CACHING).map_or(defaults.auto_caching, |v| v != 0),
            smart_caching: int(ENV_SMART_CACHING).map_or(defaults.smart_caching, |v| v != 0),
            max_caches,
            debug_level: int(ENV_DEBUG_CACHING)
                .map_or(defaults.debug_level, |v| v.clamp(0, u32::MAX as i64) as u32),
            gpu_error_checks: int(ENV_GPU_ERROR_CHECKS)
                .map_or(defaults.gpu_error_checks, |v| v != 0),
        }
    }

    /// Installs `settings` as the process-wide configuration.
    ///
    /// Returns `false` (and changes nothing) if a configuration was already
    /// installed or read from the environment.
    pub fn init_once(settings: CacheSettings) -> bool {
        GLOBAL.set(settings).is_ok()
    }

    /// Returns the process-wide configuration, reading the environment on first call.
    pub fn global() -> &'static CacheSettings {
        GLOBAL.get_or_init(|| {
            let settings = Self::from_env();
            log::debug!("Cache settings: {settings:?}");
            settings
        })
    }

    /// Returns `true` when cache decisions should be logged.
    pub fn logs_decisions(&self) -> bool {
        self.debug_level > 0
    }

    /// Returns `true` when invalidations should be logged.
    pub fn logs_invalidations(&self) -> bool {
        self.debug_level > 1
    }
}
