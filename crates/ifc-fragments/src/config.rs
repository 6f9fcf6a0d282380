// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager configuration, optionally loaded from environment variables.

use ifc_frag_model::LoaderSettings;
use std::time::Duration;

/// Fragments manager configuration.
#[derive(Debug, Clone)]
pub struct FragmentsConfig {
    /// Initial filter policy; the manager's copy may change between loads.
    pub settings: LoaderSettings,
    /// Abandon loads that take longer than this.
    pub load_timeout: Option<Duration>,
    /// Zlib-compress fragment stream bodies on export.
    pub compress_fragments: bool,
    /// Events buffered per subscriber before the slowest one lags.
    pub event_capacity: usize,
}

impl Default for FragmentsConfig {
    fn default() -> Self {
        Self {
            settings: LoaderSettings::default(),
            load_timeout: None,
            compress_fragments: true,
            event_capacity: 64,
        }
    }
}

impl FragmentsConfig {
    /// Load configuration from environment variables.
    ///
    /// - `IFC_FRAG_LOAD_TIMEOUT_SECS`: load timeout, `0` disables it
    /// - `IFC_FRAG_COMPRESS`: compress fragment streams (`true`/`false`)
    /// - `IFC_FRAG_NORMALIZE_COORDINATES`: recenter imported geometry
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(default)
        };

        let load_timeout = match lookup("IFC_FRAG_LOAD_TIMEOUT_SECS").map(|v| v.trim().parse::<u64>()) {
            Some(Ok(0)) => None,
            Some(Ok(secs)) => Some(Duration::from_secs(secs)),
            _ => defaults.load_timeout,
        };

        let normalize = flag(
            "IFC_FRAG_NORMALIZE_COORDINATES",
            defaults.settings.normalize_coordinates,
        );

        Self {
            settings: defaults.settings.with_normalize_coordinates(normalize),
            load_timeout,
            compress_fragments: flag("IFC_FRAG_COMPRESS", defaults.compress_fragments),
            event_capacity: defaults.event_capacity,
        }
    }

    pub fn with_settings(mut self, settings: LoaderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_fragments = enabled;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
