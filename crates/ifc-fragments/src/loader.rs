// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model loading - raw buffer in, unregistered fragment group out
//!
//! Parsing is CPU-bound, so it runs on tokio's blocking pool. A timed-out
//! parse keeps running in the background but its result is dropped.

use crate::error::{FragmentError, Result};
use crate::group::{FragmentGroup, GroupData};
use ifc_frag_model::{IfcParser, LoaderSettings, ProgressCallback};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs the parsing capability with a snapshot of the filter policy
#[derive(Clone)]
pub struct Loader {
    parser: Arc<dyn IfcParser>,
    timeout: Option<Duration>,
}

impl Loader {
    pub fn new(parser: Arc<dyn IfcParser>) -> Self {
        Self {
            parser,
            timeout: None,
        }
    }

    /// Fail loads that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Parse `buffer` into a new group with a fresh id and an empty name
    ///
    /// `settings` is cloned before parsing starts; later changes by the caller
    /// do not affect this load. The group is not registered.
    ///
    /// # Errors
    /// `Parse` or `UnsupportedSchema` from the parser, `Timeout` if the
    /// configured timeout elapses, `LoadAborted` if the parse task dies.
    pub async fn load(
        &self,
        buffer: Arc<[u8]>,
        settings: &LoaderSettings,
        on_progress: Option<ProgressCallback>,
    ) -> Result<FragmentGroup> {
        let start = Instant::now();
        let parser = Arc::clone(&self.parser);
        let settings = settings.clone();
        log::info!(
            "[Loader] Loading {} bytes (excluding: {})",
            buffer.len(),
            if settings.excluded_categories.is_empty() {
                "nothing".to_string()
            } else {
                settings.excluded_names().join(", ")
            }
        );

        let task = tokio::task::spawn_blocking(move || match on_progress {
            Some(cb) => parser.parse_with_progress(&buffer, &settings, cb),
            None => parser.parse(&buffer, &settings),
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    log::warn!("[Loader] Load timed out after {limit:?}");
                    return Err(FragmentError::Timeout(limit));
                }
            },
            None => task.await,
        };
        let model = joined
            .map_err(|e| FragmentError::LoadAborted(e.to_string()))?
            .map_err(|e| {
                log::warn!("[Loader] Parse failed: {e}");
                FragmentError::from(e)
            })?;

        let group = FragmentGroup::new(GroupData::from(model));
        log::info!(
            "[Loader] Loaded {} elements into {} in {:.1}ms",
            group.element_count()?,
            group.id(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(group)
    }
}
