// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The application context tying loading, registration, export and disposal
//! together.
//!
//! Registry mutation goes through `&mut self`, so at most one mutating
//! operation is in flight. Loads only borrow the manager and can overlap; each
//! one carries a [`LoadTicket`] whose generation is checked at registration.
//! [`FragmentsManager::dispose_all`] and [`FragmentsManager::cancel_pending`]
//! bump the generation, which turns every pending load stale.

use crate::config::FragmentsConfig;
use crate::disposer;
use crate::error::{FragmentError, Result};
use crate::events::{EventBus, FragmentEvent};
use crate::exporter::{self, ExportArtifact, Exporter};
use crate::group::{FragmentGroup, GroupId};
use crate::loader::Loader;
use crate::registry::GroupRegistry;
use ifc_frag_model::{IfcParser, LoaderSettings, ProgressCallback};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Identifies one load and the registry generation it started in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: u64,
    pub generation: u64,
}

/// A finished load waiting for registration
#[derive(Debug)]
pub struct PendingGroup {
    pub ticket: LoadTicket,
    pub group: FragmentGroup,
}

/// Owns the registry and the filter policy
pub struct FragmentsManager {
    settings: LoaderSettings,
    registry: GroupRegistry,
    loader: Loader,
    exporter: Exporter,
    events: EventBus,
    generation: u64,
    next_ticket: AtomicU64,
}

impl FragmentsManager {
    pub fn new(parser: Arc<dyn IfcParser>, config: FragmentsConfig) -> Self {
        Self {
            settings: config.settings,
            registry: GroupRegistry::new(),
            loader: Loader::new(parser).with_timeout(config.load_timeout),
            exporter: Exporter::new().with_compression(config.compress_fragments),
            events: EventBus::new(config.event_capacity),
            generation: 0,
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Current filter policy
    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Change the filter policy. Loads already running keep their snapshot.
    pub fn settings_mut(&mut self) -> &mut LoaderSettings {
        &mut self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FragmentEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn get(&self, id: GroupId) -> Option<FragmentGroup> {
        self.registry.get(id)
    }

    /// Snapshot of all registered groups
    pub fn groups(&self) -> Vec<FragmentGroup> {
        self.registry.all()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Parse a buffer under the current policy
    ///
    /// The resulting group is not registered; pass it to
    /// [`register`](Self::register). Parser phases are relayed as
    /// [`FragmentEvent::LoadProgress`].
    pub async fn load(&self, buffer: impl Into<Arc<[u8]>>) -> Result<PendingGroup> {
        let ticket = LoadTicket {
            id: self.next_ticket.fetch_add(1, Ordering::Relaxed),
            generation: self.generation,
        };
        self.events.emit(FragmentEvent::LoadStarted { ticket: ticket.id });

        let events = self.events.clone();
        let progress: ProgressCallback = Box::new(move |phase: &str, percent: f32| {
            events.emit(FragmentEvent::LoadProgress {
                ticket: ticket.id,
                phase: phase.to_string(),
                percent,
            });
        });

        match self
            .loader
            .load(buffer.into(), &self.settings, Some(progress))
            .await
        {
            Ok(group) => {
                self.events.emit(FragmentEvent::LoadFinished {
                    ticket: ticket.id,
                    group: group.id(),
                    elements: group.element_count()?,
                });
                Ok(PendingGroup { ticket, group })
            }
            Err(e) => {
                self.events.emit(FragmentEvent::LoadFailed {
                    ticket: ticket.id,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Register a finished load
    ///
    /// # Errors
    /// `StaleLoad` if the registry was disposed or pending loads were
    /// cancelled after the load started; the group is released and nothing is
    /// registered. `DuplicateId` or `InvalidState` from the registry.
    pub fn register(&mut self, pending: PendingGroup) -> Result<FragmentGroup> {
        let PendingGroup { ticket, group } = pending;
        if ticket.generation != self.generation {
            log::info!(
                "[Loader] Discarding stale load {} (generation {} < {})",
                ticket.id,
                ticket.generation,
                self.generation
            );
            group.release();
            self.events.emit(FragmentEvent::LoadDiscarded { ticket: ticket.id });
            return Err(FragmentError::StaleLoad { ticket: ticket.id });
        }

        self.registry.register(group.clone())?;
        log::info!("[Registry] Registered {} '{}'", group.id(), group.name());
        self.events.emit(FragmentEvent::Registered(group.id()));
        Ok(group)
    }

    /// Load, name and register in one step
    pub async fn load_and_register(
        &mut self,
        buffer: impl Into<Arc<[u8]>>,
        name: &str,
    ) -> Result<FragmentGroup> {
        let pending = self.load(buffer).await?;
        pending.group.set_name(name);
        self.register(pending)
    }

    /// Invalidate every load that has not been registered yet
    pub fn cancel_pending(&mut self) {
        self.generation += 1;
    }

    /// Export a registered group
    pub fn export(&self, group: &FragmentGroup) -> Result<ExportArtifact> {
        let artifact = self.exporter.export(&self.registry, group)?;
        self.events.emit(FragmentEvent::Exported {
            group: group.id(),
            bytes: artifact.fragments.len() + artifact.properties.as_ref().map_or(0, Vec::len),
        });
        Ok(artifact)
    }

    /// Rebuild and register a group from an exported fragment stream and
    /// optional JSON property sidecar
    pub fn import(&mut self, fragments: &[u8], properties: Option<&[u8]>) -> Result<FragmentGroup> {
        let group = exporter::import_group(fragments, properties)?;
        self.registry.register(group.clone())?;
        log::info!(
            "[Registry] Imported {} '{}' with {} fragments",
            group.id(),
            group.name(),
            group.element_count()?
        );
        self.events.emit(FragmentEvent::Registered(group.id()));
        Ok(group)
    }

    /// Dispose one registered group
    pub fn dispose(&mut self, id: GroupId) -> Result<()> {
        disposer::dispose_one(&mut self.registry, id)?;
        self.events.emit(FragmentEvent::Disposed(id));
        Ok(())
    }

    /// Dispose every group and invalidate pending loads
    pub fn dispose_all(&mut self) -> usize {
        self.generation += 1;
        let ids = disposer::dispose_all(&mut self.registry);
        for id in &ids {
            self.events.emit(FragmentEvent::Disposed(*id));
        }
        ids.len()
    }
}

impl Drop for FragmentsManager {
    fn drop(&mut self) {
        disposer::dispose_all(&mut self.registry);
    }
}
