// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle notifications for scene attachment and UI

use crate::group::GroupId;
use tokio::sync::broadcast;

/// Something happened to a load or a group
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentEvent {
    /// A parse started under this ticket
    LoadStarted { ticket: u64 },
    /// Parser phase update, percent in 0..=100
    LoadProgress {
        ticket: u64,
        phase: String,
        percent: f32,
    },
    /// A parse finished and produced a group (not yet registered)
    LoadFinished {
        ticket: u64,
        group: GroupId,
        elements: usize,
    },
    LoadFailed { ticket: u64, message: String },
    /// A finished load arrived after being invalidated and was dropped
    LoadDiscarded { ticket: u64 },
    Registered(GroupId),
    Exported { group: GroupId, bytes: usize },
    Disposed(GroupId),
}

/// Broadcast side of the event channel
///
/// Sending never fails; events without subscribers are dropped.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<FragmentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FragmentEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: FragmentEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }
}
