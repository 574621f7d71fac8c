//! Change notifications for live collaborators.
//!
//! The graph emits events and moves on: delivery is never awaited and a
//! channel without listeners drops events silently. Events carrying
//! annotation deltas are numbered per room so receivers can apply them in
//! order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::annotation::{AnnotationDelta, SocketUser};
use crate::config::BroadcastConfig;
use crate::model::{ObjectId, TargetOwner};
use crate::storage::Collection;

/// Something collaborators may want to know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RepositoryEvent {
    /// An annotation list changed.
    Annotation {
        owner: TargetOwner,
        room: Option<String>,
        sequence: u64,
        delta: AnnotationDelta,
    },
    /// A whitelist was edited.
    WhitelistChanged { collection: Collection, id: ObjectId },
    UserJoined { room: String, user: SocketUser },
    UserLeft { room: String, socket_id: String },
    /// A user moved rooms, taking the annotations they display along.
    RoomChanged {
        socket_id: String,
        from: Option<String>,
        to: String,
        annotations: Vec<ObjectId>,
    },
}

impl RepositoryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryEvent::Annotation { .. } => "annotation",
            RepositoryEvent::WhitelistChanged { .. } => "whitelist_changed",
            RepositoryEvent::UserJoined { .. } => "user_joined",
            RepositoryEvent::UserLeft { .. } => "user_left",
            RepositoryEvent::RoomChanged { .. } => "room_changed",
        }
    }
}

/// Fire-and-forget event sink.
pub trait BroadcastChannel: Send + Sync {
    fn emit(&self, event: RepositoryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcast;

impl BroadcastChannel for NullBroadcast {
    fn emit(&self, _event: RepositoryEvent) {}
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct TokioBroadcast {
    sender: broadcast::Sender<RepositoryEvent>,
}

impl TokioBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl BroadcastChannel for TokioBroadcast {
    fn emit(&self, event: RepositoryEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => debug!("Broadcast {} event to {} receivers", kind, receivers),
            Err(_) => debug!("Dropped {} event: no receivers", kind),
        }
    }
}

impl<T: BroadcastChannel + ?Sized> BroadcastChannel for Arc<T> {
    fn emit(&self, event: RepositoryEvent) {
        (**self).emit(event)
    }
}

/// Announce a whitelist edit if one happened.
pub fn whitelist_changed(
    channel: &dyn BroadcastChannel,
    changed: bool,
    collection: Collection,
    id: &ObjectId,
) -> bool {
    if changed {
        channel.emit(RepositoryEvent::WhitelistChanged {
            collection,
            id: id.clone(),
        });
    }
    changed
}
