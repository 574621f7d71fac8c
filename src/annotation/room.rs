//! Live-collaboration rooms.
//!
//! Every connected user sits in one room, usually named after the entity or
//! compilation being viewed, and displays a set of annotations there. The
//! registry only tracks which annotation ids are displayed where; it never
//! sees or changes stored rankings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AnnotationDelta;
use crate::broadcast::{BroadcastChannel, RepositoryEvent};
use crate::model::{ObjectId, TargetOwner};

/// A connected collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketUser {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub socket_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub room: String,
}

impl SocketUser {
    pub fn new(id: impl Into<ObjectId>, socket_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            socket_id: socket_id.into(),
            username: String::new(),
            fullname: String::new(),
            room: String::new(),
        }
    }
}

/// Result of moving a user between rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChange {
    pub from: Option<String>,
    pub to: String,
    /// Annotations the user now displays in `to`.
    pub annotations: Vec<ObjectId>,
}

#[derive(Debug)]
struct Member {
    user: SocketUser,
    annotations: BTreeSet<ObjectId>,
}

#[derive(Debug, Default)]
struct Room {
    members: BTreeMap<String, Member>,
    sequence: u64,
}

#[derive(Debug, Default)]
struct RoomState {
    rooms: BTreeMap<String, Room>,
    locations: HashMap<String, String>,
}

impl RoomState {
    /// Take a user out of their room, dropping the room once it is empty.
    fn remove(&mut self, socket_id: &str) -> Option<(String, Member)> {
        let room_name = self.locations.remove(socket_id)?;
        let room = self.rooms.get_mut(&room_name)?;
        let member = room.members.remove(socket_id)?;
        if room.members.is_empty() {
            self.rooms.remove(&room_name);
        }
        Some((room_name, member))
    }

    /// Seat a user in `to`, returning the change and the events it causes.
    fn place(
        &mut self,
        mut user: SocketUser,
        socket_id: &str,
        from: Option<String>,
        to: String,
        annotations: Vec<ObjectId>,
    ) -> (RoomChange, Vec<RepositoryEvent>) {
        let mut events = Vec::new();
        if let Some(from) = &from {
            events.push(RepositoryEvent::UserLeft {
                room: from.clone(),
                socket_id: socket_id.to_string(),
            });
        }

        user.room = to.clone();
        let displayed: BTreeSet<ObjectId> = annotations.into_iter().collect();
        let change = RoomChange {
            from,
            to: to.clone(),
            annotations: displayed.iter().cloned().collect(),
        };
        events.push(RepositoryEvent::UserJoined {
            room: to.clone(),
            user: user.clone(),
        });

        self.locations.insert(socket_id.to_string(), to.clone());
        self.rooms.entry(to).or_default().members.insert(
            socket_id.to_string(),
            Member {
                user,
                annotations: displayed,
            },
        );
        (change, events)
    }
}

/// Tracks users and displayed annotations per room.
pub struct RoomRegistry {
    state: Mutex<RoomState>,
    channel: Arc<dyn BroadcastChannel>,
}

impl RoomRegistry {
    pub fn new(channel: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            state: Mutex::new(RoomState::default()),
            channel,
        }
    }

    /// Put a user into the room named in `user.room`.
    pub fn join(&self, user: SocketUser, annotations: Vec<ObjectId>) -> RoomChange {
        let socket_id = user.socket_id.clone();
        let (change, events) = {
            let mut state = self.state.lock();
            let from = state.remove(&socket_id).map(|(room, _)| room);
            let to = user.room.clone();
            state.place(user, &socket_id, from, to, annotations)
        };
        self.announce(&socket_id, change, events)
    }

    /// Move a user to `new_room`. The annotations they displayed leave the
    /// old room and `annotations` are displayed in the new one.
    ///
    /// Returns `None` when the socket is unknown.
    pub fn change_room(
        &self,
        socket_id: &str,
        new_room: impl Into<String>,
        annotations: Vec<ObjectId>,
    ) -> Option<RoomChange> {
        let (change, events) = {
            let mut state = self.state.lock();
            let (from, member) = state.remove(socket_id)?;
            state.place(member.user, socket_id, Some(from), new_room.into(), annotations)
        };
        Some(self.announce(socket_id, change, events))
    }

    fn announce(
        &self,
        socket_id: &str,
        change: RoomChange,
        mut events: Vec<RepositoryEvent>,
    ) -> RoomChange {
        info!(
            "Socket {} moved from {} to {}",
            socket_id,
            change.from.as_deref().unwrap_or("-"),
            change.to
        );
        if change.from.is_some() {
            events.push(RepositoryEvent::RoomChanged {
                socket_id: socket_id.to_string(),
                from: change.from.clone(),
                to: change.to.clone(),
                annotations: change.annotations.clone(),
            });
        }
        for event in events {
            self.channel.emit(event);
        }
        change
    }

    /// Remove a user. Returns the room they were in and the annotations they
    /// displayed there.
    pub fn leave(&self, socket_id: &str) -> Option<(String, Vec<ObjectId>)> {
        let (room, member) = self.state.lock().remove(socket_id)?;
        self.channel.emit(RepositoryEvent::UserLeft {
            room: room.clone(),
            socket_id: socket_id.to_string(),
        });
        Some((room, member.annotations.into_iter().collect()))
    }

    /// Current room of a socket.
    pub fn room_of(&self, socket_id: &str) -> Option<String> {
        self.state.lock().locations.get(socket_id).cloned()
    }

    /// Users in a room, by socket id.
    pub fn members(&self, room: &str) -> Vec<SocketUser> {
        self.state
            .lock()
            .rooms
            .get(room)
            .map(|r| r.members.values().map(|m| m.user.clone()).collect())
            .unwrap_or_default()
    }

    /// All annotation ids displayed in a room.
    pub fn displayed(&self, room: &str) -> BTreeSet<ObjectId> {
        self.state
            .lock()
            .rooms
            .get(room)
            .map(|r| {
                r.members
                    .values()
                    .flat_map(|m| m.annotations.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sequence and broadcast a delta made by `socket_id` to the room it
    /// sits in. Returns the sequence number, 0 when the socket is in no room.
    pub fn publish(&self, socket_id: &str, owner: TargetOwner, delta: AnnotationDelta) -> u64 {
        let (room, sequence) = {
            let mut state = self.state.lock();
            let room = state.locations.get(socket_id).cloned();
            let sequence = match room.as_ref().and_then(|r| state.rooms.get_mut(r)) {
                Some(room) => {
                    room.sequence += 1;
                    if let Some(member) = room.members.get_mut(socket_id) {
                        track_display(&mut member.annotations, &delta);
                    }
                    room.sequence
                }
                None => 0,
            };
            (room, sequence)
        };

        debug!(
            "Delta {} on {} from {} sequenced as {}",
            delta.annotation_id(),
            owner.id(),
            socket_id,
            sequence
        );
        self.channel.emit(RepositoryEvent::Annotation {
            owner,
            room,
            sequence,
            delta,
        });
        sequence
    }
}

fn track_display(displayed: &mut BTreeSet<ObjectId>, delta: &AnnotationDelta) {
    match delta {
        AnnotationDelta::Attach { annotation } => {
            displayed.insert(annotation.id.clone());
        }
        AnnotationDelta::Detach { id } => {
            displayed.remove(id);
        }
        AnnotationDelta::Reorder { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationList;
    use crate::broadcast::TokioBroadcast;
    use crate::model::{Agent, Annotation};

    fn user(id: &str, socket: &str, room: &str) -> SocketUser {
        SocketUser {
            room: room.to_string(),
            ..SocketUser::new(id, socket)
        }
    }

    fn ids(raw: &[&str]) -> Vec<ObjectId> {
        raw.iter().map(|id| ObjectId::new(*id)).collect()
    }

    #[test]
    fn test_change_room_moves_annotations() {
        let channel = Arc::new(TokioBroadcast::new(16));
        let registry = RoomRegistry::new(channel.clone());

        registry.join(user("u1", "s1", "e1"), ids(&["a1", "a2"]));
        registry.join(user("u2", "s2", "e1"), ids(&["a3"]));
        assert_eq!(registry.displayed("e1").len(), 3);

        let mut rx = channel.subscribe();
        let change = registry.change_room("s1", "e2", ids(&["a1"])).unwrap();
        assert_eq!(change.from.as_deref(), Some("e1"));
        assert_eq!(change.to, "e2");

        assert_eq!(registry.displayed("e1"), ids(&["a3"]).into_iter().collect());
        assert_eq!(registry.displayed("e2"), ids(&["a1"]).into_iter().collect());
        assert_eq!(registry.room_of("s1").as_deref(), Some("e2"));
        assert_eq!(registry.members("e2")[0].room, "e2");

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec!["user_left", "user_joined", "room_changed"]);

        assert!(registry.change_room("unknown", "e3", vec![]).is_none());
    }

    #[test]
    fn test_change_room_racing_leave_never_readds() {
        let registry = RoomRegistry::new(Arc::new(crate::broadcast::NullBroadcast));
        for _ in 0..200 {
            registry.join(user("u1", "s1", "e1"), ids(&["a1"]));
            std::thread::scope(|scope| {
                scope.spawn(|| registry.change_room("s1", "e2", ids(&["a1"])));
                scope.spawn(|| registry.leave("s1"));
            });
            // Whichever ran first, the departed socket is gone.
            assert_eq!(registry.room_of("s1"), None);
            assert!(registry.members("e1").is_empty());
            assert!(registry.members("e2").is_empty());
        }
    }

    #[test]
    fn test_leave_drops_empty_rooms() {
        let registry = RoomRegistry::new(Arc::new(crate::broadcast::NullBroadcast));
        registry.join(user("u1", "s1", "e1"), ids(&["a1"]));

        let (room, annotations) = registry.leave("s1").unwrap();
        assert_eq!(room, "e1");
        assert_eq!(annotations, ids(&["a1"]));
        assert!(registry.members("e1").is_empty());
        assert!(registry.leave("s1").is_none());
    }

    #[test]
    fn test_room_moves_never_touch_ranking() {
        let registry = RoomRegistry::new(Arc::new(crate::broadcast::NullBroadcast));
        let owner = TargetOwner::Entity(ObjectId::new("e1"));
        let mut list = AnnotationList::new(owner.clone());
        for (id, rank) in [("a1", 0), ("a2", 1)] {
            list.attach(Annotation::new(id, rank, Agent::person("u1", "alice"), owner.clone()))
                .unwrap();
        }
        let before = list.rankings();

        registry.join(user("u1", "s1", "e1"), list.ids());
        registry.change_room("s1", "e2", list.ids());
        assert_eq!(list.rankings(), before);
    }

    #[tokio::test]
    async fn test_publish_sequences_per_room() {
        let channel = Arc::new(TokioBroadcast::new(16));
        let registry = RoomRegistry::new(channel.clone());
        registry.join(user("u1", "s1", "e1"), vec![]);
        registry.join(user("u2", "s2", "e1"), vec![]);
        registry.join(user("u3", "s3", "c1"), vec![]);

        let mut rx = channel.subscribe();
        let owner = TargetOwner::Entity(ObjectId::new("e1"));
        let reorder = |id: &str| AnnotationDelta::Reorder {
            id: ObjectId::new(id),
            from: 0,
            to: 1,
        };
        assert_eq!(registry.publish("s1", owner.clone(), reorder("a1")), 1);
        assert_eq!(registry.publish("s2", owner.clone(), reorder("a2")), 2);
        assert_eq!(registry.publish("s3", owner.clone(), reorder("a3")), 1);
        assert_eq!(registry.publish("nobody", owner, reorder("a4")), 0);

        let RepositoryEvent::Annotation { room, sequence, .. } = rx.recv().await.unwrap() else {
            panic!("expected an annotation event");
        };
        assert_eq!(room.as_deref(), Some("e1"));
        assert_eq!(sequence, 1);
    }

    #[test]
    fn test_publish_tracks_display() {
        let registry = RoomRegistry::new(Arc::new(crate::broadcast::NullBroadcast));
        registry.join(user("u1", "s1", "e1"), vec![]);
        let owner = TargetOwner::Entity(ObjectId::new("e1"));
        let annotation = Annotation::new("a1", 0, Agent::person("u1", "alice"), owner.clone());

        registry.publish(
            "s1",
            owner.clone(),
            AnnotationDelta::Attach {
                annotation: Box::new(annotation),
            },
        );
        assert!(registry.displayed("e1").contains(&ObjectId::new("a1")));

        registry.publish("s1", owner, AnnotationDelta::Detach { id: ObjectId::new("a1") });
        assert!(registry.displayed("e1").is_empty());
    }
}
