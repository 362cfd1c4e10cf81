//! Room persistence.
//!
//! Rooms are stored whole, with a revision number. A resolution pass loads a
//! room, works on its own copy and commits with a compare-and-swap on the
//! revision, so two passes over the same room can never both land.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use intrigue_core::{GameState, Signature};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Room {0} is not stored")]
    Missing(String),

    #[error("Room {room} was modified concurrently (expected revision {expected})")]
    Conflict { room: String, expected: u64 },
}

/// A room as loaded from the store
#[derive(Debug, Clone)]
pub struct StoredRoom {
    pub revision: u64,
    pub game: GameState,
}

/// A stored day signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockSnapshot {
    pub round: u32,
    pub signature: Signature,
}

/// Persistence collaborator for rooms and their signature history
pub trait RoomStore: Send + Sync {
    fn load(&self, room: &str) -> Result<Option<StoredRoom>, StoreError>;

    /// Store a new room at revision 0. Fails if the room already exists.
    fn insert(&self, game: GameState) -> Result<StoredRoom, StoreError>;

    /// Replace a room if it is still at `expected`. Returns the new revision,
    /// or `Missing` if the room was never stored.
    fn commit(&self, room: &str, expected: u64, game: GameState) -> Result<u64, StoreError>;

    /// Most recent signatures, oldest first
    fn recent_signatures(&self, room: &str, limit: usize) -> Result<Vec<Signature>, StoreError>;

    fn append_signature(&self, room: &str, snapshot: DeadlockSnapshot) -> Result<(), StoreError>;

    /// Drop the signature history, on game (re)start
    fn purge_signatures(&self, room: &str) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<String, StoredRoom>,
    signatures: DashMap<String, Vec<DeadlockSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn load(&self, room: &str) -> Result<Option<StoredRoom>, StoreError> {
        Ok(self.rooms.get(room).map(|r| r.clone()))
    }

    fn insert(&self, game: GameState) -> Result<StoredRoom, StoreError> {
        match self.rooms.entry(game.room_code.clone()) {
            Entry::Occupied(existing) => Err(StoreError::Conflict {
                room: existing.key().clone(),
                expected: 0,
            }),
            Entry::Vacant(slot) => {
                let stored = StoredRoom { revision: 0, game };
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    fn commit(&self, room: &str, expected: u64, game: GameState) -> Result<u64, StoreError> {
        let mut stored = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| StoreError::Missing(room.to_string()))?;
        if stored.revision != expected {
            return Err(StoreError::Conflict {
                room: room.to_string(),
                expected,
            });
        }
        stored.revision += 1;
        stored.game = game;
        Ok(stored.revision)
    }

    fn recent_signatures(&self, room: &str, limit: usize) -> Result<Vec<Signature>, StoreError> {
        Ok(self
            .signatures
            .get(room)
            .map(|history| {
                let start = history.len().saturating_sub(limit);
                history[start..]
                    .iter()
                    .map(|s| s.signature.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn append_signature(&self, room: &str, snapshot: DeadlockSnapshot) -> Result<(), StoreError> {
        self.signatures
            .entry(room.to_string())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    fn purge_signatures(&self, room: &str) -> Result<(), StoreError> {
        self.signatures.remove(room);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrigue_core::RulesConfig;

    fn game(code: &str) -> GameState {
        GameState::new(code, RulesConfig::default())
    }

    #[test]
    fn test_insert_then_load() {
        let store = MemoryStore::new();
        store.insert(game("ABCD")).unwrap();

        let loaded = store.load("ABCD").unwrap().unwrap();
        assert_eq!(loaded.revision, 0);
        assert_eq!(loaded.game.room_code, "ABCD");
        assert!(store.load("ZZZZ").unwrap().is_none());
    }

    #[test]
    fn test_insert_existing_room_conflicts() {
        let store = MemoryStore::new();
        store.insert(game("ABCD")).unwrap();
        assert!(matches!(
            store.insert(game("ABCD")),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_commit_is_compare_and_swap() {
        let store = MemoryStore::new();
        store.insert(game("ABCD")).unwrap();

        assert_eq!(store.commit("ABCD", 0, game("ABCD")), Ok(1));
        // A second writer that loaded revision 0 loses
        assert_eq!(
            store.commit("ABCD", 0, game("ABCD")),
            Err(StoreError::Conflict {
                room: "ABCD".to_string(),
                expected: 0
            })
        );
        assert_eq!(store.load("ABCD").unwrap().unwrap().revision, 1);
    }

    #[test]
    fn test_commit_to_missing_room() {
        let store = MemoryStore::new();
        assert_eq!(
            store.commit("ZZZZ", 0, game("ZZZZ")),
            Err(StoreError::Missing("ZZZZ".to_string()))
        );
    }

    #[test]
    fn test_recent_signatures_keeps_order_and_limit() {
        let store = MemoryStore::new();
        for (round, raw) in ["a", "b", "c", "d"].into_iter().enumerate() {
            store
                .append_signature(
                    "ABCD",
                    DeadlockSnapshot {
                        round: round as u32 + 1,
                        signature: Signature::from(raw.to_string()),
                    },
                )
                .unwrap();
        }

        let recent = store.recent_signatures("ABCD", 3).unwrap();
        let raw: Vec<&str> = recent.iter().map(|s| s.as_str()).collect();
        assert_eq!(raw, vec!["b", "c", "d"]);

        store.purge_signatures("ABCD").unwrap();
        assert!(store.recent_signatures("ABCD", 3).unwrap().is_empty());
    }
}
