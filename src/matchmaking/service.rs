//! Matchmaking service - seats connections in waiting matches

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::{GameMatch, MatchCommand, MatchHandle, MatchRegistry, Obstacles, Outbox};
use crate::store::ScoreStore;

/// Where a connection ended up
#[derive(Clone)]
pub struct Seat {
    pub handle: MatchHandle,
    pub slot: u8,
}

/// Matchmaking service
pub struct MatchmakingService {
    registry: Arc<MatchRegistry>,
    obstacles: Obstacles,
    store: ScoreStore,
    /// Serializes joins so two connections never race for the last slot
    join_lock: Mutex<()>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, obstacles: Obstacles, store: ScoreStore) -> Self {
        Self {
            registry,
            obstacles,
            store,
            join_lock: Mutex::new(()),
        }
    }

    /// Join the first waiting match with a free seat, or open a new one
    pub async fn join(&self, conn_id: Uuid, name: &str, external_id: Option<&str>, outbox: Outbox) -> Option<Seat> {
        let _guard = self.join_lock.lock().await;

        for handle in self.registry.joinable() {
            if let Some(slot) = Self::request_seat(&handle, conn_id, name, external_id, outbox.clone()).await {
                return Some(Seat { handle, slot });
            }
        }

        let handle = self.create_match();
        let slot = Self::request_seat(&handle, conn_id, name, external_id, outbox).await?;
        Some(Seat { handle, slot })
    }

    async fn request_seat(
        handle: &MatchHandle,
        conn_id: Uuid,
        name: &str,
        external_id: Option<&str>,
        outbox: Outbox,
    ) -> Option<u8> {
        let (reply, answer) = oneshot::channel();
        let sent = handle.send(MatchCommand::Join {
            conn_id,
            name: name.to_string(),
            external_id: external_id.map(str::to_string),
            outbox,
            reply,
        });
        if !sent {
            return None;
        }

        match answer.await {
            Ok(Ok(slot)) => Some(slot),
            Ok(Err(reason)) => {
                debug!(match_id = %handle.id, %conn_id, reason = %reason, "Seat request declined");
                None
            }
            Err(_) => None,
        }
    }

    fn create_match(&self) -> MatchHandle {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (game_match, handle) = GameMatch::new(
            match_id,
            seed,
            self.obstacles.clone(),
            self.registry.clone(),
            self.store.clone(),
        );
        self.registry.insert(handle.clone());
        tokio::spawn(game_match.run());

        info!(match_id = %match_id, active_matches = self.registry.active_matches(), "Created new match");
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::{default_obstacles, MAX_SLOTS};
    use crate::game::r#match::MatchPhase;
    use crate::store::MemoryStore;
    use tokio::sync::mpsc;

    fn service() -> (Arc<MatchRegistry>, MatchmakingService) {
        let registry = Arc::new(MatchRegistry::new());
        let service = MatchmakingService::new(
            registry.clone(),
            default_obstacles(),
            ScoreStore::Memory(MemoryStore::new()),
        );
        (registry, service)
    }

    #[tokio::test(start_paused = true)]
    async fn players_share_a_waiting_match() {
        let (registry, service) = service();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();

        let a = service.join(Uuid::new_v4(), "Ahab", None, tx_a).await.unwrap();
        let b = service.join(Uuid::new_v4(), "Nemo", None, tx_b).await.unwrap();

        assert_eq!(a.handle.id, b.handle.id);
        assert_ne!(a.slot, b.slot);
        assert_eq!(registry.active_matches(), 1);
        assert_eq!(registry.total_players(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_match_spills_into_a_new_one() {
        let (registry, service) = service();
        let mut inboxes = Vec::new();
        let mut first = None;
        for i in 0..MAX_SLOTS {
            let (tx, rx) = mpsc::unbounded_channel();
            inboxes.push(rx);
            let seat = service.join(Uuid::new_v4(), &format!("p{i}"), None, tx).await.unwrap();
            first.get_or_insert(seat.handle.id);
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        let late = service.join(Uuid::new_v4(), "late", None, tx).await.unwrap();
        assert_ne!(Some(late.handle.id), first);
        assert_eq!(late.handle.phase(), MatchPhase::Waiting);
        assert_eq!(registry.active_matches(), 2);
    }
}
