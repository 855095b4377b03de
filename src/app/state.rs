//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{MatchRegistry, Obstacles};
use crate::matchmaking::MatchmakingService;
use crate::store::{MemoryStore, ScoreStore, SupabaseClient, SupabaseScoreStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ScoreStore,
    pub matchmaking: Arc<MatchmakingService>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config, obstacles: Obstacles) -> Self {
        let config = Arc::new(config);

        // Supabase when configured, in-process otherwise
        let store = match &config.supabase {
            Some(supabase) => ScoreStore::Supabase(SupabaseScoreStore::new(SupabaseClient::new(
                &supabase.url,
                &supabase.service_role_key,
            ))),
            None => ScoreStore::Memory(MemoryStore::new()),
        };

        let match_registry = Arc::new(MatchRegistry::new());

        // Arc for sharing across cloned AppState
        let matchmaking = Arc::new(MatchmakingService::new(
            match_registry.clone(),
            obstacles,
            store.clone(),
        ));

        Self {
            config,
            store,
            matchmaking,
            match_registry,
        }
    }
}
