//! Score persistence: Supabase when configured, in-memory otherwise

pub mod memory;
pub mod scores;
pub mod supabase;

pub use memory::MemoryStore;
pub use scores::{
    BestGameRow, LeaderboardRow, PlayerStats, RenameTarget, ScoreRecord, ScoreStore, StoreError, SupabaseScoreStore,
};
pub use supabase::SupabaseClient;
