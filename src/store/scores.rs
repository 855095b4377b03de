//! Score persistence and leaderboard queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::memory::MemoryStore;
use super::supabase::{SupabaseClient, SupabaseError};

pub const MAX_NAME_LEN: usize = 20;
pub const MAX_PLAYER_ID_LEN: usize = 50;
pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

const SCORES_TABLE: &str = "scores";

/// Truncate to [`MAX_NAME_LEN`] characters and strip markup-significant characters
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .take(MAX_NAME_LEN)
        .filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\''))
        .collect()
}

pub fn truncate_player_id(raw: &str) -> String {
    raw.chars().take(MAX_PLAYER_ID_LEN).collect()
}

/// Missing or zero falls back to the default; everything else lands in 1..=50
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_LIMIT,
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as usize,
    }
}

/// One player's result from one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub username: String,
    pub player_id: String,
    pub xp: u32,
    pub kills: u32,
    pub hits: u32,
    pub torpedoes_fired: u32,
    pub placement: u32,
    pub won: bool,
    /// Seconds
    pub game_time: f32,
}

impl ScoreRecord {
    /// Normalize identity fields the way the store expects them
    pub fn sanitized(mut self) -> Self {
        self.username = sanitize_name(&self.username);
        self.player_id = truncate_player_id(&self.player_id);
        self
    }
}

/// Per-username aggregate, ordered by total xp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub username: String,
    pub best_xp: u64,
    pub total_xp: u64,
    pub games: u64,
    pub total_kills: u64,
    pub wins: u64,
    pub avg_xp: u64,
}

/// A single stored game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestGameRow {
    pub username: String,
    pub xp: u32,
    pub kills: u32,
    pub hits: u32,
    pub placement: u32,
    pub won: bool,
    pub game_time: f32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub username: String,
    pub games: u64,
    pub total_xp: u64,
    pub best_xp: u64,
    pub total_kills: u64,
    pub wins: u64,
    pub avg_placement: f64,
}

/// Which stored rows a rename applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameTarget {
    PlayerId(String),
    OldName(String),
}

impl RenameTarget {
    /// Prefer the external id; fall back to the previous name
    pub fn from_request(player_id: Option<&str>, old_name: Option<&str>) -> Result<Self, StoreError> {
        match (player_id.filter(|s| !s.is_empty()), old_name.filter(|s| !s.is_empty())) {
            (Some(id), _) => Ok(Self::PlayerId(truncate_player_id(id))),
            (None, Some(name)) => Ok(Self::OldName(name.chars().take(MAX_NAME_LEN).collect())),
            (None, None) => Err(StoreError::MissingIdentity),
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid name")]
    InvalidName,

    #[error("Need playerId or oldName")]
    MissingIdentity,

    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),
}

#[derive(Debug, Deserialize)]
struct InsertedId {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TouchedRow {}

/// Score store backed by the Supabase `scores` table and two SQL functions
/// (`score_leaderboard`, `player_score_stats`) for the aggregates
#[derive(Clone)]
pub struct SupabaseScoreStore {
    client: SupabaseClient,
}

impl SupabaseScoreStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn record(&self, record: &ScoreRecord) -> Result<i64, StoreError> {
        let row: InsertedId = self.client.insert(SCORES_TABLE, record).await?;
        Ok(row.id)
    }

    async fn leaderboard(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<LeaderboardRow>, StoreError> {
        let args = json!({ "limit_count": limit, "since": since });
        Ok(self.client.rpc("score_leaderboard", &args).await?)
    }

    async fn best_games(&self, limit: usize) -> Result<Vec<BestGameRow>, StoreError> {
        let query = [
            ("select", "username,xp,kills,hits,placement,won,game_time,created_at".to_string()),
            ("order", "xp.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        Ok(self.client.get(SCORES_TABLE, &query).await?)
    }

    async fn player_stats(&self, username: &str) -> Result<Option<PlayerStats>, StoreError> {
        let args = json!({ "name": username });
        let rows: Vec<PlayerStats> = self.client.rpc("player_score_stats", &args).await?;
        Ok(rows.into_iter().find(|r| r.games > 0))
    }

    async fn rename(&self, target: &RenameTarget, new_name: &str) -> Result<u64, StoreError> {
        let query = match target {
            RenameTarget::PlayerId(id) => [("player_id", format!("eq.{id}")), ("select", "id".to_string())],
            RenameTarget::OldName(name) => [("username", format!("eq.{name}")), ("select", "id".to_string())],
        };
        let touched: Vec<TouchedRow> = self
            .client
            .update(SCORES_TABLE, &query, &json!({ "username": new_name }))
            .await?;
        Ok(touched.len() as u64)
    }
}

/// Score store selected at startup
#[derive(Clone)]
pub enum ScoreStore {
    Memory(MemoryStore),
    Supabase(SupabaseScoreStore),
}

impl ScoreStore {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Supabase(_) => "supabase",
        }
    }

    /// Persist one result; returns the stored row id
    pub async fn record(&self, record: ScoreRecord) -> Result<i64, StoreError> {
        let record = record.sanitized();
        if record.username.is_empty() {
            return Err(StoreError::InvalidName);
        }
        match self {
            Self::Memory(store) => Ok(store.record(record)),
            Self::Supabase(store) => store.record(&record).await,
        }
    }

    /// All-time ranking by total xp
    pub async fn leaderboard(&self, limit: Option<i64>) -> Result<Vec<LeaderboardRow>, StoreError> {
        let limit = clamp_limit(limit);
        match self {
            Self::Memory(store) => Ok(store.leaderboard(limit, None)),
            Self::Supabase(store) => store.leaderboard(limit, None).await,
        }
    }

    /// Ranking restricted to games stored since UTC midnight
    pub async fn leaderboard_today(&self, limit: Option<i64>) -> Result<Vec<LeaderboardRow>, StoreError> {
        let limit = clamp_limit(limit);
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc());
        match self {
            Self::Memory(store) => Ok(store.leaderboard(limit, midnight)),
            Self::Supabase(store) => store.leaderboard(limit, midnight).await,
        }
    }

    /// Highest single-game xp
    pub async fn best_games(&self, limit: Option<i64>) -> Result<Vec<BestGameRow>, StoreError> {
        let limit = clamp_limit(limit);
        match self {
            Self::Memory(store) => Ok(store.best_games(limit)),
            Self::Supabase(store) => store.best_games(limit).await,
        }
    }

    pub async fn player_stats(&self, username: &str) -> Result<Option<PlayerStats>, StoreError> {
        let username: String = username.chars().take(MAX_NAME_LEN).collect();
        match self {
            Self::Memory(store) => Ok(store.player_stats(&username)),
            Self::Supabase(store) => store.player_stats(&username).await,
        }
    }

    /// Rewrite the username on every matching stored game; returns the row count
    pub async fn rename(&self, target: RenameTarget, new_name: &str) -> Result<u64, StoreError> {
        let new_name = sanitize_name(new_name);
        if new_name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        match self {
            Self::Memory(store) => Ok(store.rename(&target, &new_name)),
            Self::Supabase(store) => store.rename(&target, &new_name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn record(name: &str, id: &str, xp: u32, won: bool) -> ScoreRecord {
        ScoreRecord {
            username: name.to_string(),
            player_id: id.to_string(),
            xp,
            kills: 1,
            hits: 4,
            torpedoes_fired: 0,
            placement: if won { 1 } else { 5 },
            won,
            game_time: 120.0,
        }
    }

    fn memory() -> ScoreStore {
        ScoreStore::Memory(MemoryStore::new())
    }

    #[test]
    fn names_are_truncated_then_stripped() {
        assert_eq!(sanitize_name("<b>Captain</b>"), "bCaptain/b");
        assert_eq!(sanitize_name("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmnopqrst");
        assert_eq!(sanitize_name("O'Malley & \"Sons\""), "OMalley  Sons");
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(500)), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(-3)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
    }

    #[test]
    fn rename_target_prefers_player_id() {
        assert_eq!(
            RenameTarget::from_request(Some("abc"), Some("old")).unwrap(),
            RenameTarget::PlayerId("abc".into())
        );
        assert_eq!(
            RenameTarget::from_request(Some(""), Some("old")).unwrap(),
            RenameTarget::OldName("old".into())
        );
        assert!(matches!(
            RenameTarget::from_request(None, None),
            Err(StoreError::MissingIdentity)
        ));
    }

    #[tokio::test]
    async fn leaderboard_aggregates_per_username() {
        let store = memory();
        assert_ok!(store.record(record("ahab", "p1", 300, true)).await);
        assert_ok!(store.record(record("ahab", "p1", 100, false)).await);
        assert_ok!(store.record(record("nemo", "p2", 350, true)).await);

        let rows = store.leaderboard(None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "ahab");
        assert_eq!(rows[0].total_xp, 400);
        assert_eq!(rows[0].best_xp, 300);
        assert_eq!(rows[0].games, 2);
        assert_eq!(rows[0].wins, 1);
        assert_eq!(rows[0].avg_xp, 200);
        assert_eq!(rows[1].username, "nemo");

        let today = store.leaderboard_today(Some(1)).await.unwrap();
        assert_eq!(today.len(), 1);

        let best = store.best_games(None).await.unwrap();
        assert_eq!(best[0].xp, 350);
    }

    #[tokio::test]
    async fn rename_by_player_id_rewrites_history() {
        let store = memory();
        assert_ok!(store.record(record("old", "p1", 10, false)).await);
        assert_ok!(store.record(record("old", "p1", 20, false)).await);
        assert_ok!(store.record(record("old", "p9", 30, false)).await);

        let updated = store.rename(RenameTarget::PlayerId("p1".into()), "new").await.unwrap();
        assert_eq!(updated, 2);

        let stats = store.player_stats("new").await.unwrap().unwrap();
        assert_eq!(stats.games, 2);
        assert_eq!(stats.total_xp, 30);

        let updated = store.rename(RenameTarget::OldName("old".into()), "other").await.unwrap();
        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let store = memory();
        assert_err!(store.record(record("<>", "", 10, false)).await);
        assert!(matches!(
            store.rename(RenameTarget::OldName("x".into()), "'\"").await,
            Err(StoreError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn unknown_player_has_no_stats() {
        let store = memory();
        assert!(store.player_stats("ghost").await.unwrap().is_none());
    }
}
