//! In-process score store used when no database is configured

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::scores::{BestGameRow, LeaderboardRow, PlayerStats, RenameTarget, ScoreRecord};

#[derive(Debug, Clone)]
struct StoredScore {
    id: i64,
    record: ScoreRecord,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    scores: Vec<StoredScore>,
}

/// Scores kept in memory for the life of the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: ScoreRecord) -> i64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.scores.push(StoredScore {
            id,
            record,
            created_at: Utc::now(),
        });
        id
    }

    pub fn leaderboard(&self, limit: usize, since: Option<DateTime<Utc>>) -> Vec<LeaderboardRow> {
        let inner = self.inner.lock();

        let mut groups: HashMap<&str, LeaderboardRow> = HashMap::new();
        for score in inner
            .scores
            .iter()
            .filter(|s| since.map_or(true, |t| s.created_at >= t))
        {
            let r = &score.record;
            let row = groups.entry(r.username.as_str()).or_insert_with(|| LeaderboardRow {
                username: r.username.clone(),
                best_xp: 0,
                total_xp: 0,
                games: 0,
                total_kills: 0,
                wins: 0,
                avg_xp: 0,
            });
            row.best_xp = row.best_xp.max(r.xp as u64);
            row.total_xp += r.xp as u64;
            row.games += 1;
            row.total_kills += r.kills as u64;
            row.wins += r.won as u64;
        }

        let mut rows: Vec<LeaderboardRow> = groups
            .into_values()
            .map(|mut row| {
                row.avg_xp = (row.total_xp as f64 / row.games as f64).round() as u64;
                row
            })
            .collect();
        rows.sort_by(|a, b| b.total_xp.cmp(&a.total_xp).then_with(|| a.username.cmp(&b.username)));
        rows.truncate(limit);
        rows
    }

    pub fn best_games(&self, limit: usize) -> Vec<BestGameRow> {
        let inner = self.inner.lock();
        let mut scores: Vec<&StoredScore> = inner.scores.iter().collect();
        scores.sort_by(|a, b| b.record.xp.cmp(&a.record.xp).then_with(|| a.id.cmp(&b.id)));

        scores
            .into_iter()
            .take(limit)
            .map(|s| BestGameRow {
                username: s.record.username.clone(),
                xp: s.record.xp,
                kills: s.record.kills,
                hits: s.record.hits,
                placement: s.record.placement,
                won: s.record.won,
                game_time: s.record.game_time,
                created_at: s.created_at,
            })
            .collect()
    }

    pub fn player_stats(&self, username: &str) -> Option<PlayerStats> {
        let inner = self.inner.lock();
        let games: Vec<&ScoreRecord> = inner
            .scores
            .iter()
            .map(|s| &s.record)
            .filter(|r| r.username == username)
            .collect();

        if games.is_empty() {
            return None;
        }

        let count = games.len() as u64;
        Some(PlayerStats {
            username: username.to_string(),
            games: count,
            total_xp: games.iter().map(|r| r.xp as u64).sum(),
            best_xp: games.iter().map(|r| r.xp as u64).max().unwrap_or(0),
            total_kills: games.iter().map(|r| r.kills as u64).sum(),
            wins: games.iter().filter(|r| r.won).count() as u64,
            avg_placement: games.iter().map(|r| r.placement as f64).sum::<f64>() / count as f64,
        })
    }

    pub fn rename(&self, target: &RenameTarget, new_name: &str) -> u64 {
        let mut inner = self.inner.lock();
        let mut updated = 0;
        for score in inner.scores.iter_mut() {
            let hit = match target {
                RenameTarget::PlayerId(id) => &score.record.player_id == id,
                RenameTarget::OldName(name) => &score.record.username == name,
            };
            if hit {
                score.record.username = new_name.to_string();
                updated += 1;
            }
        }
        updated
    }
}
