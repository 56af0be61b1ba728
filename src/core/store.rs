use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tokio::sync::broadcast;

use super::engine;
use super::error::{PulseError, Result};
use super::event::InteractionEvent;
use super::level::PulseTheme;
use super::pair::{pair_id, PulsePair};

/// SQLite-backed pulse storage with live update notifications.
///
/// Each pair is one row keyed by its commutative `pair_id`. Scoring runs
/// read-modify-write inside a single immediate transaction, so concurrent
/// events for the same pair can never lose an increment.
pub struct PulseStore {
    conn: Connection,
    updates: broadcast::Sender<PulsePair>,
}

/// Aggregate statistics over all stored pairs.
#[derive(Debug, Clone, Serialize)]
pub struct PulseStats {
    pub total_pairs: usize,
    pub active_today: usize,
    pub total_energy: u64,
    pub avg_energy: f64,
    pub highest_peak_level: u32,
    pub longest_streak: u32,
}

/// Live feed of updated snapshots for a single pair.
///
/// Dropping the subscription unsubscribes.
pub struct PulseSubscription {
    pair_id: String,
    rx: broadcast::Receiver<PulsePair>,
}

impl PulseSubscription {
    /// Next updated snapshot for the subscribed pair.
    ///
    /// Returns `None` once the store has gone away. A slow consumer that
    /// falls behind skips missed updates and resumes with newer ones.
    pub async fn recv(&mut self) -> Option<PulsePair> {
        loop {
            match self.rx.recv().await {
                Ok(pair) if pair.pair_id == self.pair_id => return Some(pair),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl PulseStore {
    /// Open (or create) a pulse store at the given database path.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pulse_pairs (
                pair_id TEXT PRIMARY KEY,
                participant_a TEXT NOT NULL,
                participant_b TEXT NOT NULL,
                pulse_energy INTEGER NOT NULL,
                total_energy INTEGER NOT NULL,
                pulse_level INTEGER NOT NULL,
                peak_level INTEGER NOT NULL,
                streak_days INTEGER NOT NULL,
                last_interaction_date TEXT,
                last_interaction_at TEXT,
                pulse_theme TEXT NOT NULL,
                daily_text_count INTEGER NOT NULL,
                recent_timestamps TEXT NOT NULL,
                last_message_hash TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_participant_a ON pulse_pairs(participant_a)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_participant_b ON pulse_pairs(participant_b)",
            [],
        )?;

        let (updates, _) = broadcast::channel(256);

        Ok(Self { conn, updates })
    }

    /// Look up a pair by id, `None` when it has never interacted.
    pub fn find(&self, pair_id: &str) -> Result<Option<PulsePair>> {
        query_pair(&self.conn, pair_id)
    }

    /// Get a pair by id, erroring when absent.
    pub fn get(&self, id: &str) -> Result<PulsePair> {
        self.find(id)?.ok_or_else(|| PulseError::NotFound(id.to_string()))
    }

    /// Fetch the pair for two users, creating the zero state on first use.
    pub fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<PulsePair> {
        let id = pair_id(user_a, user_b);
        if let Some(pair) = query_pair(&self.conn, &id)? {
            return Ok(pair);
        }

        let pair = PulsePair::new(user_a, user_b);
        insert_pair(&self.conn, &pair)?;
        Ok(pair)
    }

    /// Persist an updated pair and notify subscribers.
    pub fn update(&self, pair: &PulsePair) -> Result<()> {
        update_pair(&self.conn, pair)?;
        let _ = self.updates.send(pair.clone());
        Ok(())
    }

    /// Score one interaction between two users and persist the result.
    ///
    /// The read, the engine run and the write happen in one immediate
    /// transaction. On failure the caller may retry the whole call; the
    /// recomputation always starts from a freshly read state.
    pub fn record_interaction(
        &mut self,
        user_a: &str,
        user_b: &str,
        event: &InteractionEvent,
    ) -> Result<(PulsePair, u32)> {
        let id = pair_id(user_a, user_b);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = match query_pair(&tx, &id)? {
            Some(pair) => pair,
            None => {
                let pair = PulsePair::new(user_a, user_b);
                insert_pair(&tx, &pair)?;
                pair
            }
        };

        let (updated, gained) = engine::record_interaction(&current, event);
        update_pair(&tx, &updated)?;
        tx.commit()?;

        let _ = self.updates.send(updated.clone());
        Ok((updated, gained))
    }

    /// All pairs involving a user, strongest pulse first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<PulsePair>> {
        let mut stmt = self.conn.prepare(
            "SELECT pair_id, participant_a, participant_b, pulse_energy, total_energy,
                    pulse_level, peak_level, streak_days, last_interaction_date,
                    last_interaction_at, pulse_theme, daily_text_count,
                    recent_timestamps, last_message_hash
             FROM pulse_pairs
             WHERE participant_a = ?1 OR participant_b = ?1
             ORDER BY total_energy DESC",
        )?;

        let pairs = stmt
            .query_map(params![user_id], row_to_pair)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    /// All stored pairs, strongest pulse first.
    pub fn list_all(&self) -> Result<Vec<PulsePair>> {
        let mut stmt = self.conn.prepare(
            "SELECT pair_id, participant_a, participant_b, pulse_energy, total_energy,
                    pulse_level, peak_level, streak_days, last_interaction_date,
                    last_interaction_at, pulse_theme, daily_text_count,
                    recent_timestamps, last_message_hash
             FROM pulse_pairs
             ORDER BY total_energy DESC",
        )?;

        let pairs = stmt
            .query_map([], row_to_pair)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    /// Aggregate statistics across the whole store.
    pub fn stats(&self) -> Result<PulseStats> {
        let pairs = self.list_all()?;
        let today = Utc::now().date_naive();

        let total_pairs = pairs.len();
        let active_today = pairs
            .iter()
            .filter(|p| p.last_interaction_date == Some(today))
            .count();
        let total_energy: u64 = pairs.iter().map(|p| p.total_energy as u64).sum();
        let avg_energy = if total_pairs > 0 {
            total_energy as f64 / total_pairs as f64
        } else {
            0.0
        };
        let highest_peak_level = pairs.iter().map(|p| p.peak_level).max().unwrap_or(0);
        let longest_streak = pairs.iter().map(|p| p.streak_days).max().unwrap_or(0);

        Ok(PulseStats {
            total_pairs,
            active_today,
            total_energy,
            avg_energy,
            highest_peak_level,
            longest_streak,
        })
    }

    /// Subscribe to updated snapshots of one pair.
    pub fn subscribe(&self, pair_id: &str) -> PulseSubscription {
        PulseSubscription {
            pair_id: pair_id.to_string(),
            rx: self.updates.subscribe(),
        }
    }
}

fn query_pair(conn: &Connection, pair_id: &str) -> Result<Option<PulsePair>> {
    let mut stmt = conn.prepare(
        "SELECT pair_id, participant_a, participant_b, pulse_energy, total_energy,
                pulse_level, peak_level, streak_days, last_interaction_date,
                last_interaction_at, pulse_theme, daily_text_count,
                recent_timestamps, last_message_hash
         FROM pulse_pairs WHERE pair_id = ?1",
    )?;

    let pair = stmt.query_row(params![pair_id], row_to_pair).optional()?;
    Ok(pair)
}

fn insert_pair(conn: &Connection, pair: &PulsePair) -> Result<()> {
    conn.execute(
        "INSERT INTO pulse_pairs (
            pair_id, participant_a, participant_b, pulse_energy, total_energy,
            pulse_level, peak_level, streak_days, last_interaction_date,
            last_interaction_at, pulse_theme, daily_text_count,
            recent_timestamps, last_message_hash
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            &pair.pair_id,
            &pair.participant_a,
            &pair.participant_b,
            pair.pulse_energy,
            pair.total_energy,
            pair.pulse_level,
            pair.peak_level,
            pair.streak_days,
            pair.last_interaction_date.map(|d| d.to_string()),
            pair.last_interaction_at.map(|t| t.to_rfc3339()),
            pair.pulse_theme.to_string(),
            pair.daily_text_count,
            serde_json::to_string(&pair.recent_timestamps)?,
            &pair.last_message_hash,
        ],
    )?;
    Ok(())
}

fn update_pair(conn: &Connection, pair: &PulsePair) -> Result<()> {
    let rows_affected = conn.execute(
        "UPDATE pulse_pairs SET
            pulse_energy = ?1, total_energy = ?2, pulse_level = ?3,
            peak_level = ?4, streak_days = ?5, last_interaction_date = ?6,
            last_interaction_at = ?7, pulse_theme = ?8, daily_text_count = ?9,
            recent_timestamps = ?10, last_message_hash = ?11
         WHERE pair_id = ?12",
        params![
            pair.pulse_energy,
            pair.total_energy,
            pair.pulse_level,
            pair.peak_level,
            pair.streak_days,
            pair.last_interaction_date.map(|d| d.to_string()),
            pair.last_interaction_at.map(|t| t.to_rfc3339()),
            pair.pulse_theme.to_string(),
            pair.daily_text_count,
            serde_json::to_string(&pair.recent_timestamps)?,
            &pair.last_message_hash,
            &pair.pair_id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(PulseError::NotFound(pair.pair_id.clone()));
    }

    Ok(())
}

fn row_to_pair(row: &rusqlite::Row<'_>) -> rusqlite::Result<PulsePair> {
    let last_date: Option<String> = row.get(8)?;
    let last_at: Option<String> = row.get(9)?;
    let theme: String = row.get(10)?;
    let window_json: String = row.get(12)?;

    Ok(PulsePair {
        pair_id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        pulse_energy: row.get(3)?,
        total_energy: row.get(4)?,
        pulse_level: row.get(5)?,
        peak_level: row.get(6)?,
        streak_days: row.get(7)?,
        last_interaction_date: last_date
            .map(|s| {
                s.parse::<NaiveDate>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        8,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?,
        last_interaction_at: last_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            9,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
            })
            .transpose()?,
        pulse_theme: PulseTheme::from_name(&theme).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                10,
                rusqlite::types::Type::Text,
                format!("unknown theme: {}", theme).into(),
            )
        })?,
        daily_text_count: row.get(11)?,
        recent_timestamps: serde_json::from_str(&window_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                12,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        last_message_hash: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::InteractionKind;
    use chrono::Duration;

    fn create_test_store() -> PulseStore {
        PulseStore::new(":memory:".into()).unwrap()
    }

    #[test]
    fn test_get_or_create_is_commutative() {
        let store = create_test_store();

        let first = store.get_or_create("bob", "alice").unwrap();
        let second = store.get_or_create("alice", "bob").unwrap();

        assert_eq!(first.pair_id, second.pair_id);
        assert_eq!(first.participant_a, "alice");
        assert_eq!(first.participant_b, "bob");
    }

    #[test]
    fn test_record_and_get() {
        let mut store = create_test_store();
        let event = InteractionEvent::text("hey", Utc::now());

        let (updated, gained) = store.record_interaction("alice", "bob", &event).unwrap();
        assert_eq!(gained, 1);

        let stored = store.get(&pair_id("alice", "bob")).unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.total_energy, 1);
        assert_eq!(stored.streak_days, 1);
    }

    #[test]
    fn test_get_missing_pair() {
        let store = create_test_store();
        assert!(matches!(
            store.get("alice:bob"),
            Err(PulseError::NotFound(_))
        ));
        assert!(store.find("alice:bob").unwrap().is_none());
    }

    #[test]
    fn test_record_round_trips_all_fields() {
        let mut store = create_test_store();
        let now = Utc::now();

        store
            .record_interaction("alice", "bob", &InteractionEvent::text("hey", now))
            .unwrap();
        let (updated, _) = store
            .record_interaction(
                "alice",
                "bob",
                &InteractionEvent::text("hi!", now + Duration::seconds(30)),
            )
            .unwrap();

        let stored = store.get(&pair_id("alice", "bob")).unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.recent_timestamps.len(), 2);
        assert!(!stored.last_message_hash.is_empty());
        assert_eq!(stored.last_interaction_at, Some(now + Duration::seconds(30)));
    }

    #[test]
    fn test_update_missing_pair() {
        let store = create_test_store();
        let pair = PulsePair::new("alice", "bob");

        assert!(matches!(
            store.update(&pair),
            Err(PulseError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_for_user() {
        let mut store = create_test_store();
        let now = Utc::now();

        store
            .record_interaction("alice", "bob", &InteractionEvent::new(InteractionKind::Image, now))
            .unwrap();
        store
            .record_interaction("alice", "carol", &InteractionEvent::new(InteractionKind::Text, now))
            .unwrap();
        store
            .record_interaction("bob", "carol", &InteractionEvent::new(InteractionKind::Voice, now))
            .unwrap();

        let alice = store.list_for_user("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|p| p.involves("alice")));

        let dave = store.list_for_user("dave").unwrap();
        assert!(dave.is_empty());
    }

    #[test]
    fn test_stats() {
        let mut store = create_test_store();
        let now = Utc::now();

        store
            .record_interaction("alice", "bob", &InteractionEvent::new(InteractionKind::VideoCall, now))
            .unwrap();
        store
            .record_interaction("alice", "carol", &InteractionEvent::text("hey", now))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_pairs, 2);
        assert_eq!(stats.active_today, 2);
        assert_eq!(stats.total_energy, 5);
        assert!((stats.avg_energy - 2.5).abs() < 1e-9);
        assert_eq!(stats.longest_streak, 1);
    }

    #[tokio::test]
    async fn test_subscribe_receives_updates() {
        let mut store = create_test_store();
        let mut sub = store.subscribe(&pair_id("alice", "bob"));
        let now = Utc::now();

        // An update for an unrelated pair is filtered out.
        store
            .record_interaction("bob", "carol", &InteractionEvent::text("noise", now))
            .unwrap();
        let (expected, _) = store
            .record_interaction("alice", "bob", &InteractionEvent::text("hey", now))
            .unwrap();

        let received = sub.recv().await.unwrap();
        assert_eq!(received, expected);
    }
}
