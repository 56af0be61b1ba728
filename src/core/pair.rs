use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::level::PulseTheme;

/// Aggregate engagement state for one pair of users.
///
/// This is the only persistent entity. It is mutated exclusively through
/// the engine's `record_interaction` and never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulsePair {
    /// Commutative identifier derived from the two participants.
    pub pair_id: String,

    /// The two user identifiers, stored in sorted order.
    pub participant_a: String,
    pub participant_b: String,

    /// Energy earned today; reset to 0 on day rollover.
    pub pulse_energy: u32,

    /// Lifetime accumulated energy; only decay ever reduces it.
    pub total_energy: u32,

    /// `floor(sqrt(total_energy / 50))`, recomputed on every update.
    pub pulse_level: u32,

    /// Highest pulse level ever observed; never reduced by decay.
    pub peak_level: u32,

    /// Consecutive UTC calendar days with an energy-earning interaction.
    pub streak_days: u32,

    /// Date of the most recent processed interaction.
    pub last_interaction_date: Option<NaiveDate>,

    /// Instant of the most recent processed interaction, used only for
    /// the quick-reply bonus.
    pub last_interaction_at: Option<DateTime<Utc>>,

    /// Cosmetic theme derived from the level table.
    pub pulse_theme: PulseTheme,

    /// Text interactions counted toward energy today.
    pub daily_text_count: u32,

    /// Sliding window of recent interaction instants, max 10 entries.
    pub recent_timestamps: Vec<DateTime<Utc>>,

    /// Fingerprint of the most recent text content, empty when unset.
    pub last_message_hash: String,
}

/// Deterministic identifier for an unordered pair of users.
///
/// Sorting before joining makes the id commutative, so the same two users
/// always address the same record regardless of argument order.
pub fn pair_id(user_a: &str, user_b: &str) -> String {
    let mut ids = [user_a, user_b];
    ids.sort();
    ids.join(":")
}

impl PulsePair {
    /// Fresh zero state for a pair that has never interacted.
    pub fn new(user_a: &str, user_b: &str) -> Self {
        let mut ids = [user_a.to_string(), user_b.to_string()];
        ids.sort();
        let [participant_a, participant_b] = ids;

        PulsePair {
            pair_id: pair_id(user_a, user_b),
            participant_a,
            participant_b,
            pulse_energy: 0,
            total_energy: 0,
            pulse_level: 0,
            peak_level: 0,
            streak_days: 0,
            last_interaction_date: None,
            last_interaction_at: None,
            pulse_theme: PulseTheme::Spark,
            daily_text_count: 0,
            recent_timestamps: Vec::new(),
            last_message_hash: String::new(),
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_id_commutative() {
        assert_eq!(pair_id("alice", "bob"), pair_id("bob", "alice"));
        assert_eq!(pair_id("alice", "bob"), "alice:bob");
    }

    #[test]
    fn test_new_pair_sorts_participants() {
        let pair = PulsePair::new("bob", "alice");
        assert_eq!(pair.participant_a, "alice");
        assert_eq!(pair.participant_b, "bob");
        assert_eq!(pair.pair_id, "alice:bob");
    }

    #[test]
    fn test_new_pair_zero_state() {
        let pair = PulsePair::new("alice", "bob");
        assert_eq!(pair.total_energy, 0);
        assert_eq!(pair.pulse_energy, 0);
        assert_eq!(pair.streak_days, 0);
        assert_eq!(pair.pulse_theme, PulseTheme::Spark);
        assert!(pair.last_interaction_date.is_none());
        assert!(pair.recent_timestamps.is_empty());
        assert!(pair.last_message_hash.is_empty());
    }

    #[test]
    fn test_involves() {
        let pair = PulsePair::new("alice", "bob");
        assert!(pair.involves("alice"));
        assert!(pair.involves("bob"));
        assert!(!pair.involves("carol"));
    }
}
