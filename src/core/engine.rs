use chrono::Duration;
use sha2::{Digest, Sha256};

use super::event::{InteractionEvent, InteractionKind};
use super::level::{level_info, pulse_level};
use super::pair::PulsePair;

/// Most energy a pair can earn in one UTC calendar day.
pub const DAILY_CAP: u32 = 50;

/// Length of the burst-detection window in seconds.
pub const SPAM_WINDOW_SECS: i64 = 30;

/// Interactions inside the window at which further ones stop scoring.
pub const SPAM_MSG_THRESHOLD: usize = 5;

/// Text interactions that can earn energy per day.
pub const MAX_TEXT_ENERGY_COUNT: u32 = 20;

/// Bonus for the first interaction of a new day.
pub const FIRST_INTERACTION_BONUS: u32 = 5;

/// Bonus for replying within the reply window.
pub const REPLY_BONUS: u32 = 2;

/// How quickly a reply must follow to earn the bonus, in seconds.
pub const REPLY_WINDOW_SECS: i64 = 120;

/// Streak bonus per consecutive day.
pub const STREAK_MULTIPLIER: u32 = 2;

/// Ceiling on the streak bonus.
pub const MAX_STREAK_BONUS: u32 = 30;

/// Full days of silence tolerated before decay starts.
pub const DECAY_INACTIVE_DAYS: i64 = 3;

/// Fraction of lifetime energy lost per decay day.
pub const DECAY_RATE: f64 = 0.05;

/// Entries kept in the burst window.
const RECENT_WINDOW_LEN: usize = 10;

/// Fingerprint used to suppress repeated-message farming.
///
/// Case-insensitive and whitespace-trimmed; missing content hashes as the
/// empty string rather than erroring.
pub fn content_fingerprint(content: Option<&str>) -> String {
    let normalized = content.unwrap_or("").trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Score one interaction against the current pair state.
///
/// Pure function: returns the next state and the energy awarded, and
/// touches nothing else. Persistence and per-pair write atomicity live in
/// the store. Gated events return the input state unchanged (the burst
/// gate additionally records the event in the sliding window).
pub fn record_interaction(state: &PulsePair, event: &InteractionEvent) -> (PulsePair, u32) {
    let now = event.at;
    let today = now.date_naive();
    let new_day = state.last_interaction_date != Some(today);

    let mut next = state.clone();
    if new_day {
        next.pulse_energy = 0;
        next.daily_text_count = 0;
        next.recent_timestamps.clear();
    }

    // Daily cap reached: nothing more to earn today.
    if next.pulse_energy >= DAILY_CAP {
        return (state.clone(), 0);
    }

    // Burst gate. The incoming event itself occupies a window slot, so a
    // fifth interaction within the window is already suppressed.
    let window_start = now - Duration::seconds(SPAM_WINDOW_SECS);
    let in_window = 1 + next
        .recent_timestamps
        .iter()
        .filter(|t| **t > window_start)
        .count();
    if in_window >= SPAM_MSG_THRESHOLD {
        next.recent_timestamps.push(now);
        trim_window(&mut next.recent_timestamps);
        return (next, 0);
    }

    let is_text = event.kind == InteractionKind::Text;
    let fingerprint = is_text.then(|| content_fingerprint(event.content.as_deref()));

    // The same message repeated back-to-back earns nothing.
    if let Some(ref fp) = fingerprint {
        if *fp == state.last_message_hash {
            return (state.clone(), 0);
        }
    }

    // Daily text budget.
    if is_text && next.daily_text_count >= MAX_TEXT_ENERGY_COUNT {
        return (state.clone(), 0);
    }

    let mut energy = event.kind.base_energy();

    // First interaction of a new day, but not the pair's first ever.
    if new_day && state.last_interaction_date.is_some() {
        energy += FIRST_INTERACTION_BONUS;
    }

    // Quick replies keep the conversation going.
    if let Some(last_at) = state.last_interaction_at {
        let elapsed = now - last_at;
        if elapsed > Duration::zero() && elapsed <= Duration::seconds(REPLY_WINDOW_SECS) {
            energy += REPLY_BONUS;
        }
    }

    // Clamp to what the daily cap still allows.
    energy = energy.min(DAILY_CAP - next.pulse_energy);
    if energy == 0 {
        return (state.clone(), 0);
    }

    // Streak bookkeeping against the previous interaction date. A gap of
    // more than one day resets the streak to 1, never to 0.
    let new_streak = match state.last_interaction_date {
        None => 1,
        Some(prev) => {
            let gap = (today - prev).num_days();
            if gap == 1 {
                state.streak_days + 1
            } else if gap > 1 {
                1
            } else {
                state.streak_days
            }
        }
    };

    // Streak bonus lands only on the first scoring interaction of a day.
    if new_day && new_streak > 1 {
        let bonus = (new_streak * STREAK_MULTIPLIER).min(MAX_STREAK_BONUS);
        let headroom = DAILY_CAP - next.pulse_energy - energy;
        energy += bonus.min(headroom);
    }

    // Long silences bleed lifetime energy before the new award lands.
    if new_day {
        if let Some(prev) = state.last_interaction_date {
            let inactive_days = (today - prev).num_days() - 1;
            if inactive_days >= DECAY_INACTIVE_DAYS {
                let decay_days = (inactive_days - DECAY_INACTIVE_DAYS + 1) as u32;
                next.total_energy = decay_total(next.total_energy, decay_days);
            }
        }
    }

    next.total_energy += energy;
    next.pulse_energy += energy;
    next.pulse_level = pulse_level(next.total_energy);
    next.peak_level = next.peak_level.max(next.pulse_level);
    next.streak_days = new_streak;
    if is_text {
        next.daily_text_count += 1;
        if let Some(fp) = fingerprint {
            next.last_message_hash = fp;
        }
    }
    next.recent_timestamps.push(now);
    trim_window(&mut next.recent_timestamps);
    next.last_interaction_date = Some(today);
    next.last_interaction_at = Some(now);
    next.pulse_theme = level_info(next.total_energy).theme;

    (next, energy)
}

/// Apply `decay_days` rounds of multiplicative decay, rounding down.
fn decay_total(total: u32, decay_days: u32) -> u32 {
    let factor = (1.0 - DECAY_RATE).powi(decay_days as i32);
    (total as f64 * factor).floor() as u32
}

fn trim_window(window: &mut Vec<chrono::DateTime<chrono::Utc>>) {
    if window.len() > RECENT_WINDOW_LEN {
        let excess = window.len() - RECENT_WINDOW_LEN;
        window.drain(..excess);
    }
}
