use serde::{Deserialize, Serialize};

/// Cosmetic theme attached to a pulse level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseTheme {
    Spark,
    Glow,
    Flame,
    Fusion,
    Infinity,
}

impl PulseTheme {
    pub fn from_name(name: &str) -> Option<PulseTheme> {
        match name {
            "spark" => Some(PulseTheme::Spark),
            "glow" => Some(PulseTheme::Glow),
            "flame" => Some(PulseTheme::Flame),
            "fusion" => Some(PulseTheme::Fusion),
            "infinity" => Some(PulseTheme::Infinity),
            _ => None,
        }
    }
}

impl std::fmt::Display for PulseTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulseTheme::Spark => write!(f, "spark"),
            PulseTheme::Glow => write!(f, "glow"),
            PulseTheme::Flame => write!(f, "flame"),
            PulseTheme::Fusion => write!(f, "fusion"),
            PulseTheme::Infinity => write!(f, "infinity"),
        }
    }
}

/// One row of the level table.
#[derive(Debug, Clone, Copy)]
pub struct LevelInfo {
    pub name: &'static str,
    pub theme: PulseTheme,
    pub min_energy: u32,
    pub emoji: &'static str,
}

/// Level table, ascending by `min_energy`.
pub const LEVELS: [LevelInfo; 6] = [
    LevelInfo {
        name: "New",
        theme: PulseTheme::Spark,
        min_energy: 0,
        emoji: "🌱",
    },
    LevelInfo {
        name: "Spark",
        theme: PulseTheme::Spark,
        min_energy: 50,
        emoji: "✨",
    },
    LevelInfo {
        name: "Glow",
        theme: PulseTheme::Glow,
        min_energy: 200,
        emoji: "🌟",
    },
    LevelInfo {
        name: "Flame",
        theme: PulseTheme::Flame,
        min_energy: 450,
        emoji: "🔥",
    },
    LevelInfo {
        name: "Fusion",
        theme: PulseTheme::Fusion,
        min_energy: 800,
        emoji: "💫",
    },
    LevelInfo {
        name: "Infinity",
        theme: PulseTheme::Infinity,
        min_energy: 1250,
        emoji: "♾️",
    },
];

/// Highest table entry whose threshold is at or below `total_energy`.
pub fn level_info(total_energy: u32) -> &'static LevelInfo {
    LEVELS
        .iter()
        .rev()
        .find(|l| l.min_energy <= total_energy)
        .unwrap_or(&LEVELS[0])
}

/// Discrete level derived from lifetime energy.
///
/// Unbounded, unlike the level table which saturates at its last entry.
/// The two are kept separate on purpose.
pub fn pulse_level(total_energy: u32) -> u32 {
    (total_energy as f64 / 50.0).sqrt().floor() as u32
}

/// Percentage progress (0-100) from the current level threshold to the next.
pub fn progress_to_next_level(total_energy: u32) -> f64 {
    let level = pulse_level(total_energy) as u64;
    let low = level * level * 50;
    let high = (level + 1) * (level + 1) * 50;
    let pct = (total_energy as u64).saturating_sub(low) as f64 / (high - low) as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_info_thresholds() {
        assert_eq!(level_info(0).name, "New");
        assert_eq!(level_info(49).name, "New");
        assert_eq!(level_info(50).name, "Spark");
        assert_eq!(level_info(199).name, "Spark");
        assert_eq!(level_info(200).name, "Glow");
        assert_eq!(level_info(449).name, "Glow");
        assert_eq!(level_info(450).name, "Flame");
        assert_eq!(level_info(800).name, "Fusion");
        assert_eq!(level_info(1249).name, "Fusion");
        assert_eq!(level_info(1250).name, "Infinity");
    }

    #[test]
    fn test_pulse_level_formula() {
        assert_eq!(pulse_level(0), 0);
        assert_eq!(pulse_level(49), 0);
        assert_eq!(pulse_level(50), 1);
        assert_eq!(pulse_level(200), 2);
        assert_eq!(pulse_level(1250), 5);
    }

    #[test]
    fn test_table_and_formula_diverge_past_last_entry() {
        // The sqrt level keeps growing while the table saturates.
        assert_eq!(pulse_level(5000), 10);
        assert_eq!(level_info(5000).name, "Infinity");
    }

    #[test]
    fn test_progress_to_next_level() {
        assert_eq!(progress_to_next_level(0), 0.0);
        assert!((progress_to_next_level(25) - 50.0).abs() < 1e-9);
        assert_eq!(progress_to_next_level(50), 0.0);
        // Level 1 spans 50..200.
        assert!((progress_to_next_level(125) - 50.0).abs() < 1e-9);
        assert_eq!(progress_to_next_level(200), 0.0);
    }

    #[test]
    fn test_progress_stays_in_bounds() {
        for total in [0, 1, 49, 50, 199, 200, 1249, 1250, 9999] {
            let pct = progress_to_next_level(total);
            assert!((0.0..=100.0).contains(&pct));
        }
    }

    #[test]
    fn test_theme_name_round_trip() {
        for theme in [
            PulseTheme::Spark,
            PulseTheme::Glow,
            PulseTheme::Flame,
            PulseTheme::Fusion,
            PulseTheme::Infinity,
        ] {
            assert_eq!(PulseTheme::from_name(&theme.to_string()), Some(theme));
        }
        assert_eq!(PulseTheme::from_name("nope"), None);
    }
}
