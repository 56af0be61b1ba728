pub mod engine;
pub mod error;
pub mod event;
pub mod level;
pub mod pair;
pub mod store;

pub use engine::{content_fingerprint, record_interaction, DAILY_CAP};
pub use error::{PulseError, Result};
pub use event::{InteractionEvent, InteractionKind};
pub use level::{level_info, progress_to_next_level, pulse_level, LevelInfo, PulseTheme};
pub use pair::{pair_id, PulsePair};
pub use store::{PulseStats, PulseStore, PulseSubscription};
