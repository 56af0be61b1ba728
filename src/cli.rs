use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;

use crate::config::Config;
use crate::core::{
    level_info, pair_id, progress_to_next_level, InteractionEvent, InteractionKind, PulsePair,
    PulseStore, DAILY_CAP,
};

#[derive(Parser)]
#[command(name = "pulse", about = "Relationship engagement engine", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an interaction between two users
    Record {
        user_a: String,
        user_b: String,
        /// Interaction kind (text, image, voice, video-call)
        #[arg(long, default_value = "text")]
        kind: String,
        /// Text content, used to suppress repeated messages
        #[arg(long)]
        content: Option<String>,
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show the pulse between two users
    Status {
        user_a: String,
        user_b: String,
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List all pulses involving a user
    List {
        user_id: String,
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show aggregate statistics over all pairs
    Stats {
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Watch a pair and print each change
    Watch {
        user_a: String,
        user_b: String,
        /// Data directory path
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn open_store(data_dir: Option<PathBuf>) -> Result<PulseStore> {
    let config = Config::new(data_dir)?;
    Ok(PulseStore::new(config.db_file())?)
}

fn parse_kind(kind: &str) -> Result<InteractionKind> {
    match kind {
        "text" => Ok(InteractionKind::Text),
        "image" => Ok(InteractionKind::Image),
        "voice" => Ok(InteractionKind::Voice),
        "video-call" | "video_call" => Ok(InteractionKind::VideoCall),
        other => bail!("unknown interaction kind: {}", other),
    }
}

pub async fn handle_record(
    user_a: String,
    user_b: String,
    kind: String,
    content: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let mut store = open_store(data_dir)?;
    let kind = parse_kind(&kind)?;

    let event = InteractionEvent {
        kind,
        content,
        at: Utc::now(),
    };

    let (pair, gained) = store.record_interaction(&user_a, &user_b, &event)?;

    if gained > 0 {
        println!("{} +{} energy", "⚡".yellow(), gained);
    } else {
        println!("{}", "No energy awarded (capped or suppressed)".yellow());
    }
    print_pair(&pair);

    Ok(())
}

pub async fn handle_status(
    user_a: String,
    user_b: String,
    format: String,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(data_dir)?;

    match store.find(&pair_id(&user_a, &user_b))? {
        Some(pair) if format == "json" => {
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Some(pair) => print_pair(&pair),
        None => {
            println!("{}: {} / {}", "No pulse found for".yellow(), user_a, user_b);
        }
    }

    Ok(())
}

pub async fn handle_list(user_id: String, data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;
    let pairs = store.list_for_user(&user_id)?;

    if pairs.is_empty() {
        println!("No pulses found for {}.", user_id);
        return Ok(());
    }

    println!("{} ({}):", "Pulses".cyan().bold(), pairs.len());
    for pair in pairs {
        let info = level_info(pair.total_energy);
        println!(
            "  {} {} ↔ {} - {} (Level {}, Energy {}, Streak {})",
            info.emoji,
            pair.participant_a,
            pair.participant_b,
            info.name,
            pair.pulse_level,
            pair.total_energy,
            pair.streak_days,
        );
    }

    Ok(())
}

pub async fn handle_stats(data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;
    let stats = store.stats()?;

    println!("{}", "Pulse Statistics".cyan().bold());
    println!("Total pairs: {}", stats.total_pairs);
    println!("Active today: {}", stats.active_today);
    println!("Total energy: {}", stats.total_energy);
    println!("Average energy: {:.1}", stats.avg_energy);
    println!("Highest peak level: {}", stats.highest_peak_level);
    println!("Longest streak: {} days", stats.longest_streak);

    Ok(())
}

pub async fn handle_watch(
    user_a: String,
    user_b: String,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(data_dir)?;
    let id = pair_id(&user_a, &user_b);

    println!(
        "Watching {} ↔ {} (Ctrl-C to stop)",
        user_a.cyan(),
        user_b.cyan()
    );

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(2));
    let mut last_seen: Option<PulsePair> = None;

    loop {
        interval.tick().await;

        if let Some(pair) = store.find(&id)? {
            if last_seen.as_ref() != Some(&pair) {
                print_pair(&pair);
                last_seen = Some(pair);
            }
        }
    }
}

fn print_pair(pair: &PulsePair) {
    let info = level_info(pair.total_energy);

    println!(
        "\n{} {} ↔ {}",
        info.emoji,
        pair.participant_a.cyan().bold(),
        pair.participant_b.cyan().bold()
    );
    println!("Theme: {} ({})", pair.pulse_theme, info.name);
    println!("Level: {} (peak {})", pair.pulse_level, pair.peak_level);
    println!(
        "Progress to next level: {:.1}%",
        progress_to_next_level(pair.total_energy)
    );
    println!("Energy today: {}/{}", pair.pulse_energy, DAILY_CAP);
    println!("Lifetime energy: {}", pair.total_energy);
    println!("Streak: {} days", pair.streak_days);
}
