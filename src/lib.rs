//! Pulse: relationship engagement engine.
//!
//! Converts raw interaction events between two users (text, image, voice,
//! video call) into a bounded, decaying energy value per pair, and derives
//! a level, a lifetime peak, a day streak and a cosmetic theme from it.

pub mod cli;
pub mod config;
pub mod core;
