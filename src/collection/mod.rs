// src/collection/mod.rs
//! Training data collection driven by an external request handler

pub mod commands;
pub mod session;

pub use commands::{command_channel, CollectionCommand, CollectionHandle, CommandReceiver};
pub use session::{CollectionSession, CollectionSettings, CollectionStatus, SettingsUpdate};
