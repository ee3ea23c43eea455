//! Cross-module scenarios. Every test drives the public API only.

pub mod fixtures;

mod config;
mod creation;
mod entitlements;
mod keys;
mod membership;
mod user_streams;
