// Path: crates/node/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Observer Node
//!
//! Configuration loading and the composition root that wires the observer's
//! components from an [`ObserverConfig`].

pub mod wiring;

use anyhow::{anyhow, Result};
use observer_types::config::ObserverConfig;
use std::path::Path;

/// Reads and validates the TOML configuration at `path`.
pub fn load_config(path: &Path) -> Result<ObserverConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("reading config {}: {e}", path.display()))?;
    let config: ObserverConfig = toml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
