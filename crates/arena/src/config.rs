//! Engine configuration.

use arena_board::MIN_SIDE;
use arena_protocol::MinigameKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for an [`ArenaService`](crate::ArenaService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Minigames a duel kind is drawn from.
    pub minigames: Vec<MinigameKind>,
    /// Board size for rooms created without explicit dimensions.
    pub default_width: i32,
    pub default_height: i32,
    /// Per-subscriber queue length in the [`ChannelHub`](crate::ChannelHub).
    pub subscriber_buffer: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            minigames: MinigameKind::CATALOG.to_vec(),
            default_width: 10,
            default_height: 10,
            subscriber_buffer: 64,
        }
    }
}

impl ArenaConfig {
    /// Defaults overlaid with `ARENA_LOG`, `ARENA_WIDTH`, and `ARENA_HEIGHT`.
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var("ARENA_LOG") {
            config.log_filter = filter;
        }
        if let Some(width) = env_number("ARENA_WIDTH") {
            config.default_width = width;
        }
        if let Some(height) = env_number("ARENA_HEIGHT") {
            config.default_height = height;
        }
        config
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - Board sides are raised to at least [`MIN_SIDE`].
    /// - An empty minigame list falls back to the full catalog.
    /// - A zero subscriber buffer becomes 1.
    pub fn validated(mut self) -> Self {
        if self.default_width < MIN_SIDE || self.default_height < MIN_SIDE {
            warn!(
                width = self.default_width,
                height = self.default_height,
                min = MIN_SIDE,
                "default board too small, clamping"
            );
            self.default_width = self.default_width.max(MIN_SIDE);
            self.default_height = self.default_height.max(MIN_SIDE);
        }
        if self.minigames.is_empty() {
            warn!("no minigames configured, using the full catalog");
            self.minigames = MinigameKind::CATALOG.to_vec();
        }
        self.subscriber_buffer = self.subscriber_buffer.max(1);
        self
    }
}

fn env_number(key: &str) -> Option<i32> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}
