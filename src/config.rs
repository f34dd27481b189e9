//! Application configuration
//!
//! Values come from the environment (optionally via `.env`) with defaults
//! matching the device's usual behaviour.

use std::time::Duration;

/// Live-view client tuning
#[derive(Debug, Clone)]
pub struct LiveViewConfig {
    /// Delivered-but-unacknowledged frames allowed before dropping
    pub max_pending_frames: u64,
    /// Watchdog tick period
    pub watchdog_interval: Duration,
    /// Grace period after a restart before stalls are checked again
    pub watchdog_cooldown: Duration,
}

impl Default for LiveViewConfig {
    fn default() -> Self {
        Self {
            max_pending_frames: 5,
            watchdog_interval: Duration::from_millis(1000),
            watchdog_cooldown: Duration::from_millis(2000),
        }
    }
}

/// Status polling tuning
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Minimum time between the starts of two consecutive polls
    pub min_interval: Duration,
    /// How long to wait for the device to report a requested shoot mode
    pub shoot_mode_wait: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            shoot_mode_wait: Duration::from_millis(10_000),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON-RPC camera service endpoint
    pub camera_endpoint: String,
    /// HTTP timeout for RPC round trips (adapter only)
    pub rpc_timeout: Duration,
    pub polling: PollingConfig,
    pub live_view: LiveViewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_endpoint: "http://192.168.122.1:8080/sony/camera".to_string(),
            rpc_timeout: Duration::from_millis(10_000),
            polling: PollingConfig::default(),
            live_view: LiveViewConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            camera_endpoint: std::env::var("CAMERA_ENDPOINT")
                .unwrap_or(defaults.camera_endpoint),
            rpc_timeout: env_millis("RPC_TIMEOUT_MS").unwrap_or(defaults.rpc_timeout),
            polling: PollingConfig {
                min_interval: env_millis("POLL_MIN_INTERVAL_MS")
                    .unwrap_or(defaults.polling.min_interval),
                shoot_mode_wait: env_millis("SHOOT_MODE_WAIT_MS")
                    .unwrap_or(defaults.polling.shoot_mode_wait),
            },
            live_view: LiveViewConfig {
                max_pending_frames: std::env::var("LIVEVIEW_MAX_PENDING_FRAMES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.live_view.max_pending_frames),
                watchdog_interval: env_millis("LIVEVIEW_WATCHDOG_INTERVAL_MS")
                    .unwrap_or(defaults.live_view.watchdog_interval),
                watchdog_cooldown: env_millis("LIVEVIEW_WATCHDOG_COOLDOWN_MS")
                    .unwrap_or(defaults.live_view.watchdog_cooldown),
            },
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.polling.min_interval, Duration::from_millis(500));
        assert_eq!(config.live_view.max_pending_frames, 5);
        assert_eq!(config.live_view.watchdog_interval, Duration::from_secs(1));
        assert_eq!(config.live_view.watchdog_cooldown, Duration::from_secs(2));
    }
}
