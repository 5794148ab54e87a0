use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Single body limit for the whole router; sized for proof uploads.
    pub max_body_bytes: usize,
    /// cache-control max-age on availability reads. Polling clients tolerate
    /// staleness up to this window.
    pub availability_ttl: Duration,
    pub event_channel_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
            availability_ttl: Duration::from_secs(5),
            event_channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

pub fn validate_startup_config(api: &ApiConfig, sweeper: &SweeperConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("max body bytes must be > 0".to_string());
    }
    if api.event_channel_capacity == 0 {
        return Err("event channel capacity must be > 0".to_string());
    }
    if sweeper.enabled && sweeper.interval.is_zero() {
        return Err("sweeper interval must be > 0 when the sweeper is enabled".to_string());
    }
    Ok(())
}
