use std::time::Duration;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect timeout per transport attempt
    pub connect_timeout: Duration,

    /// Delay before the first reconnect attempt
    pub base_delay: Duration,

    /// Backoff growth factor per attempt
    pub growth_factor: f64,

    /// Upper bound on any reconnect delay
    pub max_delay: Duration,

    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,

    /// Keep-alive send interval while open
    pub heartbeat_interval: Duration,

    /// Force a reconnect after this long without inbound traffic
    pub liveness_timeout: Duration,

    /// Frames older than this mark playback stale
    pub stale_after: Duration,

    /// Replay automatically after a relay error
    pub auto_recover: bool,

    /// Delay before an automatic replay
    pub recover_delay: Duration,

    /// Event channel capacity
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_secs(10),
            base_delay: Duration::from_millis(1000),
            growth_factor: 2.0,
            max_delay: Duration::from_millis(15000),
            max_reconnect_attempts: 5,
            heartbeat_interval: Duration::from_secs(30),
            liveness_timeout: Duration::from_secs(60),
            stale_after: Duration::from_millis(5000),
            auto_recover: false,
            recover_delay: Duration::from_secs(5),
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Create config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_delay.is_zero() {
            return Err(Error::config("Base delay must be non-zero"));
        }

        if self.growth_factor < 1.0 {
            return Err(Error::config("Growth factor must be at least 1.0"));
        }

        if self.max_delay < self.base_delay {
            return Err(Error::config("Max delay must not be below base delay"));
        }

        if self.max_reconnect_attempts == 0 {
            return Err(Error::config("At least one reconnect attempt is required"));
        }

        if self.liveness_timeout <= self.heartbeat_interval {
            return Err(Error::config(
                "Liveness timeout must exceed the heartbeat interval",
            ));
        }

        if self.event_buffer == 0 {
            return Err(Error::config("Event buffer must hold at least one event"));
        }

        Ok(())
    }
}

/// Builder for ClientConfig
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the first reconnect delay
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Set backoff growth factor
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.config.growth_factor = factor;
        self
    }

    /// Set the reconnect delay ceiling
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Set the reconnect attempt budget
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Set keep-alive interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the silent-transport cutoff
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.config.liveness_timeout = timeout;
        self
    }

    /// Set the staleness threshold
    pub fn stale_after(mut self, threshold: Duration) -> Self {
        self.config.stale_after = threshold;
        self
    }

    /// Enable automatic replay after relay errors
    pub fn auto_recover(mut self, enabled: bool) -> Self {
        self.config.auto_recover = enabled;
        self
    }

    /// Set the delay before an automatic replay
    pub fn recover_delay(mut self, delay: Duration) -> Self {
        self.config.recover_delay = delay;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        ClientConfigBuilder::new()
    }
}
