use std::time::Duration;

/// The configuration of the live journal feed
#[derive(Debug, Clone)]
pub struct Config {
    /// How many deltas may wait in a subscriber's outbound queue before it is evicted
    pub queue_capacity: usize,
    /// How long a subscriber may stay silent before it is considered dead
    pub pong_wait: Duration,
    /// How long a single write to a subscriber may take
    pub write_wait: Duration,
}

impl Config {
    /// How often an idle subscriber is pinged.
    /// Always shorter than [Config::pong_wait], so a healthy peer answers in time.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            pong_wait: Duration::from_secs(60),
            write_wait: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn ping_period_is_shorter_than_pong_wait() {
        let config = Config::default();

        assert_eq!(config.ping_period(), Duration::from_secs(54));
        assert!(config.ping_period() < config.pong_wait);
    }
}
