//! Active monitoring set and connection failover

use std::collections::HashMap;
use std::time::{Duration, Instant};

use monka_transport::{select_preferred, DiscoveredDevice, TransportError};
use tracing::{info, warn};

use crate::poller::BatteryPoller;

/// Paths under active battery polling and when each last answered
#[derive(Debug, Default, Clone)]
pub struct ActiveSet {
    paths: Vec<String>,
    last_response: HashMap<String, Instant>,
}

impl ActiveSet {
    /// Replace the set with a single path, stamped as responding at `now`
    pub fn reset(&mut self, device_path: &str, now: Instant) {
        self.paths = vec![device_path.to_string()];
        self.last_response.clear();
        self.last_response.insert(device_path.to_string(), now);
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.last_response.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, device_path: &str) -> bool {
        self.paths.iter().any(|p| p == device_path)
    }

    /// The path monitoring runs on
    pub fn primary(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }

    /// Stamp a response; ignored for paths outside the set
    pub fn record_response(&mut self, device_path: &str, now: Instant) {
        if self.contains(device_path) {
            self.last_response.insert(device_path.to_string(), now);
        }
    }

    pub fn last_response(&self, device_path: &str) -> Option<Instant> {
        self.last_response.get(device_path).copied()
    }

    /// True when the set is non-empty and no path answered within `timeout`
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        !self.paths.is_empty()
            && !self.paths.iter().any(|p| {
                self.last_response
                    .get(p)
                    .is_some_and(|t| now.saturating_duration_since(*t) < timeout)
            })
    }
}

/// Decides when and where to move battery monitoring
#[derive(Debug)]
pub struct Failover {
    active: ActiveSet,
    response_timeout: Duration,
}

impl Failover {
    pub fn new(response_timeout: Duration) -> Self {
        Self {
            active: ActiveSet::default(),
            response_timeout,
        }
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.primary()
    }

    pub fn record_response(&mut self, device_path: &str, now: Instant) {
        self.active.record_response(device_path, now);
    }

    /// Health check: the active connection went silent
    pub fn needs_failover(&self, now: Instant) -> bool {
        self.active.is_stale(now, self.response_timeout)
    }

    /// Connection to monitor among freshly discovered devices
    pub fn select<'a>(&self, devices: &'a [DiscoveredDevice]) -> Option<&'a DiscoveredDevice> {
        select_preferred(devices)
    }

    /// A refresh only restarts monitoring when the choice changed
    pub fn should_switch(&self, selected: &str) -> bool {
        self.active.primary() != Some(selected)
    }

    /// Stop the current server and start one on `device_path`.
    ///
    /// On failure nothing is left active.
    pub fn switch_to(
        &mut self,
        poller: &mut BatteryPoller,
        device_path: &str,
        now: Instant,
    ) -> Result<(), TransportError> {
        poller.stop_monitoring();
        if let Err(e) = poller.start_monitoring(device_path) {
            warn!("Failed to start battery monitoring on {device_path}: {e}");
            self.active.clear();
            return Err(e);
        }
        info!("Monitoring battery on {device_path}");
        self.active.reset(device_path, now);
        Ok(())
    }

    /// Stop monitoring and forget the active set
    pub fn release(&mut self, poller: &mut BatteryPoller) {
        poller.stop_monitoring();
        self.active.clear();
    }
}
