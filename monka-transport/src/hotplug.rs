//! HID presence watcher
//!
//! Polls the OS HID device list for paths matching the configured vid/pid
//! pairs. A difference between two snapshots means a device arrived or was
//! removed, which callers answer with a fresh discovery pass.

use std::collections::BTreeSet;

use hidapi::HidApi;
use tracing::debug;

use crate::error::TransportError;
use crate::types::DiscoveryTargets;

/// Set of matching HID paths at one point in time
pub type PresenceSnapshot = BTreeSet<String>;

/// Paths that appeared or disappeared between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChange {
    pub arrived: Vec<String>,
    pub removed: Vec<String>,
}

impl PresenceChange {
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty() && self.removed.is_empty()
    }
}

/// Collect matching paths from `(vid, pid, path)` entries
pub fn snapshot<'a, I>(entries: I, pairs: &[(u16, u16)]) -> PresenceSnapshot
where
    I: IntoIterator<Item = (u16, u16, &'a str)>,
{
    entries
        .into_iter()
        .filter(|(vid, pid, _)| pairs.contains(&(*vid, *pid)))
        .map(|(_, _, path)| path.to_string())
        .collect()
}

/// Compare two snapshots
pub fn diff(previous: &PresenceSnapshot, current: &PresenceSnapshot) -> PresenceChange {
    PresenceChange {
        arrived: current.difference(previous).cloned().collect(),
        removed: previous.difference(current).cloned().collect(),
    }
}

/// Polling watcher over hidapi's device list
pub struct PresenceWatcher {
    api: HidApi,
    pairs: Vec<(u16, u16)>,
    last: PresenceSnapshot,
}

impl PresenceWatcher {
    /// Open hidapi and take the initial snapshot
    pub fn new(targets: &DiscoveryTargets) -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        let mut watcher = Self {
            api,
            pairs: targets.numeric_pairs(),
            last: PresenceSnapshot::new(),
        };
        watcher.last = watcher.current();
        Ok(watcher)
    }

    fn current(&self) -> PresenceSnapshot {
        snapshot(
            self.api.device_list().map(|d| {
                (
                    d.vendor_id(),
                    d.product_id(),
                    d.path().to_str().unwrap_or_default(),
                )
            }),
            &self.pairs,
        )
    }

    /// Refresh the device list and report what changed since the last poll
    pub fn poll(&mut self) -> Result<Option<PresenceChange>, TransportError> {
        self.api.refresh_devices()?;
        let current = self.current();
        let change = diff(&self.last, &current);
        self.last = current;
        if change.is_empty() {
            return Ok(None);
        }
        debug!(
            "HID presence changed: +{} -{}",
            change.arrived.len(),
            change.removed.len()
        );
        Ok(Some(change))
    }
}
