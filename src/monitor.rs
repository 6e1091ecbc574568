//! Monitor context and event loop
//!
//! One [`Monitor`] owns everything: driver, discovery, poller, failover
//! state, the logical device list and the notification policy. Handlers take
//! the current [`Instant`] so a test can drive them with a simulated clock;
//! [`Monitor::run`] feeds them from tokio timers.

use std::time::{Duration, Instant};

use monka_transport::{DeviceDiscovery, DriverEvent, SharedDriver, FALLBACK_NAME};
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::battery::CalibrationTable;
use crate::config::VendorConfig;
use crate::devices::DeviceList;
use crate::failover::Failover;
use crate::notify::{Alert, NotificationPolicy, Notifier};
use crate::poller::BatteryPoller;
use crate::settings::Settings;
use crate::status::{StatusExport, TrayStatus};

pub struct Monitor {
    settings: Settings,
    discovery: DeviceDiscovery,
    poller: BatteryPoller,
    events: Option<mpsc::Receiver<DriverEvent>>,
    failover: Failover,
    devices: DeviceList,
    policy: NotificationPolicy,
    notifier: Box<dyn Notifier>,
    export: Option<StatusExport>,
    last_tooltip: Option<String>,
}

impl Monitor {
    pub fn new(
        driver: SharedDriver,
        vendor: &VendorConfig,
        settings: Settings,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let calibration = CalibrationTable::from_config(&vendor.battery_param);
        let discovery = DeviceDiscovery::new(driver.clone(), vendor.targets());
        let (poller, events) = BatteryPoller::new(driver, calibration, settings.liveness_window());
        let failover = Failover::new(settings.response_timeout());

        Self {
            settings,
            discovery,
            poller,
            events: Some(events),
            failover,
            devices: DeviceList::new(),
            policy: NotificationPolicy::new(),
            notifier,
            export: None,
            last_tooltip: None,
        }
    }

    /// Mirror the tray status into files
    pub fn with_export(mut self, export: StatusExport) -> Self {
        self.export = Some(export);
        self
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn poller(&self) -> &BatteryPoller {
        &self.poller
    }

    pub fn active_path(&self) -> Option<&str> {
        self.failover.active_path()
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// Hand out the driver event receiver (for callers running their own loop)
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.events.take()
    }

    /// Initial discovery and server start
    pub fn start(&mut self, now: Instant) {
        info!(
            "Starting battery monitor ({:?} driver)",
            self.discovery.driver().kind()
        );
        self.refresh(now);
    }

    /// Record a battery packet from the driver
    pub fn handle_driver_event(&mut self, event: DriverEvent, now: Instant) {
        let DriverEvent::BatteryData { device_path, .. } = &event;
        let device_path = device_path.clone();

        self.poller.handle_event(event, now);
        self.failover.record_response(&device_path, now);
        self.devices.refresh(&self.poller, now);
        self.publish_status(now);
    }

    /// Battery timer: request a read, evaluate alerts, publish the status
    pub async fn on_battery_tick(&mut self, now: Instant) {
        if let Some(path) = self.failover.active_path() {
            self.poller.request_battery_level(path);
        }
        self.devices.refresh(&self.poller, now);

        if let Some(alert) = self.evaluate_alert(now) {
            if let Err(e) = self.notifier.notify(&alert).await {
                warn!("Failed to deliver notification: {e}");
            }
        }

        self.publish_status(now);
    }

    fn evaluate_alert(&mut self, now: Instant) -> Option<Alert> {
        if !self.settings.notifications_enabled {
            return None;
        }
        let path = self.failover.active_path()?;
        if !self.poller.is_online(path, now) || self.poller.status(path).is_none() {
            return None;
        }

        let level = self.poller.battery_level(path);
        let charging = self.poller.is_charging(path);
        let kind = self.policy.evaluate(level, charging)?;

        let name = self
            .devices
            .find_by_path(path)
            .map_or(FALLBACK_NAME, |d| d.name.as_str());
        Some(Alert::new(kind, name, level, charging))
    }

    /// Health timer: fail over when the active connection went silent
    pub fn on_health_check(&mut self, now: Instant) {
        if !self.failover.needs_failover(now) {
            return;
        }

        warn!(
            "No battery response from {} for {:?}, switching connection",
            self.failover.active_path().unwrap_or("-"),
            self.settings.response_timeout()
        );
        self.devices.mark_updating(true);
        self.publish_status(now);

        let selected = self.rediscover();
        match selected {
            Some(path) => {
                let _ = self.failover.switch_to(&mut self.poller, &path, now);
            }
            None => {
                info!("No connection available, waiting for the next discovery");
                self.failover.release(&mut self.poller);
            }
        }

        self.devices.mark_updating(false);
        self.devices.refresh(&self.poller, now);
        self.publish_status(now);
    }

    /// Discovery timer and device arrival/removal.
    ///
    /// Restarts monitoring only when the preferred connection changed.
    pub fn refresh(&mut self, now: Instant) {
        match self.rediscover() {
            Some(path) => {
                if self.failover.should_switch(&path) {
                    let _ = self.failover.switch_to(&mut self.poller, &path, now);
                }
            }
            None => {
                if self.failover.active_path().is_some() {
                    info!("Monitored device disappeared");
                }
                self.failover.release(&mut self.poller);
            }
        }
        self.devices.refresh(&self.poller, now);
        self.publish_status(now);
    }

    /// Run discovery and rebuild the device list, returning the preferred path
    fn rediscover(&mut self) -> Option<String> {
        self.discovery.discover();
        self.devices.rebuild(self.discovery.mouse_items());
        self.failover
            .select(self.discovery.devices())
            .map(|d| d.device_path.clone())
    }

    /// Battery tuple for the monitored device
    pub fn tray_status(&self, now: Instant) -> TrayStatus {
        if let Some(path) = self.failover.active_path() {
            let device = self.devices.find_by_path(path);
            return TrayStatus {
                device_name: device.map_or(FALLBACK_NAME, |d| d.name.as_str()).to_string(),
                battery_level: self.poller.battery_level(path),
                charging: self.poller.is_charging(path),
                online: self.poller.is_online(path, now),
                updating: device.is_some_and(|d| d.updating),
            };
        }

        match self.devices.iter().next() {
            Some(device) => TrayStatus {
                device_name: device.name.clone(),
                battery_level: device.battery_level(),
                charging: device.is_charging(),
                online: false,
                updating: device.updating,
            },
            None => TrayStatus::no_device(),
        }
    }

    fn publish_status(&mut self, now: Instant) {
        let status = self.tray_status(now);
        let tooltip = status.tooltip();
        if self.last_tooltip.as_deref() != Some(tooltip.as_str()) {
            info!("{tooltip}");
            self.last_tooltip = Some(tooltip);
        }
        if let Some(export) = &self.export {
            if let Err(e) = export.update(&status) {
                warn!("Status export failed: {e}");
            }
        }
    }

    /// Stop the battery server
    pub fn shutdown(&mut self) {
        self.failover.release(&mut self.poller);
        info!("Battery monitoring stopped");
    }

    /// Run until Ctrl-C
    pub async fn run(mut self) {
        let Some(mut events) = self.events.take() else {
            warn!("Driver event receiver already taken");
            return;
        };

        let mut battery = ticker(self.settings.battery_interval());
        let mut health = ticker(self.settings.health_check_interval());
        let mut discovery = ticker(self.settings.discovery_interval());
        let mut presence = Presence::new(&self.discovery, &self.settings);

        // the first tick of every interval completes immediately
        discovery.tick().await;
        health.tick().await;
        self.start(Instant::now());

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    self.handle_driver_event(event, Instant::now());
                }
                _ = battery.tick() => {
                    self.on_battery_tick(Instant::now()).await;
                }
                _ = health.tick() => {
                    self.on_health_check(Instant::now());
                }
                _ = discovery.tick() => {
                    debug!("Periodic discovery");
                    self.refresh(Instant::now());
                }
                _ = presence.changed() => {
                    self.refresh(Instant::now());
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl-C: {e}");
                    }
                    info!("Shutting down");
                    break;
                }
            }
        }

        self.shutdown();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// HID arrival/removal source for the event loop
#[cfg(feature = "hotplug")]
struct Presence {
    watcher: Option<monka_transport::PresenceWatcher>,
    tick: Interval,
}

#[cfg(feature = "hotplug")]
impl Presence {
    fn new(discovery: &DeviceDiscovery, settings: &Settings) -> Self {
        let watcher = match monka_transport::PresenceWatcher::new(discovery.targets()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("HID presence watcher unavailable: {e}");
                None
            }
        };
        Self {
            watcher,
            tick: ticker(settings.presence_interval()),
        }
    }

    async fn changed(&mut self) {
        loop {
            let Some(watcher) = self.watcher.as_mut() else {
                return std::future::pending().await;
            };
            self.tick.tick().await;
            match watcher.poll() {
                Ok(Some(change)) => {
                    for path in &change.arrived {
                        info!("Device arrived: {path}");
                    }
                    for path in &change.removed {
                        info!("Device removed: {path}");
                    }
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("HID presence poll failed, disabling watcher: {e}");
                    self.watcher = None;
                }
            }
        }
    }
}

#[cfg(not(feature = "hotplug"))]
struct Presence;

#[cfg(not(feature = "hotplug"))]
impl Presence {
    fn new(_discovery: &DeviceDiscovery, _settings: &Settings) -> Self {
        Self
    }

    async fn changed(&mut self) {
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use monka_transport::{MockDevice, MockDriver};
    use std::sync::Arc;

    fn monitor(devices: Vec<MockDevice>) -> (Monitor, Arc<MockDriver>) {
        let driver = Arc::new(MockDriver::with_devices(devices));
        let monitor = Monitor::new(
            driver.clone(),
            &VendorConfig::builtin(),
            Settings::default(),
            Box::new(LogNotifier),
        );
        (monitor, driver)
    }

    #[test]
    fn test_start_selects_wired() {
        let (mut monitor, driver) = monitor(vec![
            MockDevice::new("3554", "b012", "dongle", true),
            MockDevice::new("3554", "b00e", "usb", true),
        ]);
        monitor.start(Instant::now());
        assert_eq!(monitor.active_path(), Some("usb"));
        assert_eq!(driver.serving_path().as_deref(), Some("usb"));
        assert_eq!(monitor.devices().len(), 2);
    }

    #[test]
    fn test_no_devices_reports_placeholder() {
        let (mut monitor, _) = monitor(Vec::new());
        let now = Instant::now();
        monitor.start(now);
        assert!(monitor.active_path().is_none());
        assert_eq!(monitor.tray_status(now).tooltip(), "Monka Device - Offline");
    }

    #[test]
    fn test_shutdown_stops_server() {
        let (mut monitor, driver) = monitor(vec![MockDevice::new("3554", "b00e", "usb", true)]);
        monitor.start(Instant::now());
        monitor.shutdown();
        assert!(driver.serving_path().is_none());
        assert!(monitor.active_path().is_none());
    }
}
