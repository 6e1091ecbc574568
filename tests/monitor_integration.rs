//! Monitor behaviour against the mock driver with a simulated clock

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use monka_battery::{
    Alert, AlertKind, Monitor, Notifier, NotifyError, Settings, StatusExport, VendorConfig,
};
use monka_transport::{BatteryStatus, DriverEvent, MockDevice, MockDriver};
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Alert>>>);

impl Recorder {
    fn kinds(&self) -> Vec<AlertKind> {
        self.0.lock().unwrap().iter().map(|a| a.kind).collect()
    }
}

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct Harness {
    monitor: Monitor,
    events: mpsc::Receiver<DriverEvent>,
    driver: Arc<MockDriver>,
    alerts: Recorder,
    t0: Instant,
}

impl Harness {
    fn new(devices: Vec<MockDevice>, settings: Settings) -> Self {
        let driver = Arc::new(MockDriver::with_devices(devices));
        let alerts = Recorder::default();
        let mut monitor = Monitor::new(
            driver.clone(),
            &VendorConfig::builtin(),
            settings,
            Box::new(alerts.clone()),
        );
        let events = monitor.take_events().unwrap();
        let t0 = Instant::now();
        monitor.start(t0);
        Self {
            monitor,
            events,
            driver,
            alerts,
            t0,
        }
    }

    fn at(&self, secs: u64) -> Instant {
        self.t0 + Duration::from_secs(secs)
    }

    /// Battery tick followed by delivery of whatever the driver answered
    async fn cycle(&mut self, now: Instant) {
        self.monitor.on_battery_tick(now).await;
        while let Ok(event) = self.events.try_recv() {
            self.monitor.handle_driver_event(event, now);
        }
    }
}

fn wired_and_dongle() -> Vec<MockDevice> {
    vec![
        MockDevice::new("3554", "b012", "dongle", true),
        MockDevice::new("3554", "b00e", "usb", true),
    ]
}

fn reading(level: u8, charging: bool, voltage: u16) -> Option<BatteryStatus> {
    Some(BatteryStatus {
        level,
        charging,
        voltage,
    })
}

#[tokio::test]
async fn test_reports_battery_of_active_connection() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_reading(reading(0, true, 4000));

    assert_eq!(h.monitor.active_path(), Some("usb"));
    h.cycle(h.at(0)).await;

    let status = h.monitor.tray_status(h.at(0));
    assert!(status.online);
    assert_eq!(status.battery_level, 75);
    assert_eq!(status.tooltip(), "Monka M1 Pro - 75% (Charging)");

    // silent for longer than the liveness window
    assert_eq!(
        h.monitor.tray_status(h.at(10)).tooltip(),
        "Monka M1 Pro - Offline"
    );
}

#[tokio::test]
async fn test_fails_over_to_dongle_when_wired_goes_silent() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_reading(reading(0, false, 4000));
    h.cycle(h.at(0)).await;

    h.driver.set_online("usb", false);
    h.cycle(h.at(4)).await;
    h.monitor.on_health_check(h.at(4));
    assert_eq!(h.monitor.active_path(), Some("usb"));

    h.monitor.on_health_check(h.at(5));
    assert_eq!(h.monitor.active_path(), Some("dongle"));
    assert_eq!(h.driver.serving_path().as_deref(), Some("dongle"));
    assert!(h.monitor.devices().iter().all(|d| !d.updating));

    h.cycle(h.at(5)).await;
    let status = h.monitor.tray_status(h.at(5));
    assert_eq!(status.tooltip(), "Monka Dongle - 75%");

    // the new connection answers, so no further switch
    h.monitor.on_health_check(h.at(7));
    assert_eq!(h.monitor.active_path(), Some("dongle"));
}

#[tokio::test]
async fn test_refresh_returns_to_wired() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_online("usb", false);
    h.monitor.on_health_check(h.at(6));
    assert_eq!(h.monitor.active_path(), Some("dongle"));

    h.driver.set_online("usb", true);
    h.monitor.refresh(h.at(30));
    assert_eq!(h.monitor.active_path(), Some("usb"));

    // same selection, server stays on the wired path
    h.monitor.refresh(h.at(60));
    assert_eq!(h.driver.serving_path().as_deref(), Some("usb"));
}

#[tokio::test]
async fn test_nothing_left_after_failover() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_devices(Vec::new());
    h.monitor.on_health_check(h.at(6));

    assert!(h.monitor.active_path().is_none());
    assert!(h.driver.serving_path().is_none());
    assert!(h.monitor.devices().is_empty());
    assert_eq!(
        h.monitor.tray_status(h.at(6)).tooltip(),
        "Monka Device - Offline"
    );

    // no active target, so health checks stay quiet
    h.monitor.on_health_check(h.at(20));
    assert!(h.monitor.active_path().is_none());
}

#[tokio::test]
async fn test_full_charge_alert_after_debounce() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_reading(reading(100, true, 4110));

    // first tick has no reading yet, then seven evaluations at 100%
    for i in 0..8 {
        h.cycle(h.at(i * 5)).await;
    }
    assert!(h.alerts.kinds().is_empty());

    h.cycle(h.at(40)).await;
    assert_eq!(h.alerts.kinds(), vec![AlertKind::FullCharge]);
    let alert = h.alerts.0.lock().unwrap()[0].clone();
    assert_eq!(alert.body, "Your Monka M1 Pro is fully charged!");

    for i in 9..20 {
        h.cycle(h.at(i * 5)).await;
    }
    assert_eq!(h.alerts.kinds().len(), 1);
}

#[tokio::test]
async fn test_low_battery_alert_once() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_reading(reading(15, false, 0));

    for i in 0..6 {
        h.cycle(h.at(i * 5)).await;
    }
    assert_eq!(h.alerts.kinds(), vec![AlertKind::LowBattery]);
}

#[tokio::test]
async fn test_no_alert_when_disabled() {
    let settings = Settings {
        notifications_enabled: false,
        ..Settings::default()
    };
    let mut h = Harness::new(wired_and_dongle(), settings);
    h.driver.set_reading(reading(5, false, 0));

    for i in 0..4 {
        h.cycle(h.at(i * 5)).await;
    }
    assert!(h.alerts.kinds().is_empty());
}

#[tokio::test]
async fn test_no_alert_for_offline_device() {
    let mut h = Harness::new(wired_and_dongle(), Settings::default());
    h.driver.set_reading(reading(5, false, 0));
    h.cycle(h.at(0)).await;

    // reading is stale by the time the next tick evaluates it
    h.driver.set_online("usb", false);
    h.monitor.on_battery_tick(h.at(11)).await;
    assert!(h.alerts.kinds().is_empty());
}

#[tokio::test]
async fn test_status_export_follows_monitor() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("status");

    let driver = Arc::new(MockDriver::with_devices(wired_and_dongle()));
    driver.set_reading(reading(0, false, 4000));
    let export = StatusExport::new(&dir).unwrap();
    let mut monitor = Monitor::new(
        driver.clone(),
        &VendorConfig::builtin(),
        Settings::default(),
        Box::new(Recorder::default()),
    )
    .with_export(export);
    let mut events = monitor.take_events().unwrap();

    let now = Instant::now();
    monitor.start(now);
    monitor.on_battery_tick(now).await;
    while let Ok(event) = events.try_recv() {
        monitor.handle_driver_event(event, now);
    }

    let read = |name: &str| std::fs::read_to_string(dir.join(name)).unwrap();
    assert_eq!(read("capacity"), "75\n");
    assert_eq!(read("status"), "Discharging\n");
    assert_eq!(read("online"), "1\n");

    drop(monitor);
    assert!(!dir.exists());
}
