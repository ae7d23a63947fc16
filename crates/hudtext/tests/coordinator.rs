use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use hudtext::{Coordinator, HudConfig, MemoryTransport, Priority, SchedulerState};
use serial_test::serial;

fn config(min_interval_ms: u64, max_delay_ms: u64) -> HudConfig {
    HudConfig::from_yaml(&format!(
        "schedule:\n  min_interval_ms: {min_interval_ms}\nhook:\n  max_delay_ms: {max_delay_ms}\n"
    ))
    .unwrap()
}

fn wait_for(transport: &MemoryTransport<u32>, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if transport.len() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
#[serial]
fn test_burst_delivers_latest_content_once() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(100, 3000), transport.clone());

    for text in ["one", "two", "<allcaps>three"] {
        hud.show(&1, text, Priority::NORMAL, Duration::from_millis(100))
            .unwrap();
    }

    assert!(wait_for(&transport, 1));
    thread::sleep(Duration::from_millis(400));
    assert_eq!(
        transport.sent(),
        vec![(1, "<allcaps>three</allcaps>".to_string())]
    );
    assert_eq!(hud.state(&1), Some(SchedulerState::Idle));
}

#[test]
#[serial]
fn test_recipients_are_independent() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(500, 3000), transport.clone());

    hud.show(&1, "first", Priority::NORMAL, Duration::ZERO).unwrap();
    hud.show(&2, "second", Priority::NORMAL, Duration::ZERO).unwrap();

    // Neither recipient's rate limit holds back the other.
    assert!(wait_for(&transport, 2));
    let mut sent = transport.sent();
    sent.sort();
    assert_eq!(
        sent,
        vec![(1, "first".to_string()), (2, "second".to_string())]
    );
}

#[test]
#[serial]
fn test_external_display_repaints_after_it_expires() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(100, 300), transport.clone());

    hud.show(&1, "ours", Priority::NORMAL, Duration::ZERO).unwrap();
    assert!(wait_for(&transport, 1));

    // Shown for longer than the hook allows: repaint after max_delay.
    assert!(hud.external_display(&1, Duration::from_secs(10)));
    assert_eq!(hud.state(&1), Some(SchedulerState::Pending));
    thread::sleep(Duration::from_millis(150));
    assert_eq!(transport.len(), 1);

    assert!(wait_for(&transport, 2));
    assert_eq!(transport.sent()[1], (1, "ours".to_string()));
}

#[test]
#[serial]
fn test_external_display_counts_against_rate_limit() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(400, 3000), transport.clone());

    hud.show(&1, "ours", Priority::NORMAL, Duration::from_secs(60))
        .unwrap();
    hud.cancel(&1);

    let start = Instant::now();
    assert!(hud.external_display(&1, Duration::from_millis(50)));
    thread::sleep(Duration::from_millis(250));
    assert!(transport.is_empty());

    assert!(wait_for(&transport, 1));
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[test]
#[serial]
fn test_flush_now_skips_delay() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(100, 3000), transport.clone());

    hud.show(&1, "soon", Priority::LOW, Duration::from_secs(60))
        .unwrap();
    assert!(hud.flush_now(&1));
    assert!(wait_for(&transport, 1));
    assert_eq!(transport.sent(), vec![(1, "soon".to_string())]);
}

#[test]
#[serial]
fn test_removed_recipient_gets_nothing() {
    let transport = MemoryTransport::new();
    let hud = Coordinator::new(config(100, 3000), transport.clone());

    hud.show(&1, "gone", Priority::NORMAL, Duration::from_millis(100))
        .unwrap();
    assert!(hud.remove(&1));
    thread::sleep(Duration::from_millis(300));
    assert!(transport.is_empty());
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "layout:\n  display_width: 640\nschedule:\n  min_interval_ms: 250").unwrap();

    let config = HudConfig::from_path(file.path()).unwrap();
    assert_eq!(config.layout.display_width, 640.0);
    assert_eq!(config.schedule.min_interval(), Duration::from_millis(250));

    let hud: Coordinator<u32> = Coordinator::new(config, MemoryTransport::new());
    let compiled = hud.compiler().compile("plain");
    assert_eq!(compiled.text, "plain");
    assert_eq!(hud.config().layout.display_width, 640.0);
}
