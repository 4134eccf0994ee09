use std::{collections::VecDeque, time::Duration};

use plsreactor::{EventLoopBridge, EventProcessor, Wake};

/// Processeur scripté : chaque appel consomme le délai suivant
struct Scripted {
    delays: VecDeque<Duration>,
    calls: usize,
}

impl Scripted {
    fn new(delays_ms: &[u64]) -> Self {
        Self {
            delays: delays_ms.iter().map(|&ms| Duration::from_millis(ms)).collect(),
            calls: 0,
        }
    }
}

impl EventProcessor for Scripted {
    type Notification = usize;

    fn process_events(&mut self, out: &mut Vec<usize>) -> Duration {
        self.calls += 1;
        out.push(self.calls);
        self.delays.pop_front().unwrap_or(Duration::from_secs(1))
    }
}

#[tokio::test]
async fn test_drain_loops_until_non_zero_delay() {
    let (mut bridge, _signal) = EventLoopBridge::new(64);
    let mut processor = Scripted::new(&[0, 0, 250]);
    let mut out = Vec::new();

    let delay = bridge.drain(&mut processor, &mut out);
    assert_eq!(delay, Duration::from_millis(250));
    assert_eq!(processor.calls, 3);
    assert_eq!(out, [1, 2, 3]);
    assert!(bridge.deadline().is_some());
}

#[tokio::test]
async fn test_drain_rounds_are_bounded() {
    let (mut bridge, _signal) = EventLoopBridge::new(4);
    let mut processor = Scripted::new(&[0; 10]);
    let mut out = Vec::new();

    let delay = bridge.drain(&mut processor, &mut out);
    assert_eq!(delay, Duration::ZERO);
    assert_eq!(processor.calls, 4);

    // La minuterie armée à zéro relance immédiatement le drainage
    assert_eq!(bridge.wait().await, Wake::Timer);
}

#[tokio::test]
async fn test_signal_wakes_the_bridge() {
    let (mut bridge, signal) = EventLoopBridge::new(8);
    let mut processor = Scripted::new(&[60_000]);
    bridge.drain(&mut processor, &mut Vec::new());

    let notifier = std::thread::spawn(move || signal.notify());
    assert!(notifier.join().unwrap());

    let wake = tokio::time::timeout(Duration::from_secs(5), bridge.wait())
        .await
        .unwrap();
    assert_eq!(wake, Wake::Signal);
}

#[tokio::test]
async fn test_signals_coalesce() {
    let (mut bridge, signal) = EventLoopBridge::new(8);
    assert!(signal.notify());
    assert!(signal.notify());
    assert!(signal.notify());

    assert_eq!(bridge.wait().await, Wake::Signal);

    // Plus rien en file : seule la minuterie peut réveiller
    let mut processor = Scripted::new(&[20]);
    bridge.drain(&mut processor, &mut Vec::new());
    assert_eq!(bridge.wait().await, Wake::Timer);
}

#[tokio::test]
async fn test_drain_consumes_pending_signals() {
    let (mut bridge, signal) = EventLoopBridge::new(8);
    signal.notify();

    let mut processor = Scripted::new(&[20]);
    bridge.drain(&mut processor, &mut Vec::new());
    assert_eq!(bridge.wait().await, Wake::Timer);
}

#[tokio::test]
async fn test_closed_signal_is_reported_once() {
    let (mut bridge, signal) = EventLoopBridge::new(8);
    drop(signal);

    assert_eq!(bridge.wait().await, Wake::Closed);

    let mut processor = Scripted::new(&[10]);
    bridge.drain(&mut processor, &mut Vec::new());
    assert_eq!(bridge.wait().await, Wake::Timer);
}

#[tokio::test]
async fn test_notify_after_bridge_dropped() {
    let (bridge, signal) = EventLoopBridge::new(8);
    drop(bridge);
    assert!(!signal.notify());
}
