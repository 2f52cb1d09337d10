//! Shared runtime event plumbing and the domain-level error enum every
//! other crate in this workspace propagates.
//!
//! Subsystems (panel, canvas, plugin runtime, Wi-Fi FSM, OTA engine) are
//! independently concurrent workers; this crate gives them a common
//! channel-based way to drive periodic work without any of them depending
//! on each other directly. `pin-bin` registers a [`TickEventSource`] on an
//! [`EventSourceRegistry`] to drive the Wi-Fi FSM's 1 Hz tick.

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod error;
pub use error::PinError;

// The runtime event loop uses a bounded mpsc channel sized by `EVENT_CHANNEL_CAP`. A single
// producer (one per subsystem) backs off via `blocking_send`/`send().await` rather than dropping
// events; losing a tick or a link transition silently would leave observers unable to reconstruct
// what happened, so backpressure is preferred over lossy drop.
pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Periodic notification produced by a registered [`AsyncEventSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Monotonic tick driving the Wi-Fi FSM (1 Hz).
    Tick,
}

/// Trait implemented by any async event producer. Implementors hold their own
/// configuration and spawn one background task pushing `Event`s into the
/// shared channel. Each source is failure-isolated: it must stop promptly
/// once `tx.send(..).await` fails (channel closed), never busy-loop.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at boot (the Wi-Fi 1 Hz
/// ticker today; more sources register the same way).
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their `JoinHandle`s. Draining
    /// `self.sources` prevents a second call from double-spawning.
    ///
    /// Shutdown ordering: the caller should drop its own `Sender` clone
    /// before awaiting the returned handles so each source observes the
    /// closed channel and exits cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Built-in monotonic tick source shared by Wi-Fi's 1 Hz FSM driver.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn registry_spawns_ticker_and_emits_repeatedly() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(TickEventSource::new(Duration::from_millis(10)));
        let handles = reg.spawn_all(&tx);

        let mut ticks_seen = 0;
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_millis(200) && ticks_seen < 3 {
            if let Ok(Some(Event::Tick)) = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await {
                ticks_seen += 1;
            }
        }
        assert!(ticks_seen >= 3, "expected the tick source to emit repeatedly");

        drop(tx);
        drop(rx);
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
        }
    }

    struct MockCloseSource {
        flag: Arc<AtomicBool>,
    }

    impl AsyncEventSource for MockCloseSource {
        fn name(&self) -> &'static str {
            "mock_close"
        }
        fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
            let flag = self.flag;
            tokio::spawn(async move {
                tx.closed().await;
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn registry_sources_exit_on_channel_drop() {
        let (tx, rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        reg.register(MockCloseSource { flag: flag.clone() });
        let handles = reg.spawn_all(&tx);

        drop(tx);
        drop(rx);

        for handle in handles {
            match tokio::time::timeout(Duration::from_millis(50), handle).await {
                Ok(join_res) => join_res.expect("source task should exit cleanly"),
                Err(_) => panic!("source task did not observe channel closure"),
            }
        }
        assert!(flag.load(Ordering::SeqCst));
    }
}
