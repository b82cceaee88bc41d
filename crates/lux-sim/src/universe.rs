//! Virtual DMX universe transport
//!
//! An in-process stand-in for a network or USB DMX interface. Inbound
//! frames are injected from any thread and delivered by `run_event_loop`
//! on the listener's thread, exactly as a real transport would. Outbound
//! universes are kept in a bounded history for inspection, and sends can be
//! made to fail.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lux_protocol::dmx::UNIVERSE_SIZE;
use lux_protocol::{CompletionCallback, ReceiveCallback, TransportError, UniverseTransport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

type InboundFrame = (u16, Vec<u8>);

/// Default number of sent universes kept for inspection
pub const DEFAULT_SENT_HISTORY: usize = 64;

/// Configuration for creating a virtual universe transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualUniverseConfig {
    /// Display name/identifier
    pub id: String,
    /// Fail every send from the start
    pub fail_sends: bool,
    /// Most recent sends to keep; 0 disables recording
    pub sent_history: usize,
}

impl Default for VirtualUniverseConfig {
    fn default() -> Self {
        Self {
            id: "Virtual Universe".to_string(),
            fail_sends: false,
            sent_history: DEFAULT_SENT_HISTORY,
        }
    }
}

/// A universe handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentUniverse {
    /// Target universe
    pub universe: u16,
    /// The 512 channel values
    pub data: Vec<u8>,
}

/// Handle for injecting received frames
///
/// The event loop keeps running while any injector (or the transport's own
/// sender, until [`VirtualUniverse::close`]) is alive.
#[derive(Debug, Clone)]
pub struct UniverseInjector {
    tx: Sender<InboundFrame>,
}

impl UniverseInjector {
    /// Deliver a frame as if received on `universe`
    ///
    /// Returns false once the event loop has gone away.
    pub fn inject(&self, universe: u16, data: &[u8]) -> bool {
        self.tx.send((universe, data.to_vec())).is_ok()
    }
}

/// An in-process DMX transport
pub struct VirtualUniverse {
    id: String,
    inbound_tx: Mutex<Option<Sender<InboundFrame>>>,
    inbound_rx: Mutex<Option<Receiver<InboundFrame>>>,
    receivers: Mutex<HashMap<u16, Vec<ReceiveCallback>>>,
    sent: Mutex<VecDeque<SentUniverse>>,
    sent_history: usize,
    send_count: AtomicUsize,
    fail_sends: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VirtualUniverse {
    /// Create a transport with default settings
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(VirtualUniverseConfig {
            id: id.into(),
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn with_config(config: VirtualUniverseConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            id: config.id,
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
            receivers: Mutex::new(HashMap::new()),
            sent: Mutex::new(VecDeque::new()),
            sent_history: config.sent_history,
            send_count: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(config.fail_sends),
        }
    }

    /// Get the transport's identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Create an injector for inbound frames
    ///
    /// Fails once the transport has been closed.
    pub fn injector(&self) -> Result<UniverseInjector, TransportError> {
        lock(&self.inbound_tx)
            .as_ref()
            .map(|tx| UniverseInjector { tx: tx.clone() })
            .ok_or(TransportError::Closed)
    }

    /// Deliver a frame as if received on `universe`
    pub fn inject(&self, universe: u16, data: &[u8]) -> Result<(), TransportError> {
        if self.injector()?.inject(universe, data) {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }

    /// Stop accepting inbound frames
    ///
    /// The event loop returns once every outstanding injector is dropped
    /// and the frames already queued have been delivered.
    pub fn close(&self) {
        if lock(&self.inbound_tx).take().is_some() {
            info!("{}: closed", self.id);
        }
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Recorded sends, oldest first
    ///
    /// Holds at most `sent_history` entries; older sends are dropped.
    pub fn sent(&self) -> Vec<SentUniverse> {
        lock(&self.sent).iter().cloned().collect()
    }

    /// The most recent recorded send
    pub fn last_sent(&self) -> Option<SentUniverse> {
        lock(&self.sent).back().cloned()
    }

    /// Number of sends so far, including ones no longer recorded
    pub fn sent_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Forget the recorded sends
    pub fn clear_sent(&self) {
        lock(&self.sent).clear();
    }

    fn record_send(&self, universe: u16, data: &[u8]) {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if self.sent_history == 0 {
            return;
        }
        let mut sent = lock(&self.sent);
        while sent.len() >= self.sent_history {
            sent.pop_front();
        }
        sent.push_back(SentUniverse {
            universe,
            data: data.to_vec(),
        });
    }

    fn deliver(&self, universe: u16, data: &[u8]) {
        let mut receivers = lock(&self.receivers);
        match receivers.get_mut(&universe) {
            Some(callbacks) => {
                debug!(
                    "{}: delivering {} bytes on universe {}",
                    self.id,
                    data.len(),
                    universe
                );
                for callback in callbacks.iter_mut() {
                    callback(data);
                }
            }
            None => debug!(
                "{}: no receiver for universe {}, dropping frame",
                self.id, universe
            ),
        }
    }
}

impl UniverseTransport for VirtualUniverse {
    fn send_dmx(&self, universe: u16, data: &[u8; UNIVERSE_SIZE], on_complete: CompletionCallback) {
        self.record_send(universe, data);

        if self.fail_sends.load(Ordering::SeqCst) {
            warn!("{}: simulated send failure on universe {}", self.id, universe);
            on_complete(Err(TransportError::SendFailed {
                universe,
                reason: "simulated failure".to_string(),
            }));
        } else {
            on_complete(Ok(()));
        }
    }

    fn register_receive(
        &self,
        universe: u16,
        callback: ReceiveCallback,
    ) -> Result<(), TransportError> {
        lock(&self.receivers)
            .entry(universe)
            .or_default()
            .push(callback);
        debug!("{}: receiver registered on universe {}", self.id, universe);
        Ok(())
    }

    fn run_event_loop(&self) -> Result<(), TransportError> {
        let rx = lock(&self.inbound_rx)
            .take()
            .ok_or_else(|| TransportError::EventLoop("already running".to_string()))?;

        info!("{}: event loop running", self.id);
        while let Ok((universe, data)) = rx.recv() {
            self.deliver(universe, &data);
        }
        info!("{}: event loop finished", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_send_is_recorded() {
        let transport = VirtualUniverse::new("test");
        let mut data = [0u8; UNIVERSE_SIZE];
        data[3] = 99;

        let (tx, rx) = mpsc::channel();
        transport.send_dmx(1, &data, Box::new(move |result| tx.send(result).unwrap()));

        assert_eq!(rx.recv().unwrap(), Ok(()));
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.universe, 1);
        assert_eq!(sent.data[3], 99);
        assert_eq!(sent.data.len(), UNIVERSE_SIZE);
    }

    #[test]
    fn test_failing_send_still_recorded() {
        let transport = VirtualUniverse::new("test");
        transport.set_fail_sends(true);

        let (tx, rx) = mpsc::channel();
        transport.send_dmx(
            2,
            &[0; UNIVERSE_SIZE],
            Box::new(move |result| tx.send(result).unwrap()),
        );

        assert!(matches!(
            rx.recv().unwrap(),
            Err(TransportError::SendFailed { universe: 2, .. })
        ));
        assert_eq!(transport.sent_count(), 1);
    }

    #[test]
    fn test_sent_history_is_bounded() {
        let transport = VirtualUniverse::with_config(VirtualUniverseConfig {
            sent_history: 2,
            ..Default::default()
        });
        for value in 1..=5u8 {
            let mut data = [0u8; UNIVERSE_SIZE];
            data[0] = value;
            transport.send_dmx(1, &data, Box::new(|_| {}));
        }

        let kept: Vec<u8> = transport.sent().iter().map(|s| s.data[0]).collect();
        assert_eq!(kept, vec![4, 5]);
        assert_eq!(transport.sent_count(), 5);

        transport.clear_sent();
        assert!(transport.sent().is_empty());
        assert!(transport.last_sent().is_none());
        assert_eq!(transport.sent_count(), 5);
    }

    #[test]
    fn test_recording_disabled() {
        let transport = VirtualUniverse::with_config(VirtualUniverseConfig {
            sent_history: 0,
            ..Default::default()
        });
        transport.send_dmx(1, &[7; UNIVERSE_SIZE], Box::new(|_| {}));

        assert!(transport.sent().is_empty());
        assert_eq!(transport.sent_count(), 1);
    }

    #[test]
    fn test_event_loop_delivers_and_stops() {
        let transport = Arc::new(VirtualUniverse::new("test"));
        let (tx, rx) = mpsc::channel();
        transport
            .register_receive(1, Box::new(move |data| tx.send(data.to_vec()).unwrap()))
            .unwrap();

        transport.inject(1, &[1, 2, 3]).unwrap();
        transport.inject(7, &[4]).unwrap();
        transport.inject(1, &[5]).unwrap();
        transport.close();

        let runner = Arc::clone(&transport);
        let handle = thread::spawn(move || runner.run_event_loop());
        handle.join().unwrap().unwrap();

        let received: Vec<Vec<u8>> = rx.try_iter().collect();
        assert_eq!(received, vec![vec![1, 2, 3], vec![5]]);
    }

    #[test]
    fn test_event_loop_runs_once() {
        let transport = VirtualUniverse::new("test");
        transport.close();
        transport.run_event_loop().unwrap();

        assert!(matches!(
            transport.run_event_loop(),
            Err(TransportError::EventLoop(_))
        ));
    }

    #[test]
    fn test_injector_after_close() {
        let transport = VirtualUniverse::new("test");
        let injector = transport.injector().unwrap();
        transport.close();

        assert!(matches!(transport.injector(), Err(TransportError::Closed)));
        // Existing injectors keep working until the loop is gone
        assert!(injector.inject(1, &[1]));
    }
}
