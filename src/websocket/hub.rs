//! WebSocket Connection Hub
//!
//! Tracks every live client channel, runs one read loop per channel and fans
//! raw frames out to all of them. Inbound frames are handed to an injected
//! [`MessageProcessor`]; the hub itself never looks inside a frame.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::channel::{FrameSink, FrameStream};

/// Unique identifier for a registered channel.
///
/// Generated by the hub and never reused, so a stale id can't reach a newer
/// channel.
pub type ChannelId = u64;

type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;

/// Receives every inbound frame read by the hub
#[async_trait]
pub trait MessageProcessor: Send + Sync + 'static {
    /// Handle one frame read from `origin`.
    ///
    /// Must not fail the read loop: malformed input is the processor's to
    /// report and drop.
    async fn process(&self, origin: ChannelId, frame: &[u8], hub: &ConnectionHub);
}

/// Configuration for the connection hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Also deliver a fanned-out frame back to the channel it came from
    #[serde(default = "default_echo_to_sender")]
    pub echo_to_sender: bool,
}

fn default_echo_to_sender() -> bool {
    true
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            echo_to_sender: default_echo_to_sender(),
        }
    }
}

/// Registry entry for one live channel
struct ChannelEntry {
    /// Stops this channel's read loop
    cancel: CancellationToken,
    /// Outbound side, shared with in-flight broadcasts
    sink: SharedSink,
}

/// Manages all client channels
pub struct ConnectionHub {
    /// Active channels: ChannelId → ChannelEntry
    channels: RwLock<BTreeMap<ChannelId, ChannelEntry>>,
    next_id: AtomicU64,
    /// Set once shutdown starts; no channel is admitted afterwards
    closing: AtomicBool,
    processor: Arc<dyn MessageProcessor>,
    config: HubConfig,
}

impl ConnectionHub {
    /// Create a new connection hub
    pub fn new(config: HubConfig, processor: Arc<dyn MessageProcessor>) -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            closing: AtomicBool::new(false),
            processor,
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Whether [`close_all`](Self::close_all) has started
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Register a new channel
    ///
    /// Returns the channel's id and the token that stops its read loop, or an
    /// error once the hub is shutting down.
    pub async fn register(
        &self,
        sink: impl FrameSink,
    ) -> Result<(ChannelId, CancellationToken), HubError> {
        let mut channels = self.channels.write().await;
        if self.is_closing() {
            return Err(HubError::ShuttingDown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let sink: Box<dyn FrameSink> = Box::new(sink);
        channels.insert(
            id,
            ChannelEntry {
                cancel: cancel.clone(),
                sink: Arc::new(Mutex::new(sink)),
            },
        );
        let total = channels.len();
        drop(channels);

        tracing::info!(channel_id = id, connections = total, "WebSocket connected");
        Ok((id, cancel))
    }

    /// Tear down a channel: stop its read loop, drop it from the registry and
    /// close it.
    ///
    /// Idempotent. Only the call that actually removes the entry closes the
    /// channel, so racing callers collapse into one close. Returns whether this
    /// call did the teardown.
    pub async fn unregister(&self, id: ChannelId) -> bool {
        let (entry, remaining) = {
            let mut channels = self.channels.write().await;
            let entry = channels.remove(&id);
            (entry, channels.len())
        };

        let Some(entry) = entry else {
            return false;
        };

        entry.cancel.cancel();
        if let Err(e) = entry.sink.lock().await.close().await {
            tracing::warn!(channel_id = id, error = %e, "Failed to close channel");
        }

        tracing::info!(channel_id = id, connections = remaining, "WebSocket disconnected");
        true
    }

    /// Deliver a raw frame to every registered channel
    ///
    /// Returns how many channels accepted the write.
    pub async fn broadcast(&self, frame: &[u8]) -> usize {
        self.broadcast_except(frame, None).await
    }

    /// Fan a frame that arrived on `origin` out to the other channels, and back
    /// to `origin` too when `echo_to_sender` is set.
    pub async fn fan_out(&self, origin: ChannelId, frame: &[u8]) -> usize {
        if self.config.echo_to_sender {
            self.broadcast(frame).await
        } else {
            self.broadcast_except(frame, Some(origin)).await
        }
    }

    /// Deliver a raw frame to every registered channel except `skip`
    ///
    /// Writes happen one channel at a time outside the registry lock. A channel
    /// whose write fails is unregistered; the rest still get the frame.
    pub async fn broadcast_except(&self, frame: &[u8], skip: Option<ChannelId>) -> usize {
        let targets: Vec<(ChannelId, SharedSink)> = {
            let channels = self.channels.read().await;
            channels
                .iter()
                .filter(|(id, _)| Some(**id) != skip)
                .map(|(id, entry)| (*id, Arc::clone(&entry.sink)))
                .collect()
        };

        let mut delivered = 0;
        for (id, sink) in targets {
            let result = sink.lock().await.send(frame).await;
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(channel_id = id, error = %e, "Failed to broadcast message");
                    self.unregister(id).await;
                }
            }
        }

        tracing::trace!(bytes = frame.len(), delivered, "Broadcast frame");
        delivered
    }

    /// Read frames from a registered channel until it ends
    ///
    /// Each frame goes to the processor. The loop ends on end-of-stream, on
    /// cancellation (also while a read is pending) or on a transport error, and
    /// always unregisters the channel on the way out.
    pub async fn run_read_loop(
        &self,
        id: ChannelId,
        cancel: CancellationToken,
        mut stream: impl FrameStream,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(channel_id = id, "Read loop cancelled");
                    break;
                }
                next = stream.recv() => next,
            };

            match next {
                Ok(Some(frame)) => self.processor.process(id, &frame, self).await,
                Ok(None) => {
                    tracing::debug!(channel_id = id, "Peer closed the channel");
                    break;
                }
                Err(e) => {
                    if cancel.is_cancelled() {
                        tracing::debug!(channel_id = id, error = %e, "Read failed after cancellation");
                    } else {
                        tracing::error!(channel_id = id, error = %e, "WebSocket read error");
                    }
                    break;
                }
            }
        }

        self.unregister(id).await;
    }

    /// Register a channel and run its read loop to completion
    pub async fn serve(
        &self,
        sink: impl FrameSink,
        stream: impl FrameStream,
    ) -> Result<(), HubError> {
        let (id, cancel) = self.register(sink).await?;
        self.run_read_loop(id, cancel, stream).await;
        Ok(())
    }

    /// Close every channel. Used at shutdown.
    ///
    /// Channels registering after this starts are refused.
    pub async fn close_all(&self) {
        self.closing.store(true, Ordering::SeqCst);

        let ids: Vec<ChannelId> = self.channels.read().await.keys().copied().collect();
        tracing::info!(connections = ids.len(), "Closing all WebSocket connections");

        for id in ids {
            self.unregister(id).await;
        }
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::memory::{self, Peer};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    /// Records frames and echoes each one to the whole hub
    #[derive(Default)]
    struct EchoProcessor {
        seen: std::sync::Mutex<Vec<(ChannelId, Vec<u8>)>>,
    }

    #[async_trait]
    impl MessageProcessor for EchoProcessor {
        async fn process(&self, origin: ChannelId, frame: &[u8], hub: &ConnectionHub) {
            self.seen.lock().unwrap().push((origin, frame.to_vec()));
            hub.fan_out(origin, frame).await;
        }
    }

    fn new_hub() -> (Arc<ConnectionHub>, Arc<EchoProcessor>) {
        let processor = Arc::new(EchoProcessor::default());
        let hub = Arc::new(ConnectionHub::new(
            HubConfig::default(),
            Arc::clone(&processor) as Arc<dyn MessageProcessor>,
        ));
        (hub, processor)
    }

    fn spawn_channel(hub: &Arc<ConnectionHub>) -> (JoinHandle<Result<(), HubError>>, Peer) {
        let (sink, stream, peer) = memory::pair();
        let hub = Arc::clone(hub);
        let handle = tokio::spawn(async move { hub.serve(sink, stream).await });
        (handle, peer)
    }

    async fn wait_for_count(hub: &ConnectionHub, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.connection_count().await != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("connection count never reached expected value");
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert!(config.echo_to_sender);
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let (hub, _) = new_hub();
        let (sink, _stream, peer) = memory::pair();

        let (id, cancel) = hub.register(sink).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);

        assert!(hub.unregister(id).await);
        assert_eq!(hub.connection_count().await, 0);
        assert!(cancel.is_cancelled());
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let (hub, _) = new_hub();
        let (sink1, _s1, _p1) = memory::pair();
        let (sink2, _s2, _p2) = memory::pair();

        let (id1, _) = hub.register(sink1).await.unwrap();
        hub.unregister(id1).await;
        let (id2, _) = hub.register(sink2).await.unwrap();

        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (hub, _) = new_hub();
        let (sink, _stream, peer) = memory::pair();
        let (id, _) = hub.register(sink).await.unwrap();

        assert!(hub.unregister(id).await);
        assert!(!hub.unregister(id).await);

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unregister_closes_once() {
        let (hub, _) = new_hub();
        let (sink, _stream, peer) = memory::pair();
        let (id, _) = hub.register(sink).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move { hub.unregister(id).await })
            })
            .collect();

        let mut closed = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                closed += 1;
            }
        }

        assert_eq!(closed, 1);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_unregister_removes_channel_when_close_fails() {
        let (hub, _) = new_hub();
        let (sink, _stream, peer) = memory::pair();
        peer.break_close();
        let (id, cancel) = hub.register(sink).await.unwrap();

        assert!(hub.unregister(id).await);
        assert_eq!(hub.connection_count().await, 0);
        assert!(cancel.is_cancelled());
        assert_eq!(peer.close_count(), 1);

        assert!(!hub.unregister(id).await);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_all_drains_channels_whose_close_fails() {
        let (hub, _) = new_hub();
        let (sink1, _s1, p1) = memory::pair();
        let (sink2, _s2, p2) = memory::pair();
        p1.break_close();
        hub.register(sink1).await.unwrap();
        hub.register(sink2).await.unwrap();

        hub.close_all().await;

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(p1.close_count(), 1);
        assert_eq!(p2.close_count(), 1);
    }

    #[tokio::test]
    async fn test_unregister_unknown_id_is_noop() {
        let (hub, _) = new_hub();
        assert!(!hub.unregister(42).await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_channel() {
        let (hub, _) = new_hub();
        let mut peers = Vec::new();
        for _ in 0..3 {
            let (sink, _stream, peer) = memory::pair();
            hub.register(sink).await.unwrap();
            peers.push(peer);
        }

        let delivered = hub.broadcast(b"hello").await;

        assert_eq!(delivered, 3);
        for peer in &mut peers {
            assert_eq!(peer.received(), vec![b"hello".to_vec()]);
        }
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failed_channel() {
        let (hub, _) = new_hub();
        let mut peers = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (sink, _stream, peer) = memory::pair();
            let (id, _) = hub.register(sink).await.unwrap();
            ids.push(id);
            peers.push(peer);
        }
        peers[1].break_writes();

        let delivered = hub.broadcast(b"frame").await;

        assert_eq!(delivered, 3);
        assert_eq!(hub.connection_count().await, 3);
        assert!(!hub.unregister(ids[1]).await);
        for (i, peer) in peers.iter_mut().enumerate() {
            if i == 1 {
                assert!(peer.received().is_empty());
            } else {
                assert_eq!(peer.received(), vec![b"frame".to_vec()]);
            }
        }
    }

    #[tokio::test]
    async fn test_fan_out_without_echo_skips_sender() {
        let hub = ConnectionHub::new(
            HubConfig {
                echo_to_sender: false,
                ..Default::default()
            },
            Arc::new(EchoProcessor::default()),
        );
        let (sink1, _s1, mut p1) = memory::pair();
        let (sink2, _s2, mut p2) = memory::pair();
        let (id1, _) = hub.register(sink1).await.unwrap();
        hub.register(sink2).await.unwrap();

        let delivered = hub.fan_out(id1, b"stroke").await;

        assert_eq!(delivered, 1);
        assert!(p1.received().is_empty());
        assert_eq!(p2.received(), vec![b"stroke".to_vec()]);
    }

    #[tokio::test]
    async fn test_read_loop_hands_frames_to_processor() {
        let (hub, processor) = new_hub();
        let (handle, mut peer) = spawn_channel(&hub);
        wait_for_count(&hub, 1).await;

        peer.send("first");
        peer.send("second");
        peer.hang_up();
        handle.await.unwrap().unwrap();

        let seen: Vec<Vec<u8>> = processor
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, frame)| frame.clone())
            .collect();
        assert_eq!(seen, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(peer.received(), vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[tokio::test]
    async fn test_read_loop_unregisters_on_end_of_stream() {
        let (hub, _) = new_hub();
        let (handle, mut peer) = spawn_channel(&hub);
        wait_for_count(&hub, 1).await;

        peer.hang_up();
        handle.await.unwrap().unwrap();

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_read_loop_unregisters_on_transport_error() {
        let (hub, _) = new_hub();
        let (handle, peer) = spawn_channel(&hub);
        wait_for_count(&hub, 1).await;

        peer.inject_error("connection reset");
        handle.await.unwrap().unwrap();

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_read() {
        let (hub, _) = new_hub();
        let (sink, stream, peer) = memory::pair();
        let (id, cancel) = hub.register(sink).await.unwrap();

        let loop_hub = Arc::clone(&hub);
        let handle = tokio::spawn(async move { loop_hub.run_read_loop(id, cancel, stream).await });
        tokio::task::yield_now().await;

        hub.unregister(id).await;
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("read loop did not observe cancellation")
            .unwrap();

        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_all() {
        let (hub, _) = new_hub();
        let mut handles = Vec::new();
        let mut peers = Vec::new();
        for _ in 0..3 {
            let (handle, peer) = spawn_channel(&hub);
            handles.push(handle);
            peers.push(peer);
        }
        wait_for_count(&hub, 3).await;

        hub.close_all().await;

        assert_eq!(hub.connection_count().await, 0);
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .expect("read loop still running after close_all")
                .unwrap()
                .unwrap();
        }
        for peer in &peers {
            assert_eq!(peer.close_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_register_refused_after_close_all() {
        let (hub, _) = new_hub();
        hub.close_all().await;

        let (sink, _stream, _peer) = memory::pair();
        let result = hub.register(sink).await;

        assert!(hub.is_closing());
        assert!(matches!(result, Err(HubError::ShuttingDown)));
    }
}
