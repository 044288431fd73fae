//! In-memory channels for exercising the hub without a network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::{ChannelError, Frame, FrameSink, FrameStream};

pub(crate) struct MemorySink {
    tx: mpsc::UnboundedSender<Frame>,
    fail_writes: Arc<AtomicBool>,
    fail_close: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

pub(crate) struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Result<Frame, ChannelError>>,
}

/// Client end of an in-memory channel
pub(crate) struct Peer {
    /// Frames the client sends to the server; dropping it ends the stream
    pub inbound: Option<mpsc::UnboundedSender<Result<Frame, ChannelError>>>,
    /// Frames the server wrote to this client
    pub outbound: mpsc::UnboundedReceiver<Frame>,
    fail_writes: Arc<AtomicBool>,
    fail_close: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl Peer {
    pub fn send(&self, frame: &str) {
        if let Some(inbound) = &self.inbound {
            inbound.send(Ok(frame.as_bytes().to_vec())).unwrap();
        }
    }

    pub fn inject_error(&self, message: &str) {
        if let Some(inbound) = &self.inbound {
            inbound
                .send(Err(ChannelError::Transport(message.to_string())))
                .unwrap();
        }
    }

    /// Simulate a clean close from the client side
    pub fn hang_up(&mut self) {
        self.inbound.take();
    }

    /// Make every subsequent server write to this peer fail
    pub fn break_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Make the server's close of this channel fail
    pub fn break_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn received(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

pub(crate) fn pair() -> (MemorySink, MemoryStream, Peer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let fail_writes = Arc::new(AtomicBool::new(false));
    let fail_close = Arc::new(AtomicBool::new(false));
    let closes = Arc::new(AtomicUsize::new(0));

    let sink = MemorySink {
        tx: out_tx,
        fail_writes: Arc::clone(&fail_writes),
        fail_close: Arc::clone(&fail_close),
        closes: Arc::clone(&closes),
        closed: false,
    };
    let stream = MemoryStream { rx: in_rx };
    let peer = Peer {
        inbound: Some(in_tx),
        outbound: out_rx,
        fail_writes,
        fail_close,
        closes,
    };

    (sink, stream, peer)
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChannelError::Transport("broken pipe".to_string()));
        }
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.tx.send(frame.to_vec()).map_err(|_| ChannelError::Closed)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(ChannelError::Transport("close handshake failed".to_string()));
        }
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError> {
        match self.rx.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
