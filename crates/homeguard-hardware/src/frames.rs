//! Receiving end of the bridge reader thread.

use homeguard_protocol::BridgeFrame;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

/// Frames decoded by the reader thread.
///
/// Once the thread has stopped the queue reports it once and then stays
/// empty, so the control loop keeps running without the keypad.
#[derive(Debug)]
pub(crate) struct FrameQueue {
    frames: mpsc::Receiver<BridgeFrame>,
    stopped: bool,
}

impl FrameQueue {
    pub(crate) fn new(frames: mpsc::Receiver<BridgeFrame>) -> Self {
        Self {
            frames,
            stopped: false,
        }
    }

    pub(crate) fn next(&mut self) -> Option<BridgeFrame> {
        if self.stopped {
            return None;
        }
        match self.frames.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Bridge reader stopped, keypad input unavailable");
                self.stopped = true;
                None
            }
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }
}
