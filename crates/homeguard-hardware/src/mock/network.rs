//! Mock network uplink.

use crate::{HardwareError, Result, traits::NetworkLink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct LinkState {
    connected: AtomicBool,
    reconnect_fails: AtomicBool,
    reconnects: AtomicUsize,
}

/// Mock uplink; starts connected.
#[derive(Debug)]
pub struct MockNetwork {
    state: Arc<LinkState>,
}

/// Controls a [`MockNetwork`].
#[derive(Debug, Clone)]
pub struct MockNetworkHandle {
    state: Arc<LinkState>,
}

impl MockNetwork {
    pub fn new() -> (Self, MockNetworkHandle) {
        let state = Arc::new(LinkState::default());
        state.connected.store(true, Ordering::Relaxed);
        (
            Self {
                state: Arc::clone(&state),
            },
            MockNetworkHandle { state },
        )
    }
}

impl NetworkLink for MockNetwork {
    async fn is_connected(&mut self) -> bool {
        self.state.connected.load(Ordering::Relaxed)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.state.reconnects.fetch_add(1, Ordering::Relaxed);
        if self.state.reconnect_fails.load(Ordering::Relaxed) {
            return Err(HardwareError::communication("association failed"));
        }
        self.state.connected.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl MockNetworkHandle {
    pub fn set_connected(&self, connected: bool) {
        self.state.connected.store(connected, Ordering::Relaxed);
    }

    pub fn set_reconnect_fails(&self, fails: bool) {
        self.state.reconnect_fails.store(fails, Ordering::Relaxed);
    }

    pub fn reconnect_count(&self) -> usize {
        self.state.reconnects.load(Ordering::Relaxed)
    }
}
