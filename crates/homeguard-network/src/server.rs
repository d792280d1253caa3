//! TCP server for real-time subscribers.
//!
//! Every subscriber holds one TCP connection carrying newline-delimited
//! text. The server never interprets commands: inbound lines are tagged with
//! the subscriber's id and queued for the hub's control loop, and outbound
//! lines published by the hub are written to the addressed subscriber, or to
//! all of them.
//!
//! # Architecture
//!
//! ```text
//! subscriber A ┐                     ┌─> mpsc<SubscriberMessage> ──> hub
//! subscriber B ├──> SubscriberServer ┤
//! subscriber C ┘   (task per conn)   └─< broadcast<Outbound> <──── hub
//! ```
//!
//! Delivery is fire-and-forget: a line published while nobody is connected
//! is dropped, and a subscriber that falls too far behind skips what it
//! missed.

use futures::{SinkExt, StreamExt};
use homeguard_protocol::{Outbound, SubscriberId, SubscriberMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, trace, warn};

/// Longest accepted inbound line.
const MAX_LINE_LENGTH: usize = 1024;

/// Outbound lines buffered per subscriber before it starts skipping.
const OUTBOUND_CAPACITY: usize = 64;

/// Configuration for the subscriber server.
#[derive(Debug, Clone)]
pub struct SubscriberServerConfig {
    pub bind_addr: SocketAddr,

    /// Maximum number of simultaneous subscribers.
    pub max_connections: usize,

    /// Capacity of the inbound queue feeding the control loop.
    pub inbound_capacity: usize,
}

/// Errors that can occur during subscriber server operations.
#[derive(Debug, Error)]
pub enum SubscriberServerError {
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The hub's ends of the subscriber channel.
#[derive(Debug)]
pub struct SubscriberChannels {
    /// Lines received from subscribers.
    pub inbound: mpsc::Receiver<SubscriberMessage>,

    /// Publishes lines to subscribers.
    pub outbound: broadcast::Sender<Outbound>,
}

impl SubscriberChannels {
    /// Channels not attached to any server, for running the hub without
    /// real-time subscribers. Returns the sender feeding `inbound`.
    #[must_use]
    pub fn detached(inbound_capacity: usize) -> (Self, mpsc::Sender<SubscriberMessage>) {
        let (inbound_tx, inbound) = mpsc::channel(inbound_capacity);
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        (Self { inbound, outbound }, inbound_tx)
    }
}

/// TCP server for real-time subscribers.
///
/// # Example
///
/// ```no_run
/// use homeguard_network::{SubscriberServer, SubscriberServerConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SubscriberServerConfig {
///     bind_addr: "0.0.0.0:81".parse()?,
///     max_connections: 16,
///     inbound_capacity: 32,
/// };
///
/// let (server, channels) = SubscriberServer::bind(config).await?;
/// tokio::spawn(server.run());
/// // hand `channels` to the hub
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SubscriberServer {
    listener: TcpListener,
    config: SubscriberServerConfig,
    inbound_tx: mpsc::Sender<SubscriberMessage>,
    outbound_tx: broadcast::Sender<Outbound>,
    connections: Arc<AtomicUsize>,
}

impl SubscriberServer {
    /// Bind the listener and create the hub's channels.
    ///
    /// # Errors
    /// Returns `SubscriberServerError::BindFailed` if the address cannot be
    /// bound.
    pub async fn bind(
        config: SubscriberServerConfig,
    ) -> Result<(Self, SubscriberChannels), SubscriberServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| SubscriberServerError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            addr = %listener.local_addr()?,
            max_connections = config.max_connections,
            "Subscriber server listening"
        );

        let (inbound_tx, inbound) = mpsc::channel(config.inbound_capacity);
        let (outbound_tx, _) = broadcast::channel(OUTBOUND_CAPACITY);

        let channels = SubscriberChannels {
            inbound,
            outbound: outbound_tx.clone(),
        };
        let server = Self {
            listener,
            config,
            inbound_tx,
            outbound_tx,
            connections: Arc::new(AtomicUsize::new(0)),
        };
        Ok((server, channels))
    }

    /// Address actually bound, useful when binding port 0.
    ///
    /// # Errors
    /// Returns the socket error if the address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, SubscriberServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of currently connected subscribers.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Accept subscribers until the hub drops its inbound receiver.
    pub async fn run(self) {
        loop {
            let (stream, addr) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "Subscriber accept failed");
                        continue;
                    }
                },
                () = self.inbound_tx.closed() => {
                    info!("Hub gone, subscriber server stopping");
                    return;
                }
            };

            let current = self.connections.load(Ordering::Relaxed);
            if current >= self.config.max_connections {
                warn!(
                    addr = %addr,
                    max_connections = self.config.max_connections,
                    "Subscriber rejected: maximum connections reached"
                );
                drop(stream);
                continue;
            }

            if let Err(e) = stream.set_nodelay(true) {
                warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
            }

            let id = SubscriberId::new();
            self.connections.fetch_add(1, Ordering::Relaxed);
            info!(subscriber = %id, addr = %addr, total = current + 1, "Subscriber connected");

            let connection = Connection {
                id,
                framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
                inbound_tx: self.inbound_tx.clone(),
                outbound_rx: self.outbound_tx.subscribe(),
            };
            let connections = Arc::clone(&self.connections);
            tokio::spawn(async move {
                connection.serve().await;
                connections.fetch_sub(1, Ordering::Relaxed);
                info!(subscriber = %id, "Subscriber disconnected");
            });
        }
    }
}

/// One subscriber connection.
struct Connection {
    id: SubscriberId,
    framed: Framed<TcpStream, LinesCodec>,
    inbound_tx: mpsc::Sender<SubscriberMessage>,
    outbound_rx: broadcast::Receiver<Outbound>,
}

impl Connection {
    async fn serve(mut self) {
        loop {
            tokio::select! {
                line = self.framed.next() => match line {
                    Some(Ok(text)) => {
                        trace!(subscriber = %self.id, "Subscriber line received");
                        let message = SubscriberMessage { subscriber: self.id, text };
                        if self.inbound_tx.send(message).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        debug!(subscriber = %self.id, "Discarding oversized subscriber line");
                    }
                    Some(Err(LinesCodecError::Io(e))) => {
                        debug!(subscriber = %self.id, error = %e, "Subscriber read failed");
                        return;
                    }
                    None => return,
                },
                outbound = self.outbound_rx.recv() => match outbound {
                    Ok(outbound) if outbound.is_for(self.id) => {
                        if let Err(e) = self.framed.send(outbound.text).await {
                            debug!(subscriber = %self.id, error = %e, "Subscriber write failed");
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(subscriber = %self.id, skipped, "Subscriber lagging, lines dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }
}
