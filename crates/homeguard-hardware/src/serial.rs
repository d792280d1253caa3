//! Modem and companion bridge over real serial ports.
//!
//! Writes go straight to the port driver. The modem side only ever reads the
//! bytes already buffered by the driver, so neither call waits on the remote
//! device. The bridge is read by a dedicated thread that decodes lines and
//! hands complete frames to the control loop through a bounded queue.

use crate::{
    HardwareError, Result,
    frames::FrameQueue,
    traits::{BridgeLink, ModemLink},
};
use bytes::BytesMut;
use homeguard_core::SerialConfig;
use homeguard_core::constants::EVENT_QUEUE_CAPACITY;
use homeguard_protocol::{BridgeCodec, BridgeFrame, BridgeMessage, ModemText};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{debug, info, warn};

/// Read timeout of the bridge reader thread; bounds how long it takes to
/// notice the hub has gone away.
const PORT_TIMEOUT: Duration = Duration::from_millis(100);

fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    serialport::new(&config.path, config.baud_rate)
        .timeout(PORT_TIMEOUT)
        .open()
        .map_err(|e| HardwareError::initialization_failed(format!("{}: {e}", config.path)))
}

/// Cellular modem on a serial port.
pub struct SerialModem {
    port: Box<dyn SerialPort>,
    text: ModemText,
}

impl SerialModem {
    /// # Errors
    /// Returns `HardwareError::InitializationFailed` if the port cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = open_port(config)?;
        info!(path = %config.path, baud = config.baud_rate, "Modem port opened");
        Ok(Self {
            port,
            text: ModemText::new(),
        })
    }
}

impl std::fmt::Debug for SerialModem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialModem")
            .field("port", &self.port.name())
            .finish()
    }
}

impl ModemLink for SerialModem {
    async fn write(&mut self, data: &str) -> Result<()> {
        self.port.write_all(data.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    async fn read_available(&mut self) -> Result<String> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| HardwareError::communication(e.to_string()))?;
        if pending == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; pending as usize];
        self.port.read_exact(&mut buf)?;
        Ok(self.text.push(&buf))
    }
}

/// Companion keypad board on a serial port.
pub struct SerialBridge {
    port: Box<dyn SerialPort>,
    frames: FrameQueue,
}

impl SerialBridge {
    /// Open the port and start the reader thread.
    ///
    /// # Errors
    /// Returns `HardwareError::InitializationFailed` if the port cannot be
    /// opened or cloned, or `HardwareError::Io` if the thread cannot start.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = open_port(config)?;
        let reader = port
            .try_clone()
            .map_err(|e| HardwareError::initialization_failed(e.to_string()))?;
        let (frame_tx, frames) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        std::thread::Builder::new()
            .name("bridge-reader".to_string())
            .spawn(move || read_frames(reader, frame_tx))?;

        info!(path = %config.path, baud = config.baud_rate, "Bridge port opened");
        Ok(Self {
            port,
            frames: FrameQueue::new(frames),
        })
    }
}

impl std::fmt::Debug for SerialBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialBridge")
            .field("port", &self.port.name())
            .field("reader_stopped", &self.frames.is_stopped())
            .finish()
    }
}

fn read_frames(mut port: Box<dyn SerialPort>, frame_tx: mpsc::Sender<BridgeFrame>) {
    let mut codec = BridgeCodec::new();
    let mut buf = BytesMut::with_capacity(codec.max_line_length());
    let mut chunk = [0u8; 64];

    loop {
        match port.read(&mut chunk) {
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                if frame_tx.is_closed() {
                    return;
                }
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Bridge read failed, reader stopping");
                return;
            }
        }

        loop {
            match codec.decode(&mut buf) {
                Ok(Some(frame)) => {
                    if frame_tx.blocking_send(frame).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Discarding undecodable bridge input");
                    buf.clear();
                    break;
                }
            }
        }
    }
}

impl BridgeLink for SerialBridge {
    async fn try_recv(&mut self) -> Result<Option<BridgeFrame>> {
        Ok(self.frames.next())
    }

    async fn send(&mut self, message: BridgeMessage) -> Result<()> {
        let mut line = message
            .to_line()
            .map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        line.push('\n');
        self.port.write_all(line.as_bytes())?;
        Ok(())
    }
}
