//! Hub entry point: reads the configuration, opens the serial links, starts
//! the subscriber server and runs the control loop until Ctrl-C.
//!
//! On exit the door is locked and the light switched off.

use anyhow::{Context, Result};
use clap::Parser;
use homeguard_core::constants::EVENT_QUEUE_CAPACITY;
use homeguard_core::{HubConfig, SerialConfig};
use homeguard_hardware::mock::*;
use homeguard_hardware::{AnyBridge, AnyModem};
use homeguard_hub::{Devices, Hub, Platform};
use homeguard_network::{
    HostLink, HttpHubApi, HttpHubApiConfig, SubscriberServer, SubscriberServerConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Connect timeout of the uplink reachability probe.
const LINK_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "homeguard", version, about = "Smart-home hub: door, light and SMS control")]
struct Cli {
    /// Hub configuration file (JSON).
    #[arg(long, short, env = "HOMEGUARD_CONFIG", default_value = "homeguard.json")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Servo, relay, LEDs, climate sensor and RFID reader have no host driver
/// yet and run simulated; the modem and bridge use serial ports when
/// configured.
struct Runtime;

impl Platform for Runtime {
    type Door = MockDoor;
    type Light = MockRelay;
    type Reader = MockRfid;
    type Climate = MockClimate;
    type Leds = MockIndicators;
    type Modem = AnyModem;
    type Bridge = AnyBridge;
    type Network = HostLink;
    type Api = HttpHubApi;
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let config = HubConfig::from_json_str(&raw).context("parsing hub configuration")?;
    config.validate().context("invalid hub configuration")?;
    info!(device = %config.device_id, config = %cli.config.display(), "Configuration loaded");

    let api = HttpHubApi::new(HttpHubApiConfig {
        auth_url: config.auth_url.clone(),
        report_url: Some(config.report_url.clone()),
        timeout: config.auth_timeout_value(),
    })?;
    let network = HostLink::for_url(&config.auth_url, LINK_PROBE_TIMEOUT)?;

    let (server, channels) = SubscriberServer::bind(SubscriberServerConfig {
        bind_addr: config.subscriber_addr()?,
        max_connections: config.max_subscribers,
        inbound_capacity: EVENT_QUEUE_CAPACITY,
    })
    .await?;
    tokio::spawn(server.run());

    let (door, _door_handle) = MockDoor::new();
    let (light, _light_handle) = MockRelay::new();
    let (reader, _reader_handle) = MockRfid::new();
    let (climate, _climate_handle) = MockClimate::new();
    let (leds, _leds_handle) = MockIndicators::new();
    let (modem, _modem_handle) = open_modem(config.modem.as_ref())?;
    let (bridge, _bridge_handle) = open_bridge(config.bridge.as_ref())?;

    let devices = Devices::<Runtime> {
        door,
        light,
        reader,
        climate,
        leds,
        modem,
        bridge,
        network,
    };
    let mut hub = Hub::new(&config, devices, api, channels)?;

    hub.start().await;
    hub.run(shutdown_signal()).await;
    info!("Hub stopped");
    Ok(())
}

#[cfg(feature = "serial")]
fn open_modem(port: Option<&SerialConfig>) -> Result<(AnyModem, Option<MockModemHandle>)> {
    use homeguard_hardware::serial::SerialModem;

    match port {
        Some(port) => {
            let modem = SerialModem::open(port)
                .with_context(|| format!("opening modem on {}", port.path))?;
            Ok((AnyModem::Serial(modem), None))
        }
        None => {
            info!("No modem port configured, SMS is simulated");
            let (modem, handle) = MockModem::new();
            Ok((AnyModem::Mock(modem), Some(handle)))
        }
    }
}

#[cfg(not(feature = "serial"))]
fn open_modem(port: Option<&SerialConfig>) -> Result<(AnyModem, Option<MockModemHandle>)> {
    if port.is_some() {
        warn!("Built without serial support, modem is simulated");
    }
    let (modem, handle) = MockModem::new();
    Ok((AnyModem::Mock(modem), Some(handle)))
}

#[cfg(feature = "serial")]
fn open_bridge(port: Option<&SerialConfig>) -> Result<(AnyBridge, Option<MockBridgeHandle>)> {
    use homeguard_hardware::serial::SerialBridge;

    match port {
        Some(port) => {
            let bridge = SerialBridge::open(port)
                .with_context(|| format!("opening bridge on {}", port.path))?;
            Ok((AnyBridge::Serial(bridge), None))
        }
        None => {
            info!("No bridge port configured, keypad is simulated");
            let (bridge, handle) = MockBridge::new();
            Ok((AnyBridge::Mock(bridge), Some(handle)))
        }
    }
}

#[cfg(not(feature = "serial"))]
fn open_bridge(port: Option<&SerialConfig>) -> Result<(AnyBridge, Option<MockBridgeHandle>)> {
    if port.is_some() {
        warn!("Built without serial support, bridge is simulated");
    }
    let (bridge, handle) = MockBridge::new();
    Ok((AnyBridge::Mock(bridge), Some(handle)))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Interrupt received, shutting down"),
        Err(e) => {
            error!(error = %e, "Cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
