//! Common test utilities for hub integration tests.
//!
//! [`Rig`] assembles a [`Hub`] on mock devices and keeps every mock handle,
//! so a test can inject input on any channel and observe every output.
//!
//! ```ignore
//! let mut rig = Rig::started().await;
//! rig.modem.deliver(ADMIN, "OPEN");
//! rig.hub.tick().await;
//! assert_eq!(rig.modem.sent_bodies(), vec!["Door opened"]);
//! ```

#![allow(dead_code)]

use homeguard_core::HubConfig;
use homeguard_hardware::ServoPosition;
use homeguard_hardware::mock::*;
use homeguard_hub::{Devices, Hub, Platform};
use homeguard_network::SubscriberChannels;
use homeguard_network::mock::{MockHubApi, MockHubApiHandle};
use homeguard_protocol::{Outbound, SubscriberId, SubscriberMessage};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub const ADMIN: &str = "+260970846745";
pub const DEVICE_ID: &str = "hub-test-01";
pub const UNLOCK: Duration = Duration::from_secs(3);
pub const SETTLE: Duration = Duration::from_millis(500);
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const SMS_POLL: Duration = Duration::from_secs(30);
pub const REPORT: Duration = Duration::from_secs(10);

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Door = MockDoor;
    type Light = MockRelay;
    type Reader = MockRfid;
    type Climate = MockClimate;
    type Leds = MockIndicators;
    type Modem = MockModem;
    type Bridge = MockBridge;
    type Network = MockNetwork;
    type Api = MockHubApi;
}

pub fn test_config() -> HubConfig {
    HubConfig::new(DEVICE_ID)
        .admin_number(ADMIN)
        .auth_url("http://127.0.0.1:9/auth")
        .unlock_duration(UNLOCK)
        .settle_delay(SETTLE)
        .auth_timeout(AUTH_TIMEOUT)
        .sms_poll_interval(SMS_POLL)
        .report_interval(REPORT)
}

/// A hub on mock devices plus every handle.
pub struct Rig {
    pub hub: Hub<TestPlatform>,
    pub door: MockDoorHandle,
    pub light: MockRelayHandle,
    pub reader: MockRfidHandle,
    pub climate: MockClimateHandle,
    pub leds: MockIndicatorsHandle,
    pub modem: MockModemHandle,
    pub bridge: MockBridgeHandle,
    pub network: MockNetworkHandle,
    pub api: MockHubApiHandle,
    pub inbound: mpsc::Sender<SubscriberMessage>,
    pub outbound: broadcast::Receiver<Outbound>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(&test_config())
    }

    pub fn with_config(config: &HubConfig) -> Self {
        let (door, door_handle) = MockDoor::new();
        let (light, light_handle) = MockRelay::new();
        let (reader, reader_handle) = MockRfid::new();
        let (climate, climate_handle) = MockClimate::new();
        let (leds, leds_handle) = MockIndicators::new();
        let (modem, modem_handle) = MockModem::new();
        let (bridge, bridge_handle) = MockBridge::new();
        let (network, network_handle) = MockNetwork::new();
        let (api, api_handle) = MockHubApi::new();

        let (channels, inbound) = SubscriberChannels::detached(16);
        let outbound = channels.outbound.subscribe();

        let devices = Devices {
            door,
            light,
            reader,
            climate,
            leds,
            modem,
            bridge,
            network,
        };
        let hub = Hub::new(config, devices, api, channels).unwrap();

        Self {
            hub,
            door: door_handle,
            light: light_handle,
            reader: reader_handle,
            climate: climate_handle,
            leds: leds_handle,
            modem: modem_handle,
            bridge: bridge_handle,
            network: network_handle,
            api: api_handle,
            inbound,
            outbound,
        }
    }

    /// A rig whose hub has booted. The boot alert is cleared.
    pub async fn started() -> Self {
        let mut rig = Self::new();
        rig.hub.start().await;
        assert_eq!(rig.modem.sent_bodies(), vec!["System initialized and ready"]);
        rig.modem.clear_sent();
        rig
    }

    /// Send a line as `subscriber` over the subscriber channel.
    pub async fn subscriber_says(&self, subscriber: SubscriberId, text: &str) {
        self.inbound
            .send(SubscriberMessage {
                subscriber,
                text: text.to_string(),
            })
            .await
            .unwrap();
    }

    /// Drain every line published to subscribers so far.
    pub fn published(&mut self) -> Vec<Outbound> {
        let mut lines = Vec::new();
        while let Ok(line) = self.outbound.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// Number of times the servo moved to `position`.
    pub fn servo_moves(&self, position: ServoPosition) -> usize {
        self.door
            .history()
            .iter()
            .filter(|(p, _)| *p == position)
            .count()
    }
}
