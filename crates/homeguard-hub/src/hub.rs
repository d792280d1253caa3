//! The hub control loop.
//!
//! A single task owns the [`SystemState`], the door controller and every
//! device. Each tick polls the input channels in a fixed order and handles
//! at most one event from each:
//!
//! ```text
//!   relock deadline ─┐
//!   SMS inbox ───────┤
//!   keypad bridge ───┤──► Hub::tick ──► door / light / LEDs
//!   RFID reader ─────┤                  alerts (SMS)
//!   subscribers ─────┤                  broadcasts (subscribers)
//!   report timer ────┘
//! ```
//!
//! Waits that block the tick (remote authorization, modem exchanges, the
//! RESTART settle delay, sensor reports) all run under
//! [`DoorController::relock_while`], so the door relocks on time whatever
//! the loop is waiting for.

use crate::authorizer::AccessAuthorizer;
use crate::broadcaster::EventBroadcaster;
use crate::dispatcher::{Action, SubscriberAction, route, route_subscriber, status_report};
use crate::door::DoorController;
use crate::error::Result;
use crate::notifier::{Alert, AlertNotifier};
use crate::sms_gateway::SmsGateway;
use homeguard_core::{
    AuthDecision, CommandToken, CredentialAttempt, CredentialMethod, HubConfig, Origin,
    SystemState,
};
use homeguard_hardware::{
    BridgeLink, ClimateSensor, DoorActuator, Indication, Indicators, ModemLink, NetworkLink, Relay,
    RfidReader,
};
use homeguard_network::{HubApi, SubscriberChannels};
use homeguard_protocol::{
    BridgeFrame, BridgeMessage, BroadcastEvent, SensorReport, SubscriberCommand,
    SubscriberMessage,
};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, sleep};
use tracing::{debug, error, info, warn};

/// The concrete device types a hub runs on.
///
/// Device traits use native `async fn`, so the hub is generic rather than
/// holding trait objects. Implement this on a marker type:
///
/// ```
/// use homeguard_hardware::mock::*;
/// use homeguard_hub::Platform;
/// use homeguard_network::mock::MockHubApi;
///
/// struct Bench;
///
/// impl Platform for Bench {
///     type Door = MockDoor;
///     type Light = MockRelay;
///     type Reader = MockRfid;
///     type Climate = MockClimate;
///     type Leds = MockIndicators;
///     type Modem = MockModem;
///     type Bridge = MockBridge;
///     type Network = MockNetwork;
///     type Api = MockHubApi;
/// }
/// ```
pub trait Platform {
    type Door: DoorActuator;
    type Light: Relay;
    type Reader: RfidReader;
    type Climate: ClimateSensor;
    type Leds: Indicators;
    type Modem: ModemLink;
    type Bridge: BridgeLink;
    type Network: NetworkLink;
    type Api: HubApi;
}

/// Every peripheral the hub drives.
pub struct Devices<P: Platform> {
    pub door: P::Door,
    pub light: P::Light,
    pub reader: P::Reader,
    pub climate: P::Climate,
    pub leds: P::Leds,
    pub modem: P::Modem,
    pub bridge: P::Bridge,
    pub network: P::Network,
}

pub struct Hub<P: Platform> {
    state: SystemState,
    rfid_sensing: bool,
    door: DoorController,
    servo: P::Door,
    light: P::Light,
    reader: P::Reader,
    climate: P::Climate,
    leds: P::Leds,
    bridge: P::Bridge,
    network: P::Network,
    api: P::Api,
    gateway: SmsGateway<P::Modem>,
    authorizer: AccessAuthorizer,
    notifier: AlertNotifier,
    broadcaster: EventBroadcaster,
    subscribers: mpsc::Receiver<SubscriberMessage>,
    /// When a transient LED indication (denial) gives way to the resting one.
    indication_reset_at: Option<Instant>,
    settle_delay: Duration,
    report_interval: Duration,
    tick_interval: Duration,
    next_report_at: Instant,
}

impl<P: Platform> Hub<P> {
    /// Assemble a hub.
    ///
    /// # Errors
    /// Returns `HubError::Core` if the configuration does not validate.
    pub fn new(
        config: &HubConfig,
        devices: Devices<P>,
        api: P::Api,
        channels: SubscriberChannels,
    ) -> Result<Self> {
        config.validate()?;
        let admin = config.admin_identity()?;
        let device = config.device_identity()?;

        Ok(Self {
            state: SystemState::default(),
            rfid_sensing: true,
            door: DoorController::new(config.unlock_duration_value()),
            servo: devices.door,
            light: devices.light,
            reader: devices.reader,
            climate: devices.climate,
            leds: devices.leds,
            bridge: devices.bridge,
            network: devices.network,
            api,
            gateway: SmsGateway::new(
                devices.modem,
                config.sms_poll_interval_value(),
                config.sms_list_window_value(),
            ),
            authorizer: AccessAuthorizer::new(device, config.auth_timeout_value()),
            notifier: AlertNotifier::new(admin),
            broadcaster: EventBroadcaster::new(channels.outbound),
            subscribers: channels.inbound,
            indication_reset_at: None,
            settle_delay: config.settle_delay_value(),
            report_interval: config.report_interval_value(),
            tick_interval: config.tick_interval_value(),
            next_report_at: Instant::now() + config.report_interval_value(),
        })
    }

    /// Current system state. `door_locked` reflects the door controller.
    #[must_use]
    pub fn state(&self) -> SystemState {
        SystemState {
            door_locked: self.door.is_locked(),
            ..self.state
        }
    }

    #[must_use]
    pub fn door(&self) -> &DoorController {
        &self.door
    }

    #[must_use]
    pub fn is_rfid_sensing(&self) -> bool {
        self.rfid_sensing
    }

    #[must_use]
    pub fn is_modem_ready(&self) -> bool {
        self.gateway.is_ready()
    }

    /// Bring the hub to its boot state: door locked, light off, RFID sensing,
    /// modem configured. The administrator is told once the modem is up.
    pub async fn start(&mut self) {
        if let Err(e) = self.door.lock(&mut self.servo).await {
            error!(error = %e, "Door servo failed at boot");
        }
        self.switch_light(false).await;
        self.set_rfid_sensing(true).await;
        self.show(Indication::Off).await;

        match self.gateway.initialize().await {
            Ok(()) => self.alert(Alert::SystemReady).await,
            Err(e) => warn!(error = %e, "Modem unavailable, SMS disabled"),
        }
        info!(device = %self.authorizer.device(), "Hub started");
    }

    /// Run ticks until `shutdown` resolves, then leave the door locked and
    /// the light off.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stop = tokio::select! {
                biased;
                () = &mut shutdown => true,
                _ = self.door.relock_while(&mut self.servo, ticker.tick()) => false,
            };
            if stop {
                break;
            }
            self.tick().await;
        }

        info!("Hub stopping");
        if let Err(e) = self.door.lock(&mut self.servo).await {
            error!(error = %e, "Failed to lock door on shutdown");
        }
        self.switch_light(false).await;
        self.show(Indication::Off).await;
        self.state.door_locked = self.door.is_locked();
    }

    /// One pass over every input channel.
    pub async fn tick(&mut self) {
        if let Err(e) = self.door.poll_relock(&mut self.servo).await {
            warn!(error = %e, "Relock failed, retrying");
        }
        self.sync_door().await;

        self.poll_sms().await;
        self.poll_bridge().await;
        self.poll_rfid().await;
        self.poll_subscriber().await;
        self.poll_report().await;

        self.sync_door().await;
        self.refresh_indication().await;
    }

    /// Execute one command and return its acknowledgment. Commands that
    /// arrived by SMS are also acknowledged by SMS.
    pub async fn execute_command(&mut self, token: CommandToken, origin: Origin) -> String {
        let action = route(token, &self.state);
        info!(command = %token, origin = ?origin, action = ?action, "Executing command");

        match action {
            Action::Unlock => self.unlock_door().await,
            Action::Lock => self.lock_door().await,
            Action::Light(on) => {
                if self.switch_light(on).await {
                    self.broadcaster.publish(&BroadcastEvent::bulb(on));
                }
            }
            Action::Shutdown => self.shutdown().await,
            Action::Restart => self.restart().await,
            Action::Status | Action::RefuseDisabled | Action::Unknown => {}
        }

        let ack = match action.ack() {
            Some(ack) => ack.to_string(),
            None => self.status_report().await,
        };
        if origin.replies_by_sms() {
            self.alert(Alert::CommandAck(ack.clone())).await;
        }
        ack
    }

    async fn poll_sms(&mut self) {
        if let Err(e) = self
            .door
            .relock_while(&mut self.servo, self.gateway.poll())
            .await
        {
            warn!(error = %e, "SMS poll failed");
        }

        let Some(message) = self.gateway.next_message() else {
            return;
        };
        if !self.notifier.admin().matches(&message.sender) {
            debug!(sender = %message.sender, "Ignoring SMS from unauthorized sender");
            return;
        }

        let token = CommandToken::parse(&message.content);
        self.execute_command(token, Origin::Sms).await;

        if let Some(index) = message.index
            && let Err(e) = self
                .door
                .relock_while(&mut self.servo, self.gateway.delete(index))
                .await
        {
            warn!(index, error = %e, "Failed to delete processed SMS");
        }
    }

    async fn poll_bridge(&mut self) {
        let frame = match self.bridge.try_recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Bridge read failed");
                return;
            }
        };

        match frame {
            BridgeFrame::Keypad(digits) => match CredentialAttempt::keypad(&digits) {
                Ok(attempt) => {
                    self.handle_credential(attempt).await;
                }
                Err(e) => debug!(error = %e, "Discarding malformed keypad line"),
            },
            BridgeFrame::Unrecognized(line) => debug!(line = %line, "Ignoring bridge line"),
        }
    }

    async fn poll_rfid(&mut self) {
        if !self.rfid_sensing {
            return;
        }
        match self.reader.try_read_card().await {
            Ok(Some(card)) => match CredentialAttempt::rfid(&card.uid_hex()) {
                Ok(attempt) => {
                    self.handle_credential(attempt).await;
                }
                Err(e) => debug!(error = %e, "Discarding unreadable tag"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "RFID read failed"),
        }
    }

    async fn poll_subscriber(&mut self) {
        let Ok(message) = self.subscribers.try_recv() else {
            return;
        };
        let command = SubscriberCommand::parse(&message.text);
        let action = route_subscriber(&command, &self.state);
        debug!(subscriber = %message.subscriber, command = ?command, "Subscriber command");

        match action {
            SubscriberAction::Light { target, reply } => {
                self.switch_light(target.resolve(self.state.bulb_on)).await;
                let text = reply.render(self.state.bulb_on);
                self.broadcaster.reply(message.subscriber, text);
                return;
            }
            SubscriberAction::Unlock => self.unlock_door().await,
            SubscriberAction::Lock => self.lock_door().await,
            SubscriberAction::RefuseDisabled | SubscriberAction::Unknown => {}
        }
        if let Some(text) = action.fixed_reply() {
            self.broadcaster.reply(message.subscriber, text);
        }
    }

    async fn poll_report(&mut self) {
        let now = Instant::now();
        if now < self.next_report_at {
            return;
        }
        self.next_report_at = now + self.report_interval;

        let reading = match self.climate.read().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "Climate read failed, report skipped");
                return;
            }
        };

        let climate = BridgeMessage::Climate {
            temperature: reading.temperature,
            humidity: reading.humidity,
        };
        if let Err(e) = self.bridge.send(climate).await {
            warn!(error = %e, "Failed to forward climate to bridge");
        }

        let connected = self
            .door
            .relock_while(&mut self.servo, self.network.is_connected())
            .await;
        if !connected {
            debug!("Network link down, report skipped");
            return;
        }
        let report = SensorReport::new(
            reading.temperature,
            reading.humidity,
            self.authorizer.device(),
        );
        match self
            .door
            .relock_while(&mut self.servo, self.api.post_report(&report))
            .await
        {
            Ok(()) => debug!(
                temperature = reading.temperature,
                humidity = reading.humidity,
                "Sensor report posted"
            ),
            Err(e) => warn!(error = %e, "Sensor report failed"),
        }
    }

    /// Authorize a credential and act on the decision. Every decision
    /// produces exactly one alert and one broadcast.
    /// While the system is shut down every credential is denied without
    /// asking the remote service.
    async fn handle_credential(&mut self, attempt: CredentialAttempt) -> AuthDecision {
        let decision = if self.state.enabled {
            self.door
                .relock_while(
                    &mut self.servo,
                    self.authorizer
                        .authorize(&self.api, &mut self.network, &attempt),
                )
                .await
        } else {
            warn!(method = %attempt.method, "System shut down, access denied");
            AuthDecision::denied(&attempt)
        };

        if decision.method == CredentialMethod::Keypad
            && let Err(e) = self
                .bridge
                .send(BridgeMessage::AccessResult {
                    granted: decision.granted,
                })
                .await
        {
            warn!(error = %e, "Failed to send access result to bridge");
        }

        if decision.granted {
            self.unlock_door().await;
            self.indication_reset_at = None;
            self.show(Indication::Granted).await;
        } else {
            self.indication_reset_at = Some(Instant::now() + self.door.unlock_duration());
            self.show(Indication::Denied).await;
        }

        self.broadcaster.publish(&BroadcastEvent::access(&decision));
        self.alert(Alert::Access(decision.clone())).await;
        decision
    }

    async fn shutdown(&mut self) {
        self.state.enabled = false;
        self.lock_door().await;
        if self.switch_light(false).await {
            self.broadcaster.publish(&BroadcastEvent::bulb(false));
        }
        self.set_rfid_sensing(false).await;
        self.indication_reset_at = None;
        self.show(Indication::Shutdown).await;
        warn!("System shut down");
        self.alert(Alert::ShutdownComplete).await;
    }

    async fn restart(&mut self) {
        self.state.enabled = true;
        self.set_rfid_sensing(true).await;

        let connected = self
            .door
            .relock_while(&mut self.servo, self.network.is_connected())
            .await;
        if !connected {
            match self
                .door
                .relock_while(&mut self.servo, self.network.reconnect())
                .await
            {
                Ok(()) => info!("Network link restored"),
                Err(e) => warn!(error = %e, "Network reconnect failed"),
            }
        }

        self.switch_light(true).await;
        self.unlock_door().await;
        self.door
            .relock_while(&mut self.servo, sleep(self.settle_delay))
            .await;
        self.switch_light(false).await;
        self.indication_reset_at = None;
        self.show(Indication::Off).await;

        info!("System restarted");
        self.alert(Alert::RestartComplete).await;
    }

    async fn status_report(&mut self) -> String {
        let reading = match self.climate.read().await {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!(error = %e, "Climate read failed");
                None
            }
        };
        status_report(&self.state(), reading)
    }

    async fn unlock_door(&mut self) {
        if let Err(e) = self.door.unlock(&mut self.servo).await {
            error!(error = %e, "Door unlock failed");
        }
        self.sync_door().await;
    }

    async fn lock_door(&mut self) {
        if let Err(e) = self.door.lock(&mut self.servo).await {
            error!(error = %e, "Door lock failed");
        }
        self.sync_door().await;
    }

    /// Mirror the controller into the state; a relock ends the grant
    /// indication.
    async fn sync_door(&mut self) {
        let locked = self.door.is_locked();
        if locked == self.state.door_locked {
            return;
        }
        self.state.door_locked = locked;
        if locked && self.indication_reset_at.is_none() {
            self.show(self.resting_indication()).await;
        }
    }

    async fn refresh_indication(&mut self) {
        if self
            .indication_reset_at
            .is_some_and(|at| Instant::now() >= at)
        {
            self.indication_reset_at = None;
            self.show(self.resting_indication()).await;
        }
    }

    fn resting_indication(&self) -> Indication {
        if self.state.enabled {
            Indication::Off
        } else {
            Indication::Shutdown
        }
    }

    async fn switch_light(&mut self, on: bool) -> bool {
        match self.light.set_energized(on).await {
            Ok(()) => {
                self.state.bulb_on = on;
                true
            }
            Err(e) => {
                warn!(on, error = %e, "Light relay failed");
                false
            }
        }
    }

    async fn set_rfid_sensing(&mut self, enabled: bool) {
        match self.reader.set_sensing(enabled).await {
            Ok(()) => self.rfid_sensing = enabled,
            Err(e) => warn!(enabled, error = %e, "Failed to switch RFID antenna"),
        }
    }

    async fn show(&mut self, indication: Indication) {
        if let Err(e) = self.leds.show(indication).await {
            debug!(indication = ?indication, error = %e, "Indicator update failed");
        }
    }

    async fn alert(&mut self, alert: Alert) {
        self.door
            .relock_while(
                &mut self.servo,
                self.notifier.notify(&mut self.gateway, &alert),
            )
            .await;
    }
}
