//! SMS gateway driving the cellular modem.
//!
//! Owns the modem link and everything that talks AT to it: bring-up, the
//! unsolicited-notification drain, the periodic stored-message listing,
//! deleting processed messages and sending. Parsed messages wait in a small
//! inbox; the control loop takes one per tick.
//!
//! Every exchange reads until the modem's final result line (`OK`/`ERROR`)
//! or until the response window elapses. Notifications that arrive in the
//! middle of another exchange are picked up from that exchange's output, and
//! a notification split across two reads is held back until its body line
//! is complete.

use crate::error::{HubError, Result};
use homeguard_core::SmsMessage;
use homeguard_core::constants::{EVENT_QUEUE_CAPACITY, MODEM_OK, SMS_NOTIFY_MARKER};
use homeguard_hardware::ModemLink;
use homeguard_protocol::{AtCommand, Notifications, SmsSubmit, StoredRecords};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

/// Pause between reads while waiting for a response.
const READ_INTERVAL: Duration = Duration::from_millis(100);

/// Longest partial notification held across reads.
const MAX_CARRY: usize = 1024;

#[derive(Debug)]
pub struct SmsGateway<M> {
    modem: M,
    ready: bool,
    response_window: Duration,
    poll_interval: Duration,
    next_list_at: Instant,
    /// Unconsumed tail of the last read: an incomplete notification.
    carry: String,
    inbox: VecDeque<SmsMessage>,
}

impl<M: ModemLink> SmsGateway<M> {
    /// Create a gateway. It stays not-ready until [`initialize`] succeeds.
    ///
    /// [`initialize`]: SmsGateway::initialize
    pub fn new(modem: M, poll_interval: Duration, response_window: Duration) -> Self {
        Self {
            modem,
            ready: false,
            response_window,
            poll_interval,
            next_list_at: Instant::now(),
            carry: String::new(),
            inbox: VecDeque::with_capacity(EVENT_QUEUE_CAPACITY),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Messages parsed but not yet taken by the control loop.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn next_message(&mut self) -> Option<SmsMessage> {
        self.inbox.pop_front()
    }

    /// Probe the modem and switch it to text mode.
    ///
    /// # Errors
    /// Returns `HubError::ModemTimeout` if the probe goes unanswered, or the
    /// link error. A configuration step the modem rejects is logged only.
    pub async fn initialize(&mut self) -> Result<()> {
        self.ready = false;
        self.command(&AtCommand::Probe).await?;

        for command in AtCommand::init_sequence() {
            if let Err(e) = self.command(&command).await {
                warn!(command = %command, error = %e, "Modem configuration step failed");
            }
        }

        self.ready = true;
        info!("Modem ready");
        Ok(())
    }

    /// Drain notifications and, once per poll interval, list stored
    /// messages. Does nothing while the modem is not ready.
    ///
    /// # Errors
    /// Returns the link error. Damaged stored records are skipped, not
    /// reported.
    pub async fn poll(&mut self) -> Result<()> {
        if !self.ready {
            return Ok(());
        }

        let chunk = self.modem.read_available().await?;
        if !chunk.is_empty() {
            self.absorb(&chunk);
        }

        if Instant::now() >= self.next_list_at {
            self.next_list_at = Instant::now() + self.poll_interval;
            self.list_stored().await?;
        }
        Ok(())
    }

    /// Remove a processed message from SIM storage.
    ///
    /// # Errors
    /// Returns an error if the modem is not ready or does not confirm.
    pub async fn delete(&mut self, index: u32) -> Result<()> {
        if !self.ready {
            return Err(HubError::ModemNotReady);
        }
        self.command(&AtCommand::Delete(index)).await?;
        debug!(index, "Stored SMS deleted");
        Ok(())
    }

    /// Send one text message.
    ///
    /// # Errors
    /// - `HubError::ModemNotReady` if bring-up never succeeded
    /// - `HubError::Core` if `number` is not a phone number
    /// - `HubError::ModemTimeout`/`ModemRejected` if the prompt or the
    ///   confirmation does not come
    pub async fn send_sms(&mut self, number: &str, body: &str) -> Result<()> {
        if !self.ready {
            return Err(HubError::ModemNotReady);
        }

        let submit = AtCommand::submit(number)?;
        self.modem.write(&submit.encode()).await?;
        let prompt = self
            .collect(|response| is_prompt(response) || final_result(response).is_some())
            .await?;
        if !is_prompt(&prompt) {
            return Err(self.failure(&submit, &prompt));
        }

        self.modem.write(&SmsSubmit::new(body).encode()).await?;
        let confirmation = self.collect(|response| final_result(response).is_some()).await?;
        if final_result(&confirmation) != Some(MODEM_OK) {
            return Err(self.failure(&submit, &confirmation));
        }

        debug!(number, "SMS sent");
        Ok(())
    }

    async fn list_stored(&mut self) -> Result<()> {
        self.modem.write(&AtCommand::ListAll.encode()).await?;
        let dump = self.collect(|response| final_result(response).is_some()).await?;
        if final_result(&dump).is_none() {
            warn!("Stored message list incomplete when the window closed");
        }

        for record in StoredRecords::new(&dump) {
            match record {
                Ok(record) => self.enqueue(record.to_message()),
                Err(e) => warn!(error = %e, "Skipping damaged stored message"),
            }
        }
        Ok(())
    }

    /// Issue a command and require `OK`.
    async fn command(&mut self, command: &AtCommand) -> Result<String> {
        trace!(command = %command, "AT command");
        self.modem.write(&command.encode()).await?;
        let response = self.collect(|response| final_result(response).is_some()).await?;
        match final_result(&response) {
            Some(MODEM_OK) => Ok(response),
            _ => Err(self.failure(command, &response)),
        }
    }

    fn failure(&self, command: &AtCommand, response: &str) -> HubError {
        match final_result(response) {
            Some(_) => HubError::ModemRejected {
                command: command.to_string(),
            },
            None => HubError::ModemTimeout {
                command: command.to_string(),
                window_ms: u64::try_from(self.response_window.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }

    /// Read until `done` holds or the response window elapses.
    async fn collect(&mut self, done: impl Fn(&str) -> bool) -> Result<String> {
        let started = Instant::now();
        let mut response = String::new();
        loop {
            let chunk = self.modem.read_available().await?;
            if !chunk.is_empty() {
                self.absorb(&chunk);
                response.push_str(&chunk);
            }
            if done(&response) || started.elapsed() >= self.response_window {
                return Ok(response);
            }
            sleep(READ_INTERVAL).await;
        }
    }

    /// Queue every complete notification in `chunk`.
    fn absorb(&mut self, chunk: &str) {
        self.carry.push_str(chunk);
        let complete = complete_prefix_len(&self.carry);
        let messages: Vec<SmsMessage> = Notifications::new(&self.carry[..complete]).collect();
        self.carry.drain(..complete);

        if self.carry.len() > MAX_CARRY {
            warn!(len = self.carry.len(), "Discarding unterminated notification");
            self.carry.clear();
        }

        for message in messages {
            self.enqueue(message);
        }
    }

    fn enqueue(&mut self, message: SmsMessage) {
        if message.index.is_some() && self.inbox.iter().any(|queued| queued.index == message.index) {
            return;
        }
        if self.inbox.len() >= EVENT_QUEUE_CAPACITY {
            warn!(sender = %message.sender, "SMS inbox full, message dropped");
            return;
        }
        debug!(sender = %message.sender, index = ?message.index, "SMS queued");
        self.inbox.push_back(message);
    }
}

/// The final result line of a modem response, if it has arrived.
fn final_result(response: &str) -> Option<&str> {
    let last = response.lines().map(str::trim).rfind(|line| !line.is_empty())?;
    if last == MODEM_OK
        || last == "ERROR"
        || last.starts_with("+CMS ERROR")
        || last.starts_with("+CME ERROR")
    {
        Some(last)
    } else {
        None
    }
}

fn is_prompt(response: &str) -> bool {
    response.trim_end().ends_with('>')
}

/// Length of the prefix of `text` holding only complete notifications. A
/// trailing `+CMT:` header whose body line has not fully arrived is left out.
fn complete_prefix_len(text: &str) -> usize {
    match text.rfind(SMS_NOTIFY_MARKER) {
        Some(start) if text[start..].matches('\n').count() < 2 => start,
        _ => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeguard_hardware::mock::{MockModem, MockModemHandle, SentSms};
    use rstest::rstest;
    use tokio::time::advance;

    const ADMIN: &str = "+260970846745";
    const POLL: Duration = Duration::from_secs(30);
    const WINDOW: Duration = Duration::from_secs(5);

    async fn ready_gateway() -> (SmsGateway<MockModem>, MockModemHandle) {
        let (modem, handle) = MockModem::new();
        let mut gateway = SmsGateway::new(modem, POLL, WINDOW);
        gateway.initialize().await.unwrap();
        (gateway, handle)
    }

    fn list_requests(handle: &MockModemHandle) -> usize {
        handle
            .commands()
            .iter()
            .filter(|c| c.starts_with("AT+CMGL"))
            .count()
    }

    #[rstest]
    #[case("\r\nOK\r\n", Some("OK"))]
    #[case("\r\n+CMGS: 3\r\n\r\nOK\r\n", Some("OK"))]
    #[case("\r\nERROR\r\n", Some("ERROR"))]
    #[case("\r\n+CMS ERROR: 500\r\n", Some("+CMS ERROR: 500"))]
    #[case("\r\n+CMGL: 1,\"REC READ\"", None)]
    #[case("", None)]
    fn test_final_result(#[case] response: &str, #[case] expected: Option<&str>) {
        assert_eq!(final_result(response), expected);
    }

    #[rstest]
    #[case("\r\n+CMT: \"+1\",\"\",\"ts\"\r\nOPEN\r\n", 0)]
    #[case("\r\n+CMT: \"+1\",\"\",\"ts\"\r\n", 2)]
    #[case("\r\n+CMT: \"+1\",\"\",\"ts\"\r\nOPE", 2)]
    #[case("\r\nOK\r\n", 0)]
    fn test_complete_prefix_len(#[case] text: &str, #[case] held_back_from: usize) {
        let expected = if held_back_from == 0 { text.len() } else { held_back_from };
        assert_eq!(complete_prefix_len(text), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_configures_text_mode() {
        let (gateway, handle) = ready_gateway().await;
        assert!(gateway.is_ready());
        assert_eq!(
            handle.commands(),
            vec![
                "AT",
                "AT+CFUN=1",
                "AT+CMGF=1",
                "AT+CNMI=2,1,0,0,0",
                "AT+CPMS=\"SM\",\"SM\",\"SM\"",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_modem_never_becomes_ready() {
        let (modem, handle) = MockModem::new();
        handle.set_responsive(false);
        let mut gateway = SmsGateway::new(modem, POLL, WINDOW);

        let started = Instant::now();
        let result = gateway.initialize().await;
        assert!(matches!(result, Err(HubError::ModemTimeout { .. })));
        assert!(started.elapsed() >= WINDOW);
        assert!(!gateway.is_ready());

        assert!(matches!(
            gateway.send_sms(ADMIN, "hello").await,
            Err(HubError::ModemNotReady)
        ));
        gateway.poll().await.unwrap();
        assert_eq!(list_requests(&handle), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_sms() {
        let (mut gateway, handle) = ready_gateway().await;
        gateway.send_sms(ADMIN, "Door opened").await.unwrap();
        assert_eq!(
            handle.sent(),
            vec![SentSms {
                number: ADMIN.to_string(),
                body: "Door opened".to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_rejects_bad_number() {
        let (mut gateway, handle) = ready_gateway().await;
        let result = gateway.send_sms("+26\"097", "x").await;
        assert!(matches!(result, Err(HubError::Core(_))));
        assert!(handle.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_queues_notification() {
        let (mut gateway, handle) = ready_gateway().await;
        handle.deliver(ADMIN, " open ");

        gateway.poll().await.unwrap();
        let message = gateway.next_message().unwrap();
        assert_eq!(message.sender, ADMIN);
        assert_eq!(message.content, "OPEN");
        assert_eq!(message.index, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_notification_is_reassembled() {
        let (mut gateway, handle) = ready_gateway().await;
        gateway.poll().await.unwrap();

        handle.inject_raw("\r\n+CMT: \"+260970846745\",\"\",\"24/05/10,12:46:06+08\"\r\n");
        gateway.poll().await.unwrap();
        assert_eq!(gateway.pending(), 0);

        handle.inject_raw("status\r\n");
        gateway.poll().await.unwrap();
        assert_eq!(gateway.next_message().unwrap().content, "STATUS");
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_skips_damaged_record() {
        let (mut gateway, handle) = ready_gateway().await;
        let first = handle.store(ADMIN, "open");
        handle.store("+2609708\"46745", "close");
        let third = handle.store(ADMIN, "status");

        gateway.poll().await.unwrap();

        let messages: Vec<_> = std::iter::from_fn(|| gateway.next_message()).collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].index, Some(first));
        assert_eq!(messages[0].content, "OPEN");
        assert_eq!(messages[1].index, Some(third));
        assert_eq!(messages[1].content, "STATUS");
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_once_per_interval() {
        let (mut gateway, handle) = ready_gateway().await;

        gateway.poll().await.unwrap();
        gateway.poll().await.unwrap();
        assert_eq!(list_requests(&handle), 1);

        advance(POLL).await;
        gateway.poll().await.unwrap();
        assert_eq!(list_requests(&handle), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relisted_message_is_not_queued_twice() {
        let (mut gateway, handle) = ready_gateway().await;
        handle.store(ADMIN, "open");

        gateway.poll().await.unwrap();
        advance(POLL).await;
        gateway.poll().await.unwrap();
        assert_eq!(gateway.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete() {
        let (mut gateway, handle) = ready_gateway().await;
        let index = handle.store(ADMIN, "open");
        gateway.delete(index).await.unwrap();
        assert!(handle.stored_indices().is_empty());
    }
}
