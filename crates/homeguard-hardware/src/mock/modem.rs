//! Mock cellular modem.
//!
//! Answers the subset of the AT command set the SMS gateway uses: the probe,
//! the configuration sequence, list, delete and send. Incoming messages are
//! injected through a [`MockModemHandle`] either as an unsolicited `+CMT:`
//! notification or into SIM storage, where the next list request finds them.

use crate::{Result, traits::ModemLink};
use homeguard_core::constants::{AT_INIT_SEQUENCE, AT_LIST_ALL, AT_PROBE, SMS_SUBMIT_TERMINATOR};
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const TIMESTAMP: &str = "24/05/10,12:46:06+08";

/// A message handed to the modem for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub number: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct StoredSms {
    index: u32,
    read: bool,
    sender: String,
    body: String,
}

#[derive(Debug)]
struct ModemState {
    responsive: bool,
    output: String,
    commands: Vec<String>,
    stored: Vec<StoredSms>,
    next_index: u32,
    sent: Vec<SentSms>,
    /// Number of an open send prompt awaiting its body.
    prompt: Option<String>,
    body: String,
}

impl ModemState {
    fn new() -> Self {
        Self {
            responsive: true,
            output: String::new(),
            commands: Vec::new(),
            stored: Vec::new(),
            next_index: 1,
            sent: Vec::new(),
            prompt: None,
            body: String::new(),
        }
    }

    fn reply(&mut self, text: &str) {
        self.output.push_str("\r\n");
        self.output.push_str(text);
        self.output.push_str("\r\n");
    }

    fn handle_write(&mut self, data: &str) {
        if !self.responsive {
            return;
        }
        if let Some(number) = self.prompt.clone() {
            self.body.push_str(data);
            if let Some(end) = self.body.find(SMS_SUBMIT_TERMINATOR) {
                let body = self.body[..end].to_string();
                self.body.clear();
                self.prompt = None;
                self.sent.push(SentSms { number, body });
                let reference = self.sent.len();
                self.reply(&format!("+CMGS: {reference}"));
                self.reply("OK");
            }
            return;
        }

        for command in data.split('\r').map(str::trim).filter(|c| !c.is_empty()) {
            self.commands.push(command.to_string());
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: &str) {
        if command == AT_PROBE || AT_INIT_SEQUENCE.contains(&command) {
            self.reply("OK");
        } else if command == AT_LIST_ALL {
            let mut listing = String::new();
            for sms in &mut self.stored {
                let status = if sms.read { "REC READ" } else { "REC UNREAD" };
                let _ = write!(
                    listing,
                    "\r\n+CMGL: {},\"{status}\",\"{}\",\"\",\"{TIMESTAMP}\"\r\n{}",
                    sms.index, sms.sender, sms.body
                );
                sms.read = true;
            }
            self.output.push_str(&listing);
            self.reply("");
            self.output.push_str("OK\r\n");
        } else if let Some(index) = command.strip_prefix("AT+CMGD=") {
            match index.trim().parse::<u32>() {
                Ok(index) => {
                    self.stored.retain(|sms| sms.index != index);
                    self.reply("OK");
                }
                Err(_) => self.reply("ERROR"),
            }
        } else if let Some(number) = command
            .strip_prefix("AT+CMGS=\"")
            .and_then(|rest| rest.strip_suffix('"'))
        {
            self.prompt = Some(number.to_string());
            self.output.push_str("\r\n> ");
        } else {
            self.reply("ERROR");
        }
    }
}

/// Mock modem for testing and development.
#[derive(Debug)]
pub struct MockModem {
    state: Arc<Mutex<ModemState>>,
}

/// Injects traffic into and inspects a [`MockModem`].
#[derive(Debug, Clone)]
pub struct MockModemHandle {
    state: Arc<Mutex<ModemState>>,
}

impl MockModem {
    pub fn new() -> (Self, MockModemHandle) {
        let state = Arc::new(Mutex::new(ModemState::new()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockModemHandle { state },
        )
    }
}

fn lock(state: &Mutex<ModemState>) -> MutexGuard<'_, ModemState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ModemLink for MockModem {
    async fn write(&mut self, data: &str) -> Result<()> {
        lock(&self.state).handle_write(data);
        Ok(())
    }

    async fn read_available(&mut self) -> Result<String> {
        Ok(std::mem::take(&mut lock(&self.state).output))
    }
}

impl MockModemHandle {
    /// A dead modem accepts writes and never answers.
    pub fn set_responsive(&self, responsive: bool) {
        lock(&self.state).responsive = responsive;
    }

    /// Emit an unsolicited new-message notification.
    pub fn deliver(&self, sender: &str, body: &str) {
        let mut state = lock(&self.state);
        let notification = format!("\r\n+CMT: \"{sender}\",\"\",\"{TIMESTAMP}\"\r\n{body}\r\n");
        state.output.push_str(&notification);
    }

    /// Put a message into SIM storage; returns its index.
    pub fn store(&self, sender: &str, body: &str) -> u32 {
        let mut state = lock(&self.state);
        let index = state.next_index;
        state.next_index += 1;
        state.stored.push(StoredSms {
            index,
            read: false,
            sender: sender.to_string(),
            body: body.to_string(),
        });
        index
    }

    /// Append raw text to the modem output, e.g. a damaged record.
    pub fn inject_raw(&self, text: &str) {
        lock(&self.state).output.push_str(text);
    }

    pub fn stored_indices(&self) -> Vec<u32> {
        lock(&self.state).stored.iter().map(|sms| sms.index).collect()
    }

    /// Messages accepted for delivery, oldest first.
    pub fn sent(&self) -> Vec<SentSms> {
        lock(&self.state).sent.clone()
    }

    /// Bodies of messages accepted for delivery.
    pub fn sent_bodies(&self) -> Vec<String> {
        lock(&self.state).sent.iter().map(|s| s.body.clone()).collect()
    }

    pub fn clear_sent(&self) {
        lock(&self.state).sent.clear();
    }

    /// Every command line received, without terminators.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.state).commands.clone()
    }
}
