//! AT commands issued by the SMS gateway.
//!
//! Every command is terminated with a carriage return. Sending a message is
//! two steps: [`AtCommand::Submit`] opens the prompt, then [`SmsSubmit`]
//! supplies the body followed by Ctrl-Z.

use homeguard_core::constants::{
    AT_INIT_SEQUENCE, AT_LIST_ALL, AT_PROBE, SMS_SUBMIT_TERMINATOR,
};
use homeguard_core::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Bare `AT` liveness probe.
    Probe,

    /// One step of the post-probe configuration sequence.
    Configure(&'static str),

    ListAll,

    /// Delete the message stored at the given slot.
    Delete(u32),

    /// Open a send prompt for the given number.
    Submit(String),
}

impl AtCommand {
    /// Configuration commands, in the order they must be issued.
    pub fn init_sequence() -> impl Iterator<Item = AtCommand> {
        AT_INIT_SEQUENCE.into_iter().map(AtCommand::Configure)
    }

    /// Build a send prompt for `number`.
    ///
    /// # Errors
    /// Returns `Error::InvalidPhoneNumber` if the number is empty or contains
    /// characters that would break out of the quoted argument.
    pub fn submit(number: &str) -> Result<Self> {
        let number = number.trim();
        let valid = !number.is_empty()
            && number
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || (i == 0 && c == '+'));
        if !valid {
            return Err(Error::InvalidPhoneNumber(number.to_string()));
        }
        Ok(AtCommand::Submit(number.to_string()))
    }

    /// Wire form including the trailing carriage return.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{self}\r")
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtCommand::Probe => f.write_str(AT_PROBE),
            AtCommand::Configure(command) => f.write_str(command),
            AtCommand::ListAll => f.write_str(AT_LIST_ALL),
            AtCommand::Delete(index) => write!(f, "AT+CMGD={index}"),
            AtCommand::Submit(number) => write!(f, "AT+CMGS=\"{number}\""),
        }
    }
}

/// Body of an outgoing message, written after the send prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsSubmit {
    body: String,
}

impl SmsSubmit {
    /// Control characters that would end the body early are removed.
    #[must_use]
    pub fn new(body: &str) -> Self {
        Self {
            body: body
                .chars()
                .filter(|&c| c != SMS_SUBMIT_TERMINATOR && c != '\u{1B}')
                .collect(),
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Body followed by the Ctrl-Z terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut wire = String::with_capacity(self.body.len() + 1);
        wire.push_str(&self.body);
        wire.push(SMS_SUBMIT_TERMINATOR);
        wire
    }
}

/// Decodes modem output that may arrive split inside a multi-byte
/// character.
///
/// An incomplete sequence at the end of a chunk is held back and completed
/// by the next one. Bytes that can never form a character are replaced with
/// U+FFFD.
#[derive(Debug, Default)]
pub struct ModemText {
    pending: Vec<u8>,
}

impl ModemText {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every complete character decoded so far.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut rest = self.pending.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        let kept = rest.len();
        self.pending.drain(..self.pending.len() - kept);
        text
    }

    /// Bytes held back waiting for the rest of a character.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
