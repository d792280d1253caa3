//! Tolerant tokenizer for modem SMS output.
//!
//! The modem reports messages two ways:
//!
//! ```text
//! +CMT: "+260970846745","","24/05/10,12:46:06+08"
//! OPEN
//! ```
//!
//! for a message that just arrived, and
//!
//! ```text
//! +CMGL: 1,"REC UNREAD","+260970846745","","24/05/10,12:46:06+08"
//! STATUS
//! +CMGL: 2,"REC READ","+260970846745","","24/05/10,12:47:00+08"
//! OFF
//!
//! OK
//! ```
//!
//! in answer to a list request. Both parsers borrow the poll buffer and yield
//! messages lazily. A record whose header is damaged is skipped; parsing
//! resumes at the next record marker, so one bad record never swallows the
//! records after it.

use homeguard_core::constants::{MODEM_OK, SMS_LIST_MARKER, SMS_NOTIFY_MARKER};
use homeguard_core::{SmsMessage, SmsStatus};
use std::fmt;
use std::iter::Peekable;
use std::str::Lines;

/// Why a list-dump record was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A quoted header field has no closing quote on the header line.
    UnterminatedQuote { field: usize },

    /// Something other than a comma follows a quoted field.
    MissingSeparator { field: usize },

    /// Fewer than the index, status and sender fields are present.
    MissingField { field: usize },

    InvalidIndex(String),

    /// Storage status the hub does not act on (e.g. `STO SENT`).
    UnsupportedStatus(String),

    /// The header is not followed by a body line.
    MissingBody,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordError::UnterminatedQuote { field } => {
                write!(f, "unterminated quote in header field {field}")
            }
            RecordError::MissingSeparator { field } => {
                write!(f, "missing comma after header field {field}")
            }
            RecordError::MissingField { field } => write!(f, "header field {field} missing"),
            RecordError::InvalidIndex(raw) => write!(f, "invalid storage index '{raw}'"),
            RecordError::UnsupportedStatus(raw) => write!(f, "unsupported status '{raw}'"),
            RecordError::MissingBody => write!(f, "record has no body"),
        }
    }
}

/// One tokenized list-dump record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRecord<'a> {
    pub index: u32,
    pub status: SmsStatus,
    pub sender: &'a str,
    /// Service-center timestamp, kept verbatim when present.
    pub timestamp: Option<&'a str>,
    pub body: &'a str,
}

impl SmsRecord<'_> {
    #[must_use]
    pub fn to_message(&self) -> SmsMessage {
        SmsMessage::new(Some(self.index), self.sender, self.status, self.body)
    }
}

/// Records of a stored-message list dump, including the damaged ones.
///
/// Each item is either a tokenized record or the reason it was skipped.
/// [`StoredMessages`] wraps this and drops the errors.
#[derive(Debug, Clone)]
pub struct StoredRecords<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> StoredRecords<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }
}

impl<'a> Iterator for StoredRecords<'a> {
    type Item = Result<SmsRecord<'a>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.input[self.cursor..];
        let start = rest.find(SMS_LIST_MARKER)? + SMS_LIST_MARKER.len();
        let rest = &rest[start..];
        let len = rest.find(SMS_LIST_MARKER).unwrap_or(rest.len());
        self.cursor += start + len;
        Some(parse_record(&rest[..len]))
    }
}

/// Messages of a stored-message list dump. Damaged records are skipped.
#[derive(Debug, Clone)]
pub struct StoredMessages<'a> {
    records: StoredRecords<'a>,
}

impl<'a> StoredMessages<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            records: StoredRecords::new(input),
        }
    }
}

impl Iterator for StoredMessages<'_> {
    type Item = SmsMessage;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .by_ref()
            .find_map(|record| record.ok().map(|r| r.to_message()))
    }
}

/// Messages announced by unsolicited `+CMT:` notifications.
#[derive(Debug, Clone)]
pub struct Notifications<'a> {
    lines: Peekable<Lines<'a>>,
}

impl<'a> Notifications<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().peekable(),
        }
    }
}

impl Iterator for Notifications<'_> {
    type Item = SmsMessage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?.trim();
            let Some(header) = line.strip_prefix(SMS_NOTIFY_MARKER) else {
                continue;
            };

            // A marker directly followed by another marker has no body.
            let body = match self.lines.peek() {
                Some(next) if !next.trim_start().starts_with(SMS_NOTIFY_MARKER) => {
                    self.lines.next().unwrap_or_default()
                }
                _ => continue,
            };

            let mut fields = FieldScanner::new(header);
            let Ok(Some(sender)) = fields.next_field() else {
                continue;
            };
            if sender.trim().is_empty() || body.trim().is_empty() {
                continue;
            }
            return Some(SmsMessage::new(None, sender, SmsStatus::Unread, body));
        }
    }
}

fn parse_record(record: &str) -> Result<SmsRecord<'_>, RecordError> {
    let (header, rest) = match record.split_once('\n') {
        Some((header, rest)) => (header, rest),
        None => (record, ""),
    };

    let mut fields = FieldScanner::new(header);
    let index_raw = fields.required(0)?;
    let status_raw = fields.required(1)?;
    let sender = fields.required(2)?;
    // Optional alpha field, then the timestamp.
    let timestamp = match fields.next_field()? {
        Some(_) => fields.next_field()?.filter(|t| !t.is_empty()),
        None => None,
    };

    let index = index_raw
        .parse()
        .map_err(|_| RecordError::InvalidIndex(index_raw.to_string()))?;
    let status = SmsStatus::from_wire(status_raw)
        .ok_or_else(|| RecordError::UnsupportedStatus(status_raw.to_string()))?;

    let body = record_body(rest);
    if body.is_empty() {
        return Err(RecordError::MissingBody);
    }

    Ok(SmsRecord {
        index,
        status,
        sender,
        timestamp,
        body,
    })
}

/// Body lines run until the `OK` sentinel or an interleaved notification.
fn record_body(rest: &str) -> &str {
    let mut end = 0;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == MODEM_OK || trimmed.starts_with(SMS_NOTIFY_MARKER) {
            break;
        }
        offset += line.len();
        if !trimmed.is_empty() {
            end = offset;
        }
    }
    rest[..end].trim()
}

/// Splits one header line into comma-separated fields, honoring quotes.
struct FieldScanner<'a> {
    line: &'a str,
    pos: usize,
    field: usize,
    done: bool,
}

impl<'a> FieldScanner<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line: line.trim_end_matches(['\r', '\n']),
            pos: 0,
            field: 0,
            done: false,
        }
    }

    fn required(&mut self, field: usize) -> Result<&'a str, RecordError> {
        self.next_field()?
            .ok_or(RecordError::MissingField { field })
    }

    fn next_field(&mut self) -> Result<Option<&'a str>, RecordError> {
        if self.done {
            return Ok(None);
        }
        let field = self.field;
        self.field += 1;

        let rest = &self.line[self.pos..];
        let leading = rest.len() - rest.trim_start().len();
        let rest = rest.trim_start();

        if let Some(quoted) = rest.strip_prefix('"') {
            let close = quoted
                .find('"')
                .ok_or(RecordError::UnterminatedQuote { field })?;
            let value = &quoted[..close];
            let after = &quoted[close + 1..];
            let after_trimmed = after.trim_start();

            if after_trimmed.is_empty() {
                self.done = true;
            } else if let Some(tail) = after_trimmed.strip_prefix(',') {
                self.pos = self.line.len() - tail.len();
            } else {
                return Err(RecordError::MissingSeparator { field });
            }
            return Ok(Some(value));
        }

        match rest.find(',') {
            Some(comma) => {
                self.pos += leading + comma + 1;
                Ok(Some(rest[..comma].trim()))
            }
            None => {
                self.done = true;
                let value = rest.trim();
                // An empty header has no fields at all; a trailing comma
                // leaves one empty field.
                if value.is_empty() && field == 0 {
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
        }
    }
}
