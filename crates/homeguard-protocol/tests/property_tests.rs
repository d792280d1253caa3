//! Property-based tests for the modem output tokenizer.
//!
//! The tokenizer reads whatever the modem happens to emit, so it must never
//! panic and a damaged record must never hide the well-formed ones around it.

use homeguard_core::SmsStatus;
use homeguard_protocol::{Notifications, StoredMessages, StoredRecords};
use proptest::prelude::*;

/// A well-formed stored-message record.
#[derive(Debug, Clone)]
struct Record {
    index: u32,
    unread: bool,
    sender: String,
    body: String,
}

impl Record {
    fn wire(&self) -> String {
        let status = if self.unread { "REC UNREAD" } else { "REC READ" };
        format!(
            "+CMGL: {},\"{status}\",\"{}\",\"\",\"24/05/10,12:46:06+08\"\r\n{}\r\n",
            self.index, self.sender, self.body
        )
    }
}

fn record() -> impl Strategy<Value = Record> {
    (
        0u32..1000,
        any::<bool>(),
        prop::string::string_regex("\\+[0-9]{6,13}").expect("sender regex"),
        // At least three letters so a body is never the bare OK sentinel.
        prop::string::string_regex("[A-Za-z]{3,12}").expect("body regex"),
    )
        .prop_map(|(index, unread, sender, body)| Record {
            index,
            unread,
            sender,
            body,
        })
}

/// A record whose sender field is missing its closing quote.
fn damaged_record() -> impl Strategy<Value = String> {
    (0u32..1000, prop::string::string_regex("[0-9]{3,9}").expect("digits regex"))
        .prop_map(|(index, digits)| format!("+CMGL: {index},\"REC READ\",\"+{digits}\r\nOPEN\r\n"))
}

/// Fragments of modem output, glued together at random.
fn modem_noise() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("+CMGL: ".to_string()),
            Just("+CMT: ".to_string()),
            Just("\"".to_string()),
            Just(",".to_string()),
            Just("OK".to_string()),
            Just("\r\n".to_string()),
            prop::string::string_regex("[0-9A-Z +]{1,6}").expect("noise regex"),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    /// Property: every well-formed record survives any number of damaged
    /// neighbours, in order.
    #[test]
    fn prop_damaged_records_never_hide_good_ones(
        layout in prop::collection::vec((record(), prop::option::of(damaged_record())), 0..8)
    ) {
        let mut dump = String::from("AT+CMGL=\"ALL\"\r\n");
        for (good, bad) in &layout {
            if let Some(bad) = bad {
                dump.push_str(bad);
            }
            dump.push_str(&good.wire());
        }
        dump.push_str("\r\nOK\r\n");

        let parsed: Vec<_> = StoredMessages::new(&dump).collect();
        prop_assert_eq!(parsed.len(), layout.len());

        for (message, (expected, _)) in parsed.iter().zip(&layout) {
            prop_assert_eq!(message.index, Some(expected.index));
            prop_assert_eq!(&message.sender, &expected.sender);
            prop_assert_eq!(&message.content, &expected.body.to_uppercase());
            let status = if expected.unread { SmsStatus::Unread } else { SmsStatus::Read };
            prop_assert_eq!(message.status, status);
        }
    }

    /// Property: the tokenizer never panics on arbitrary text.
    #[test]
    fn prop_arbitrary_text_never_panics(input in any::<String>()) {
        let _ = StoredRecords::new(&input).count();
        let _ = Notifications::new(&input).count();
    }

    /// Property: the tokenizer never panics on marker-heavy noise, and every
    /// record it accepts has a non-empty body.
    #[test]
    fn prop_modem_noise_never_panics(input in modem_noise()) {
        for record in StoredRecords::new(&input).flatten() {
            prop_assert!(!record.body.is_empty());
        }
        for message in Notifications::new(&input) {
            prop_assert!(!message.content.is_empty());
            prop_assert!(!message.sender.is_empty());
        }
    }
}
