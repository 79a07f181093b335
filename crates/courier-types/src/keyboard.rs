//! Keyboard models attached to outgoing messages.
//!
//! These are transport-neutral shapes; the platform adapter converts them to
//! the wire format. Two families exist, mirroring the persisted
//! [`KeyboardType`](crate::user::KeyboardType) preference: inline buttons
//! under a message, and reply keyboards below the input field.

use serde::{Deserialize, Serialize};

/// A button attached to a message, firing a callback query when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn callback(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// A button on the reply keyboard. Pressing it sends its text as a normal
/// message, unless `request_contact` is set, in which case the client offers
/// to share the user's phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(default)]
    pub request_contact: bool,
}

impl KeyboardButton {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: false,
        }
    }

    pub fn contact_request(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_contact: true,
        }
    }
}

/// Keyboard to attach to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// Buttons under the message itself.
    Inline { rows: Vec<Vec<InlineButton>> },
    /// Keyboard below the input field, auto-resized to fit.
    Keyboard { rows: Vec<Vec<KeyboardButton>> },
}

impl ReplyMarkup {
    pub fn inline(rows: Vec<Vec<InlineButton>>) -> Self {
        ReplyMarkup::Inline { rows }
    }

    pub fn keyboard(rows: Vec<Vec<KeyboardButton>>) -> Self {
        ReplyMarkup::Keyboard { rows }
    }

    /// Reply keyboard built from plain button labels.
    pub fn keyboard_of(rows: Vec<Vec<&str>>) -> Self {
        ReplyMarkup::Keyboard {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::text).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_of_builds_plain_rows() {
        let markup = ReplyMarkup::keyboard_of(vec![vec!["A", "B"], vec!["C"]]);
        let ReplyMarkup::Keyboard { rows } = markup else {
            panic!("expected reply keyboard");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].text, "B");
        assert!(!rows[0][0].request_contact);
    }

    #[test]
    fn test_contact_request_button() {
        let btn = KeyboardButton::contact_request("Share phone");
        assert!(btn.request_contact);
    }
}
