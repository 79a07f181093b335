//! The user record and its associated enums.
//!
//! Users are keyed internally by UUID; the platform-side `telegram_id` is the
//! deliverable identifier and may be absent for records created through other
//! channels. A user without it can never receive a broadcast.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broadcast::BroadcastTarget;
use crate::ids::TelegramUserId;

/// Role of a user, gating access to the admin panel and broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("invalid user role: '{other}'")),
        }
    }
}

/// Persisted menu presentation preference.
///
/// `Reply` renders menus as a keyboard below the input field; `Inline`
/// attaches buttons to the menu message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardType {
    Reply,
    Inline,
}

impl fmt::Display for KeyboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyboardType::Reply => write!(f, "reply"),
            KeyboardType::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for KeyboardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reply" => Ok(KeyboardType::Reply),
            "inline" => Ok(KeyboardType::Inline),
            other => Err(format!("invalid keyboard type: '{other}'")),
        }
    }
}

/// A registered bot user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Platform account id -- the deliverable identifier. Unique when present.
    pub telegram_id: Option<TelegramUserId>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_vip: bool,
    pub keyboard_type: KeyboardType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether a usable phone number is on file.
    ///
    /// Whitespace-only values count as absent; they show up when a record was
    /// imported from a source that stores empty strings instead of NULL.
    pub fn has_phone(&self) -> bool {
        self.phone
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Name to greet the user with: first name, then username, then a stock
    /// fallback.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }

    /// The user as a broadcast recipient. The chat id is absent when the
    /// record has no platform account id.
    pub fn broadcast_target(&self) -> BroadcastTarget {
        BroadcastTarget {
            chat: self.telegram_id.map(TelegramUserId::private_chat),
        }
    }
}

/// Partial user data for create-or-update operations.
///
/// Only the fields that are `Some` overwrite existing values; everything else
/// is left as stored. `telegram_id` is the lookup key and always present.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Aggregate user-base statistics for the admin panel and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub visits_today: u64,
    pub total_users: u64,
    pub total_vip: u64,
    pub new_users_today: u64,
    pub new_vip_today: u64,
}
