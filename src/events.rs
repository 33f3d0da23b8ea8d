//! Entries from the enterprise event log.

use crate::{
    time::{LastPassTime, TimeError, LASTPASS_TIMEZONE},
    utils,
};
use chrono::DateTime;
use chrono_tz::Tz;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
};

/// The username LastPass attaches to anything done through the provisioning
/// API itself.
pub const API_USERNAME: &str = "API";

/// Passed as the `user` when asking for every user's events.
pub const ALL_USERS: &str = "allusers";

/// Shared folder events only need auditing when they touch the folder
/// containing this.
pub const SENSITIVE_FOLDER_MARKER: &str = "Shared-Super-Admins";

const ADD_TO_SHARED_FOLDER: &str = "Add to Shared Folder";

/// Actions which always need auditing. The Japanese entries are what the
/// admin console reports when it's set to Japanese.
const AUDIT_ACTIONS: &[&str] = &[
    "Employee Account Deleted",
    "Employee Account Created",
    "従業員のアカウントを作成しました",
    "Edit Policy",
    "ポリシーの編集",
    "Deactivated User",
    "Reactivated User",
    "Make Admin",
    "Remove Admin",
    "Master Password Reuse",
    "Require Password Change",
    "Super Admin Password Reset",
];

/// Does this action need to be looked at by an auditor?
pub fn is_audit_event(action: &str, data: &str) -> bool {
    if action == ADD_TO_SHARED_FOLDER {
        return data.contains(SENSITIVE_FOLDER_MARKER);
    }

    AUDIT_ACTIONS.contains(&action)
}

/// The body of a `reporting` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Events {
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub events: Vec<Event>,
}

impl Events {
    pub fn len(&self) -> usize { self.events.len() }

    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    /// Only the events triggered by `username`, keeping their order.
    pub fn for_user(&self, username: &str) -> Events {
        Events {
            events: self
                .iter()
                .filter(|e| e.username == username)
                .cloned()
                .collect(),
        }
    }

    pub fn audit_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.is_audit_event())
    }

    pub fn in_timezone(self, tz: Tz) -> Events {
        Events {
            events: self.events.iter().map(|e| e.in_timezone(tz)).collect(),
        }
    }
}

impl IntoIterator for Events {
    type IntoIter = std::vec::IntoIter<Event>;
    type Item = Event;

    fn into_iter(self) -> Self::IntoIter { self.events.into_iter() }
}

/// Something which happened in the enterprise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Event {
    #[serde(rename = "Time")]
    pub time: DateTime<Tz>,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "IP_Address")]
    pub ip_address: String,
    #[serde(rename = "Action")]
    pub action: String,
    /// Free text whose meaning depends on the action (e.g. the folder name
    /// for shared folder events).
    #[serde(rename = "Data")]
    pub data: String,
    #[serde(rename = "ID", skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl Event {
    pub fn is_audit_event(&self) -> bool {
        is_audit_event(&self.action, &self.data)
    }

    pub fn in_timezone(&self, tz: Tz) -> Event {
        Event {
            time: self.time.with_timezone(&tz),
            ..self.clone()
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.time.format("%Y-%m-%d %H:%M:%S %Z"),
            self.username,
            self.ip_address,
            self.action,
            self.data
        )
    }
}

/// The event as LastPass sends it, once its keys have been lowercased.
#[derive(Deserialize)]
struct RawEvent {
    time: String,
    #[serde(default, deserialize_with = "utils::string_ish")]
    username: String,
    #[serde(default, deserialize_with = "utils::string_ish")]
    ip_address: String,
    #[serde(default, deserialize_with = "utils::string_ish")]
    action: String,
    #[serde(default, deserialize_with = "utils::string_ish")]
    data: String,
    #[serde(default, deserialize_with = "utils::string_ish")]
    id: String,
}

impl TryFrom<Map<String, Value>> for Event {
    type Error = EventParseError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        // LastPass isn't consistent about how it capitalises keys
        let normalized: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        let raw: RawEvent = serde_json::from_value(Value::Object(normalized))?;

        let time = LastPassTime::parse(&raw.time)?;

        Ok(Event {
            time: time.in_timezone(LASTPASS_TIMEZONE),
            username: raw.username,
            ip_address: raw.ip_address,
            action: raw.action,
            data: raw.data,
            id: raw.id,
        })
    }
}

/// Errors that can happen while decoding an [`Event`].
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("The event is malformed")]
    Shape(#[from] serde_json::Error),
    #[error("The event has an invalid timestamp")]
    Time(#[from] TimeError),
}
