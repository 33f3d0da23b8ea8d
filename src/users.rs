//! Users and the ways they're grouped.

use crate::utils;
use serde::ser::Serializer;
use serde_derive::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A member of the enterprise.
///
/// LastPass only sends the fields relevant to the request, so anything
/// missing is left at its default value. The same type doubles as the
/// request body for `getuserdata` and `batchadd`, which is why empty fields
/// are skipped when serializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "utils::string_ish")]
    pub username: String,
    #[serde(
        rename = "fullname",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub full_name: String,
    /// The master password's strength, as a percentage.
    #[serde(
        rename = "mpstrength",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub master_password_strength: String,
    #[serde(
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub created: String,
    #[serde(
        rename = "last_pw_change",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub last_password_change: String,
    #[serde(
        alias = "lastlogin",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub last_login: String,
    #[serde(
        default,
        deserialize_with = "utils::bool_ish",
        skip_serializing_if = "is_false"
    )]
    pub disabled: bool,
    #[serde(
        rename = "neverloggedin",
        default,
        deserialize_with = "utils::bool_ish",
        skip_serializing_if = "is_false"
    )]
    pub never_logged_in: bool,
    #[serde(
        rename = "admin",
        default,
        deserialize_with = "utils::bool_ish",
        skip_serializing_if = "is_false"
    )]
    pub is_admin: bool,
    /// The multifactor provider, empty when it's not set up.
    #[serde(
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub multifactor: String,
    #[serde(
        rename = "duousername",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub duo_username: String,
    /// A personal account linked to this enterprise account.
    #[serde(
        rename = "linked",
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub linked_account: String,
    #[serde(
        default,
        deserialize_with = "utils::count",
        skip_serializing_if = "is_zero"
    )]
    pub sites: u64,
    #[serde(
        default,
        deserialize_with = "utils::count",
        skip_serializing_if = "is_zero"
    )]
    pub notes: u64,
    #[serde(
        rename = "formfills",
        default,
        deserialize_with = "utils::count",
        skip_serializing_if = "is_zero"
    )]
    pub form_fills: u64,
    #[serde(
        default,
        deserialize_with = "utils::count",
        skip_serializing_if = "is_zero"
    )]
    pub applications: u64,
    #[serde(
        alias = "attachment",
        default,
        deserialize_with = "utils::count",
        skip_serializing_if = "is_zero"
    )]
    pub attachments: u64,
    #[serde(
        default,
        deserialize_with = "utils::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub groups: Vec<String>,
    // the next three are only populated inside shared folder data
    #[serde(
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub readonly: String,
    #[serde(
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub give: String,
    #[serde(
        default,
        deserialize_with = "utils::string_ish",
        skip_serializing_if = "String::is_empty"
    )]
    pub can_administer: String,
}

fn is_false(b: &bool) -> bool { !*b }

fn is_zero(n: &u64) -> bool { *n == 0 }

impl User {
    pub fn new<S: Into<String>>(username: S) -> Self {
        User {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn has_multifactor(&self) -> bool { !self.multifactor.is_empty() }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Add the user to a group, unless they're already in it.
    pub fn join(&mut self, group: &str) {
        if !self.is_member_of(group) {
            self.groups.push(group.to_string());
        }
    }

    pub fn leave(&mut self, group: &str) {
        self.groups.retain(|g| g != group);
    }
}

/// The body of every `getuserdata` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Users {
    /// Users keyed by their LastPass ID.
    #[serde(
        rename = "Users",
        default,
        deserialize_with = "utils::map_or_list"
    )]
    pub users: BTreeMap<String, User>,
    /// Group names and the usernames in them.
    #[serde(
        rename = "Groups",
        default,
        deserialize_with = "utils::map_or_list"
    )]
    pub groups: BTreeMap<String, Vec<String>>,
    /// People who have been invited but haven't accepted yet.
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub invited: Vec<String>,
}

impl Users {
    pub fn is_empty(&self) -> bool { self.users.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.values()
    }

    pub fn into_users(self) -> Vec<User> {
        self.users.into_iter().map(|(_, user)| user).collect()
    }

    pub fn into_first(self) -> Option<User> {
        self.users.into_iter().map(|(_, user)| user).next()
    }

    /// Users who haven't set up any form of multifactor authentication.
    pub fn non_2fa_users(self) -> Vec<User> {
        self.into_users()
            .into_iter()
            .filter(|u| !u.has_multifactor())
            .collect()
    }

    pub fn never_logged_in_users(self) -> Vec<User> {
        self.into_users()
            .into_iter()
            .filter(|u| u.never_logged_in)
            .collect()
    }

    /// Every group name mentioned anywhere in the response.
    pub fn group_names(&self) -> BTreeSet<&str> {
        self.groups
            .keys()
            .map(String::as_str)
            .chain(
                self.iter()
                    .flat_map(|u| u.groups.iter().map(String::as_str)),
            )
            .collect()
    }
}

/// What to do when removing someone from the enterprise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeactivationMode {
    /// Block logins but keep their data and enterprise membership.
    Deactivate = 0,
    /// Remove them from the enterprise, leaving the account itself active.
    Remove = 1,
    /// Delete the account entirely.
    Delete = 2,
}

impl Default for DeactivationMode {
    fn default() -> Self { DeactivationMode::Deactivate }
}

impl From<DeactivationMode> for u8 {
    fn from(mode: DeactivationMode) -> u8 { mode as u8 }
}

impl serde::Serialize for DeactivationMode {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u8(u8::from(*self))
    }
}

impl FromStr for DeactivationMode {
    type Err = UnknownDeactivationMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deactivate" => Ok(DeactivationMode::Deactivate),
            "remove" => Ok(DeactivationMode::Remove),
            "delete" => Ok(DeactivationMode::Delete),
            _ => Err(UnknownDeactivationMode(s.to_string())),
        }
    }
}

impl Display for DeactivationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeactivationMode::Deactivate => f.write_str("deactivate"),
            DeactivationMode::Remove => f.write_str("remove"),
            DeactivationMode::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "\"{0}\" isn't a deactivation mode (expected deactivate, remove or delete)"
)]
pub struct UnknownDeactivationMode(String);

/// Groups to add a user to and remove them from, as sent to
/// `batchchangegrp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupChange {
    pub username: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub del: Vec<String>,
}
