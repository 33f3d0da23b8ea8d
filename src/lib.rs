//! A client for the LastPass Enterprise Provisioning API.
//!
//! Every command goes to a single endpoint as a JSON envelope containing the
//! company ID, the provisioning hash, the command name and (optionally) some
//! data. The [`Client`] takes care of the envelope, while [`UserService`],
//! [`EventService`] and [`FolderService`] know which commands exist and what
//! they return.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod client;
pub mod config;
pub mod dashboard;
pub mod endpoints;
pub mod events;
pub mod organizations;
pub mod shared_folders;
pub mod status;
pub mod time;
pub mod users;
mod utils;

pub use client::{Client, RawResponse};
pub use config::{Config, ConfigError, ConfigFile};
pub use dashboard::{Dashboard, DashboardData, DashboardError};
pub use endpoints::{EndpointError, EventService, FolderService, UserService};
pub use events::{Event, Events};
pub use organizations::{Organization, OrganizationError};
pub use shared_folders::SharedFolder;
pub use status::{ApiResultStatus, ResultStatus};
pub use time::LastPassTime;
pub use users::{DeactivationMode, GroupChange, User, Users};

/// The default user agent to use when communicating with the LastPass server.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Where provisioning requests go unless the config file says otherwise.
pub const DEFAULT_ENDPOINT: &str = "https://lastpass.com/enterpriseapi.php";
