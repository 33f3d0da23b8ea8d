//! Provisioning users from an organisation chart.
//!
//! The chart is a YAML tree of organisational units. Every unit becomes a
//! LastPass group named after its ancestors (`"Engineering - Platform"`),
//! and every member ends up in each group they are listed under.

use crate::{users::User, utils};
use serde_derive::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Goes between a parent unit's name and its child's in a group name.
pub const GROUP_SEPARATOR: &str = " - ";

/// The whole chart, as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Organization {
    #[serde(
        rename = "organizations",
        default,
        deserialize_with = "utils::null_as_default"
    )]
    pub units: Vec<OrganizationalUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrganizationalUnit {
    pub name: String,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub members: Vec<String>,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub children: Vec<OrganizationalUnit>,
}

impl Organization {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OrganizationError> {
        let path = path.as_ref();
        log::debug!("Reading the org chart from \"{}\"", path.display());

        let src = std::fs::read_to_string(path).map_err(|inner| {
            OrganizationError::Read {
                path: path.to_path_buf(),
                inner,
            }
        })?;

        Organization::parse(&src).map_err(|inner| OrganizationError::Parse {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn parse(src: &str) -> Result<Self, serde_yaml::Error> {
        if src.trim().is_empty() {
            return Ok(Organization::default());
        }

        serde_yaml::from_str(src)
    }

    /// Everyone in the chart along with all of their groups, ready to be
    /// sent to `batchadd`. Users are sorted by username and each user's
    /// groups are in the order they appear in the chart.
    pub fn users(&self) -> Vec<User> {
        let mut users = BTreeMap::new();

        for unit in &self.units {
            unit.collect_members(None, &mut users);
        }

        users.into_iter().map(|(_, user)| user).collect()
    }
}

impl OrganizationalUnit {
    fn collect_members(
        &self,
        parent: Option<&str>,
        users: &mut BTreeMap<String, User>,
    ) {
        let group = match parent {
            Some(parent) => {
                format!("{}{}{}", parent, GROUP_SEPARATOR, self.name)
            },
            None => self.name.clone(),
        };

        for member in &self.members {
            users
                .entry(member.clone())
                .or_insert_with(|| User::new(member.as_str()))
                .join(&group);
        }

        for child in &self.children {
            child.collect_members(Some(&group), users);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    #[error("Unable to read \"{}\"", path.display())]
    Read {
        path: PathBuf,
        #[source]
        inner: std::io::Error,
    },
    #[error("Unable to parse \"{}\"", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        inner: serde_yaml::Error,
    },
}
