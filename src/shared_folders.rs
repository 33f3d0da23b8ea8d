use crate::{users::User, utils};
use serde_derive::{Deserialize, Serialize};

/// The shared folder holding credentials only super admins may see.
pub const SUPER_ADMIN_FOLDER: &str = "Super-Admins";

/// A folder whose contents are shared between several users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedFolder {
    #[serde(
        rename = "sharedfoldername",
        default,
        deserialize_with = "utils::string_ish"
    )]
    pub name: String,
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub score: f64,
    /// Each user's permissions on the folder (`readonly`, `give` and
    /// `can_administer`).
    #[serde(default, deserialize_with = "utils::null_as_default")]
    pub users: Vec<User>,
}

impl SharedFolder {
    pub fn is_super_admin_folder(&self) -> bool {
        self.name == SUPER_ADMIN_FOLDER
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> + '_ {
        self.users.iter().map(|u| u.username.as_str())
    }
}
