use super::{check_status, EndpointError};
use crate::{
    client::Client,
    status::ApiResultStatus,
    users::{DeactivationMode, GroupChange, User, Users},
};
use serde_derive::Serialize;

const GET_USER_DATA: &str = "getuserdata";
const BATCH_ADD: &str = "batchadd";
const DELETE_USER: &str = "deluser";
const DISABLE_MULTIFACTOR: &str = "disablemultifactor";
const RESET_PASSWORD: &str = "resetpassword";
const BATCH_CHANGE_GROUP: &str = "batchchangegrp";

/// Creating, inspecting and removing users.
#[derive(Debug, Copy, Clone)]
pub struct UserService<'a> {
    client: &'a Client,
}

impl<'a> UserService<'a> {
    pub fn new(client: &'a Client) -> Self { UserService { client } }

    /// Look up a single user.
    ///
    /// LastPass answers with the usual keyed map of users (or `[]` when
    /// nobody matched), so an empty result is turned into
    /// [`EndpointError::UserDoesNotExist`].
    pub async fn get_user_data(
        &self,
        username: &str,
    ) -> Result<User, EndpointError> {
        let users = self.get_users(&User::new(username)).await?;

        users
            .into_first()
            .ok_or_else(|| EndpointError::UserDoesNotExist {
                username: username.to_string(),
            })
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, EndpointError> {
        let users = self.get_users(&User::default()).await?;
        Ok(users.into_users())
    }

    /// Admins are filtered on the server.
    pub async fn get_admin_users(&self) -> Result<Vec<User>, EndpointError> {
        let filter = User {
            is_admin: true,
            ..Default::default()
        };
        let users = self.get_users(&filter).await?;

        Ok(users.into_users())
    }

    /// Disabled users are filtered on the server.
    pub async fn get_disabled_users(
        &self,
    ) -> Result<Vec<User>, EndpointError> {
        let filter = User {
            disabled: true,
            ..Default::default()
        };
        let users = self.get_users(&filter).await?;

        Ok(users.into_users())
    }

    /// Users who have never logged in. LastPass can't filter on this, so
    /// everyone gets fetched and filtered locally.
    pub async fn get_inactive_users(
        &self,
    ) -> Result<Vec<User>, EndpointError> {
        let users = self.get_users(&User::default()).await?;
        Ok(users.never_logged_in_users())
    }

    /// Users without multifactor authentication. Like
    /// [`UserService::get_inactive_users()`], this is filtered locally.
    pub async fn get_non_2fa_users(&self) -> Result<Vec<User>, EndpointError> {
        let users = self.get_users(&User::default()).await?;
        Ok(users.non_2fa_users())
    }

    /// Send a raw `getuserdata` request, where `filter` selects which users
    /// come back.
    pub async fn get_users(
        &self,
        filter: &User,
    ) -> Result<Users, EndpointError> {
        self.client.request(GET_USER_DATA, Some(filter)).await
    }

    /// Add several users in one go.
    pub async fn batch_add(
        &self,
        users: &[User],
    ) -> Result<ApiResultStatus, EndpointError> {
        log::debug!("Adding {} users", users.len());
        self.send_checked(BATCH_ADD, users).await
    }

    /// Update an existing user's details.
    ///
    /// LastPass has no dedicated command for this. `batchadd` matches users
    /// by username and overwrites whatever it finds.
    pub async fn update_user(
        &self,
        user: &User,
    ) -> Result<ApiResultStatus, EndpointError> {
        self.send_checked(BATCH_ADD, std::slice::from_ref(user)).await
    }

    pub async fn delete_user(
        &self,
        username: &str,
        mode: DeactivationMode,
    ) -> Result<ApiResultStatus, EndpointError> {
        let data = DeleteUser {
            username,
            deleteaction: mode,
        };

        self.send_checked(DELETE_USER, &data).await
    }

    pub async fn disable_multifactor(
        &self,
        username: &str,
    ) -> Result<ApiResultStatus, EndpointError> {
        self.send_checked(DISABLE_MULTIFACTOR, &Username { username })
            .await
    }

    pub async fn reset_password(
        &self,
        username: &str,
    ) -> Result<ApiResultStatus, EndpointError> {
        self.send_checked(RESET_PASSWORD, &Username { username })
            .await
    }

    /// Add users to (and remove them from) groups.
    ///
    /// A `WARN` status means some of the changes went through (usually
    /// because a username didn't exist). It is still reported as an
    /// [`EndpointError::Rejected`], so check
    /// [`EndpointError::is_warning()`] to tell it apart from a failure.
    pub async fn change_groups_membership(
        &self,
        changes: &[GroupChange],
    ) -> Result<ApiResultStatus, EndpointError> {
        self.send_checked(BATCH_CHANGE_GROUP, changes).await
    }

    async fn send_checked<D>(
        &self,
        command: &str,
        data: &D,
    ) -> Result<ApiResultStatus, EndpointError>
    where
        D: serde::Serialize + ?Sized,
    {
        let status: ApiResultStatus =
            self.client.request(command, Some(data)).await?;

        check_status(command, status)
    }
}

#[derive(Debug, Serialize)]
struct DeleteUser<'a> {
    username: &'a str,
    deleteaction: DeactivationMode,
}

#[derive(Debug, Serialize)]
struct Username<'a> {
    username: &'a str,
}
