use super::EndpointError;
use crate::{client::Client, shared_folders::SharedFolder, utils};
use serde_derive::Deserialize;
use std::collections::BTreeMap;

const GET_SHARED_FOLDER_DATA: &str = "getsfdata";

/// Inspecting shared folders.
#[derive(Debug, Copy, Clone)]
pub struct FolderService<'a> {
    client: &'a Client,
}

impl<'a> FolderService<'a> {
    pub fn new(client: &'a Client) -> Self { FolderService { client } }

    /// Every shared folder in the enterprise and who can access it.
    ///
    /// LastPass keys the folders by ID. Don't rely on the order they come
    /// back in.
    pub async fn get_shared_folders(
        &self,
    ) -> Result<Vec<SharedFolder>, EndpointError> {
        let SharedFolders(folders) = self
            .client
            .request::<(), _>(GET_SHARED_FOLDER_DATA, None)
            .await?;

        Ok(folders.into_iter().map(|(_, folder)| folder).collect())
    }
}

/// Folders keyed by ID, or `[]` when there aren't any.
#[derive(Debug, Deserialize)]
struct SharedFolders(
    #[serde(deserialize_with = "utils::map_or_list")]
    BTreeMap<String, SharedFolder>,
);
