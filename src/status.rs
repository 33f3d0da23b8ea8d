use crate::utils;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// How LastPass says a command went.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Ok,
    /// Some of the request worked (e.g. a few usernames didn't exist).
    Warn,
    Fail,
    #[serde(other)]
    Unknown,
}

impl Default for ResultStatus {
    fn default() -> Self { ResultStatus::Unknown }
}

impl Display for ResultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Ok => f.write_str("OK"),
            ResultStatus::Warn => f.write_str("WARN"),
            ResultStatus::Fail => f.write_str("FAIL"),
            ResultStatus::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// The response to mutating commands like `batchadd` or `deluser`.
///
/// Depending on the command, the messages come back under either `errors`
/// or `error`, as either a list or a single string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResultStatus {
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(
        alias = "error",
        default,
        deserialize_with = "utils::string_or_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub errors: Vec<String>,
}

impl ApiResultStatus {
    pub fn is_ok(&self) -> bool { self.status == ResultStatus::Ok }
}

impl Display for ApiResultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;

        if !self.errors.is_empty() {
            write!(f, ": {}", self.errors.join("; "))?;
        }

        Ok(())
    }
}
