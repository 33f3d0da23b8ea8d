//! The provisioning API's commands, grouped by what they operate on.

mod events;
mod folders;
mod users;

pub use events::EventService;
pub use folders::FolderService;
pub use users::UserService;

use crate::status::{ApiResultStatus, ResultStatus};
use reqwest::{Error, StatusCode};

/// Typical endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The HTTP client encountered an error.
    #[error("Unable to send the request")]
    HttpClient(#[from] Error),
    /// The server responded with something other than a 2xx status code.
    #[error("API request failed: {}", status)]
    BadStatus { status: StatusCode, body: String },
    /// Unable to parse the JSON in the response.
    #[error("Unable to parse the \"{}\" response", command)]
    Decode {
        command: String,
        body: String,
        #[source]
        inner: serde_json::Error,
    },
    /// LastPass received the request but reported a `WARN` or `FAIL`.
    #[error("The request was rejected ({}): {}", status, messages.join("; "))]
    Rejected {
        status: ResultStatus,
        messages: Vec<String>,
    },
    #[error("User {} does not exist", username)]
    UserDoesNotExist { username: String },
}

impl EndpointError {
    /// Did LastPass say the request only partially succeeded?
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            EndpointError::Rejected {
                status: ResultStatus::Warn,
                ..
            }
        )
    }
}

/// Turn anything other than an `OK` status into an error.
fn check_status(
    command: &str,
    status: ApiResultStatus,
) -> Result<ApiResultStatus, EndpointError> {
    if status.is_ok() {
        return Ok(status);
    }

    if status.status == ResultStatus::Warn {
        log::warn!(
            "\"{}\" only partially succeeded: {}",
            command,
            status.errors.join("; ")
        );
    } else {
        log::debug!("\"{}\" failed with {}", command, status);
    }

    Err(EndpointError::Rejected {
        status: status.status,
        messages: status.errors,
    })
}
