use super::EndpointError;
use crate::{
    client::Client,
    events::{Events, ALL_USERS, API_USERNAME},
    time::LastPassTime,
};
use serde_derive::Serialize;

const REPORTING: &str = "reporting";
/// Ask for events in the structured format meant for SIEM tools.
const SIEM_FORMAT: &str = "siem";

/// Reading the enterprise's event log.
#[derive(Debug, Copy, Clone)]
pub struct EventService<'a> {
    client: &'a Client,
}

impl<'a> EventService<'a> {
    pub fn new(client: &'a Client) -> Self { EventService { client } }

    /// Fetch the events for `username` between `from` and `to`, optionally
    /// only keeping the ones matching `search`.
    ///
    /// Events come back in the order LastPass sent them.
    pub async fn get_event_report(
        &self,
        username: &str,
        search: &str,
        from: LastPassTime,
        to: LastPassTime,
    ) -> Result<Events, EndpointError> {
        let data = Reporting {
            from,
            to,
            search,
            user: username,
            format: SIEM_FORMAT,
        };

        self.client.request(REPORTING, Some(&data)).await
    }

    pub async fn get_all_event_reports(
        &self,
        from: LastPassTime,
        to: LastPassTime,
    ) -> Result<Events, EndpointError> {
        self.get_event_report(ALL_USERS, "", from, to).await
    }

    /// Events triggered through the provisioning API.
    ///
    /// LastPass rejects `API` as a username, so this asks for everyone's
    /// events and filters them.
    pub async fn get_api_event_reports(
        &self,
        from: LastPassTime,
        to: LastPassTime,
    ) -> Result<Events, EndpointError> {
        let events = self.get_all_event_reports(from, to).await?;
        Ok(events.for_user(API_USERNAME))
    }
}

#[derive(Debug, Serialize)]
struct Reporting<'a> {
    from: LastPassTime,
    to: LastPassTime,
    search: &'a str,
    user: &'a str,
    format: &'a str,
}
