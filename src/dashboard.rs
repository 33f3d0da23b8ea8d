//! An audit-oriented summary of the enterprise.
//!
//! Building the dashboard happens in two waves. First the user lists, shared
//! folders and event log are fetched concurrently, then each admin's own
//! event history is fetched by a small pool of workers. If any request
//! fails the whole dashboard fails, so a half-finished report is never
//! shown.

use crate::{
    client::Client,
    endpoints::{EndpointError, EventService, FolderService, UserService},
    events::{Event, Events, API_USERNAME},
    shared_folders::SharedFolder,
    time::{LastPassTime, TimeError},
    users::User,
};
use chrono::DateTime;
use chrono_tz::Tz;
use futures::{
    stream::{self, StreamExt, TryStreamExt},
    TryFutureExt,
};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

/// The most admin histories that will be requested at the same time.
pub const ADMIN_WORKERS: usize = 5;

/// Where users who aren't in any group get listed.
pub const NO_DEPARTMENT: &str = "(no department)";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Everything fetched from LastPass to build a [`Dashboard`].
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub from: LastPassTime,
    pub to: LastPassTime,
    /// Each admin and their own events over the period.
    pub admins: Vec<(User, Events)>,
    pub disabled_users: Vec<User>,
    pub inactive_users: Vec<User>,
    pub non_2fa_users: Vec<User>,
    pub shared_folders: Vec<SharedFolder>,
    /// Every user's events over the period.
    pub events: Events,
}

impl DashboardData {
    /// Fetch everything needed for a dashboard covering the last `days`
    /// days.
    pub async fn fetch(
        client: &Client,
        days: u32,
    ) -> Result<DashboardData, DashboardError> {
        let to = LastPassTime::now();
        let from = to.days_before(days)?;
        log::debug!("Building a dashboard for {} to {}", from, to);

        let users = UserService::new(client);
        let folders = FolderService::new(client);
        let event_log = EventService::new(client);

        let (
            admins,
            disabled_users,
            inactive_users,
            non_2fa_users,
            shared_folders,
            events,
        ) = tokio::try_join!(
            users.get_admin_users().map_err(fetching("admin users")),
            users.get_disabled_users().map_err(fetching("disabled users")),
            users.get_inactive_users().map_err(fetching("inactive users")),
            users.get_non_2fa_users().map_err(fetching("non-2FA users")),
            folders
                .get_shared_folders()
                .map_err(fetching("shared folders")),
            event_log
                .get_all_event_reports(from, to)
                .map_err(fetching("the event log")),
        )?;

        log::debug!("Fetching the history of {} admins", admins.len());
        let histories: Vec<Events> = stream::iter(&admins)
            .map(|admin| {
                event_log
                    .get_event_report(&admin.username, "", from, to)
                    .map_err(fetching("an admin's events"))
            })
            .buffered(ADMIN_WORKERS)
            .try_collect()
            .await?;

        Ok(DashboardData {
            from,
            to,
            admins: admins.into_iter().zip(histories).collect(),
            disabled_users,
            inactive_users,
            non_2fa_users,
            shared_folders,
            events,
        })
    }
}

fn fetching(what: &'static str) -> impl Fn(EndpointError) -> DashboardError {
    move |inner| DashboardError::Fetch { what, inner }
}

/// The report itself, with every time converted to the display timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub from: DateTime<Tz>,
    pub to: DateTime<Tz>,
    pub admins: Vec<(String, Vec<Event>)>,
    pub api_events: Vec<Event>,
    pub audit_events: Vec<Event>,
    pub super_admin_folder_users: Vec<String>,
    pub disabled_users: Vec<String>,
    pub inactive_users: BTreeMap<String, Vec<String>>,
    pub non_2fa_users: BTreeMap<String, Vec<String>>,
}

impl Dashboard {
    pub fn build(data: DashboardData, tz: Tz) -> Dashboard {
        let DashboardData {
            from,
            to,
            admins,
            disabled_users,
            inactive_users,
            non_2fa_users,
            shared_folders,
            events,
        } = data;
        let events = events.in_timezone(tz);

        let admins = admins
            .into_iter()
            .map(|(admin, history)| {
                (admin.username, history.in_timezone(tz).events)
            })
            .collect();

        let super_admin_folder_users = shared_folders
            .iter()
            .filter(|f| f.is_super_admin_folder())
            .flat_map(|f| f.usernames())
            .map(String::from)
            .collect();

        Dashboard {
            from: from.in_timezone(tz),
            to: to.in_timezone(tz),
            admins,
            api_events: events.for_user(API_USERNAME).events,
            audit_events: events.audit_events().cloned().collect(),
            super_admin_folder_users,
            disabled_users: disabled_users
                .into_iter()
                .map(|u| u.username)
                .collect(),
            inactive_users: by_department(&inactive_users),
            non_2fa_users: by_department(&non_2fa_users),
        }
    }
}

/// Group usernames by department. People in several groups appear under
/// each of them.
fn by_department(users: &[User]) -> BTreeMap<String, Vec<String>> {
    let mut departments: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for user in users {
        if user.groups.is_empty() {
            departments
                .entry(NO_DEPARTMENT.to_string())
                .or_default()
                .push(user.username.clone());
        }

        for group in &user.groups {
            departments
                .entry(group.clone())
                .or_default()
                .push(user.username.clone());
        }
    }

    departments
}

impl Display for Dashboard {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "# Dashboard: {} to {}",
            self.from.format(DISPLAY_FORMAT),
            self.to.format(DISPLAY_FORMAT)
        )?;

        writeln!(f, "\n# Admin Users")?;
        for (admin, events) in &self.admins {
            writeln!(f, "- {}", admin)?;
            for event in events {
                writeln!(f, "\t- {}", event)?;
            }
        }

        writeln!(f, "\n# API Activities")?;
        for event in &self.api_events {
            writeln!(f, "{}", event)?;
        }

        writeln!(f, "\n# Audit Events")?;
        for event in &self.audit_events {
            writeln!(f, "{}", event)?;
        }

        writeln!(f, "\n# Super-Shared Folders")?;
        for username in &self.super_admin_folder_users {
            writeln!(f, "- {}", username)?;
        }

        writeln!(f, "\n# Disabled Users")?;
        for username in &self.disabled_users {
            writeln!(f, "- {}", username)?;
        }

        writeln!(f, "\n# Inactive Users")?;
        write_departments(f, &self.inactive_users)?;

        writeln!(f, "\n# Non2FA Users")?;
        write_departments(f, &self.non_2fa_users)?;

        Ok(())
    }
}

fn write_departments(
    f: &mut Formatter<'_>,
    departments: &BTreeMap<String, Vec<String>>,
) -> fmt::Result {
    for (department, usernames) in departments {
        writeln!(f, "## {}", department)?;
        for username in usernames {
            writeln!(f, "- {}", username)?;
        }
    }

    Ok(())
}

/// Errors that can happen while building a [`Dashboard`].
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Unable to work out the reporting period")]
    Period(#[from] TimeError),
    #[error("Unable to fetch {}", what)]
    Fetch {
        what: &'static str,
        #[source]
        inner: EndpointError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn user(name: &str, groups: &[&str]) -> User {
        User {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..User::new(name)
        }
    }

    fn sample() -> DashboardData {
        let events: Events =
            serde_json::from_str(include_str!("reporting_response.json"))
                .unwrap();
        let folders: HashMap<String, SharedFolder> = serde_json::from_str(
            r#"{
                "7": {"sharedfoldername": "Marketing", "users": [
                    {"username": "bob@x.com"}
                ]},
                "1234": {"sharedfoldername": "Super-Admins", "score": 10,
                    "users": [
                        {"username": "root@x.com", "can_administer": 1},
                        {"username": "alice@x.com", "readonly": 1}
                    ]}
            }"#,
        )
        .unwrap();

        DashboardData {
            from: LastPassTime::parse("2017-07-24 09:00:00").unwrap(),
            to: LastPassTime::parse("2017-07-25 23:00:00").unwrap(),
            admins: vec![(
                user("user1@lastpass.com", &["Domain Admins"]),
                events.for_user("user1@lastpass.com"),
            )],
            disabled_users: vec![user("gone@x.com", &[])],
            inactive_users: vec![
                user("new@x.com", &["Dev", "Ops"]),
                user("loner@x.com", &[]),
            ],
            non_2fa_users: vec![user("bob@x.com", &["Marketing"])],
            shared_folders: folders.into_iter().map(|(_, f)| f).collect(),
            events,
        }
    }

    #[test]
    fn super_admin_folder_members() {
        let got = Dashboard::build(sample(), Tz::UTC);

        assert_eq!(
            got.super_admin_folder_users,
            vec!["root@x.com", "alice@x.com"]
        );
        let rendered = got.to_string();
        let section = rendered
            .split("# Super-Shared Folders\n")
            .nth(1)
            .unwrap()
            .split("\n#")
            .next()
            .unwrap();
        assert_eq!(section, "- root@x.com\n- alice@x.com\n");
    }

    #[test]
    fn api_and_audit_events_keep_vendor_order() {
        let got = Dashboard::build(sample(), Tz::UTC);

        let api: Vec<&str> =
            got.api_events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(api, vec!["1002", "1004"]);
        let audited: Vec<&str> =
            got.audit_events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(audited, vec!["1001", "1002", "1004"]);
    }

    #[test]
    fn users_are_grouped_by_department() {
        let got = Dashboard::build(sample(), Tz::UTC);

        assert_eq!(got.inactive_users["Dev"], vec!["new@x.com"]);
        assert_eq!(got.inactive_users["Ops"], vec!["new@x.com"]);
        assert_eq!(got.inactive_users[NO_DEPARTMENT], vec!["loner@x.com"]);
        assert_eq!(got.non_2fa_users["Marketing"], vec!["bob@x.com"]);
    }

    #[test]
    fn times_are_shown_in_the_display_timezone() {
        let got = Dashboard::build(sample(), chrono_tz::Asia::Tokyo);

        let (admin, events) = &got.admins[0];
        assert_eq!(admin, "user1@lastpass.com");
        assert_eq!(
            events[0].to_string(),
            "2017-07-25 22:40:56 JST user1@lastpass.com 210.138.23.111 \
             Require Password Change user2@lastpass.com"
        );
        assert!(got
            .to_string()
            .starts_with("# Dashboard: 2017-07-24 22:00:00 JST to"));
    }

    #[test]
    fn render_every_section() {
        let rendered = Dashboard::build(sample(), Tz::UTC).to_string();

        for heading in &[
            "# Admin Users",
            "# API Activities",
            "# Audit Events",
            "# Super-Shared Folders",
            "# Disabled Users",
            "# Inactive Users",
            "# Non2FA Users",
        ] {
            assert!(rendered.contains(heading), "{}", heading);
        }
        assert!(rendered.contains("- gone@x.com\n"));
        assert!(rendered.contains("## Marketing\n- bob@x.com\n"));
    }
}
