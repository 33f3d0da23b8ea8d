use chrono_tz::Tz;
use lastpass_provisioning::{
    client::API_KEY_HEADER, time::TimeError, Client, Config, ConfigFile,
    Dashboard, DashboardData, DashboardError, DeactivationMode, EndpointError,
    EventService, FolderService, GroupChange, LastPassTime, ResultStatus,
    User, UserService,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, body_partial_json, header, method, path},
    Match, Mock, MockServer, Request, ResponseTemplate,
};

const ENDPOINT: &str = "/enterpriseapi.php";
const COMPANY_ID: &str = "8771312";
const SECRET: &str = "359fdfbc93bc11e1827d-f3bfd9d91ad5";

fn client_for(server: &MockServer) -> Client {
    let file = ConfigFile {
        company_id: Some(COMPANY_ID.to_string()),
        secret: Some(SECRET.to_string()),
        end_point_url: Some(format!("{}{}", server.uri(), ENDPOINT)),
        timezone: None,
    };
    let config = Config::resolve(file, |_| None).unwrap();

    Client::new(&config).unwrap()
}

/// Matches a provisioning command whose `data` is exactly what's expected,
/// so filtered and unfiltered requests can be told apart.
struct Command {
    cmd: &'static str,
    data: Option<Value>,
}

impl Match for Command {
    fn matches(&self, request: &Request) -> bool {
        match serde_json::from_slice::<Value>(&request.body) {
            Ok(body) => {
                body["cmd"] == self.cmd
                    && body.get("data") == self.data.as_ref()
            },
            Err(_) => false,
        }
    }
}

fn command(cmd: &'static str, data: Value) -> Command {
    Command {
        cmd,
        data: Some(data),
    }
}

fn users(users: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"Users": users, "Groups": {}}))
}

fn events(events: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "events": events }))
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "OK"}))
}

#[tokio::test]
async fn every_request_is_wrapped_in_an_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header(API_KEY_HEADER, SECRET))
        .and(body_json(json!({
            "cid": COMPANY_ID,
            "provhash": SECRET,
            "cmd": "resetpassword",
            "data": {"username": "user1@lastpass.com"},
        })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let status = UserService::new(&client)
        .reset_password("user1@lastpass.com")
        .await
        .unwrap();

    assert!(status.is_ok());
}

#[tokio::test]
async fn commands_without_data_leave_it_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "cid": COMPANY_ID,
            "provhash": SECRET,
            "cmd": "getsfdata",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "101": {
                "sharedfoldername": "Super-Admins",
                "score": 99,
                "users": [{"username": "root@x.com", "can_administer": "1"}],
            },
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let folders = FolderService::new(&client)
        .get_shared_folders()
        .await
        .unwrap();

    assert_eq!(folders.len(), 1);
    assert!(folders[0].is_super_admin_folder());
    assert_eq!(folders[0].users[0].can_administer, "1");
}

#[tokio::test]
async fn warnings_are_reported_with_their_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"cmd": "batchchangegrp"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "WARN",
            "errors": ["user2@lastpass.com does not exist"],
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);
    let changes = [GroupChange {
        username: "user2@lastpass.com".to_string(),
        add: vec!["Dev Team".to_string()],
        del: Vec::new(),
    }];

    let err = UserService::new(&client)
        .change_groups_membership(&changes)
        .await
        .unwrap_err();

    assert!(err.is_warning());
    assert!(err
        .to_string()
        .contains("user2@lastpass.com does not exist"));
}

#[tokio::test]
async fn failures_are_not_warnings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAIL",
            "error": "Invalid username",
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = UserService::new(&client)
        .disable_multifactor("nobody@x.com")
        .await
        .unwrap_err();

    match err {
        EndpointError::Rejected { status, messages } => {
            assert_eq!(status, ResultStatus::Fail);
            assert_eq!(messages, vec!["Invalid username"]);
        },
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn delete_sends_the_numeric_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "deluser",
            "data": {"username": "user1@lastpass.com", "deleteaction": 2},
        })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    UserService::new(&client)
        .delete_user("user1@lastpass.com", DeactivationMode::Delete)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_users_are_an_error() {
    for body in &[json!([]), json!({"Users": {}, "Groups": {}})] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "cmd": "getuserdata",
                "data": {"username": "ghost@x.com"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let client = client_for(&server);

        let err = UserService::new(&client)
            .get_user_data("ghost@x.com")
            .await
            .unwrap_err();

        match err {
            EndpointError::UserDoesNotExist { username } => {
                assert_eq!(username, "ghost@x.com")
            },
            other => panic!("Unexpected error: {:?}", other),
        }
    }
}

#[tokio::test]
async fn admins_are_filtered_by_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "getuserdata",
            "data": {"admin": true},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Users": {
                "101": {"username": "user1@lastpass.com", "admin": true},
            },
            "Groups": {},
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let admins = UserService::new(&client).get_admin_users().await.unwrap();

    assert_eq!(admins, vec![User {
        is_admin: true,
        ..User::new("user1@lastpass.com")
    }]);
}

#[tokio::test]
async fn error_statuses_keep_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("try again later"),
        )
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = UserService::new(&client).get_all_users().await.unwrap_err();

    match err {
        EndpointError::BadStatus { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "try again later");
        },
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn json_labelled_as_xml_is_still_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"status":"OK"}"#, "text/xml"),
        )
        .mount(&server)
        .await;
    let client = client_for(&server);

    let status = UserService::new(&client)
        .batch_add(&[User::new("new@x.com")])
        .await
        .unwrap();

    assert!(status.is_ok());
}

#[tokio::test]
async fn event_reports_ask_for_the_siem_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "reporting",
            "data": {
                "from": "2017-07-24 00:00:00",
                "to": "2017-07-25 00:00:00",
                "user": "allusers",
                "search": "",
                "format": "siem",
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {
                    "Time": "2017-07-24 09:40:56",
                    "Username": "API",
                    "IP_Address": "1.2.3.4",
                    "Action": "Employee Account Created",
                    "Data": "new@x.com",
                    "ID": "1",
                },
                {
                    "Time": "2017-07-24 10:00:00",
                    "Username": "user1@lastpass.com",
                    "IP_Address": "1.2.3.4",
                    "Action": "Log in",
                    "Data": "",
                    "ID": "2",
                },
            ],
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);
    let from = LastPassTime::parse("2017-07-24 00:00:00").unwrap();
    let to = LastPassTime::parse("2017-07-25 00:00:00").unwrap();

    let events = EventService::new(&client)
        .get_api_event_reports(from, to)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events.events[0].action, "Employee Account Created");
}

#[tokio::test]
async fn updates_are_sent_through_batchadd() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(command(
            "batchadd",
            json!([{"username": "a@x.com", "groups": ["Dev"]}]),
        ))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);
    let user = User {
        groups: vec![String::from("Dev")],
        ..User::new("a@x.com")
    };

    UserService::new(&client).update_user(&user).await.unwrap();
}

#[tokio::test]
async fn disabled_users_are_filtered_by_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(command(
            "getuserdata",
            json!({"username": "", "disabled": true}),
        ))
        .respond_with(users(json!({
            "7": {"username": "gone@x.com", "disabled": true},
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let got = UserService::new(&client).get_disabled_users().await.unwrap();

    assert_eq!(got, vec![User {
        disabled: true,
        ..User::new("gone@x.com")
    }]);
}

#[tokio::test]
async fn inactive_and_non_2fa_users_are_filtered_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(command("getuserdata", json!({"username": ""})))
        .respond_with(users(json!({
            "1": {"username": "old@x.com", "multifactor": "duo"},
            "2": {"username": "new@x.com", "neverloggedin": 1,
                  "multifactor": "googleauth"},
            "3": {"username": "bob@x.com", "multifactor": null},
        })))
        .expect(2)
        .mount(&server)
        .await;
    let client = client_for(&server);
    let service = UserService::new(&client);

    let inactive = service.get_inactive_users().await.unwrap();
    let non_2fa = service.get_non_2fa_users().await.unwrap();

    let inactive: Vec<&str> =
        inactive.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(inactive, vec!["new@x.com"]);
    let non_2fa: Vec<&str> =
        non_2fa.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(non_2fa, vec!["bob@x.com"]);
}

/// Answer every request the dashboard makes except `getsfdata`.
async fn mount_dashboard_responses(server: &MockServer) {
    Mock::given(method("POST"))
        .and(command("getuserdata", json!({"username": "", "admin": true})))
        .respond_with(users(json!({
            "1": {"username": "admin1@x.com", "admin": true},
            "2": {"username": "admin2@x.com", "admin": true},
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(command(
            "getuserdata",
            json!({"username": "", "disabled": true}),
        ))
        .respond_with(users(json!({
            "9": {"username": "gone@x.com", "disabled": true},
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(command("getuserdata", json!({"username": ""})))
        .respond_with(users(json!({
            "1": {"username": "admin1@x.com", "admin": true,
                  "multifactor": "duo"},
            "2": {"username": "admin2@x.com", "admin": true,
                  "multifactor": "duo"},
            "3": {"username": "new@x.com", "neverloggedin": true,
                  "multifactor": "duo", "groups": ["Dev"]},
            "4": {"username": "bob@x.com", "groups": ["Sales"]},
        })))
        .expect(2)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "reporting",
            "data": {"user": "allusers"},
        })))
        .respond_with(events(json!([{
            "Time": "2017-07-24 09:00:00",
            "Username": "API",
            "IP_Address": "1.2.3.4",
            "Action": "Employee Account Created",
            "Data": "new@x.com",
            "ID": "1",
        }])))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "reporting",
            "data": {"user": "admin1@x.com"},
        })))
        .respond_with(events(json!([{
            "Time": "2017-07-24 10:00:00",
            "Username": "admin1@x.com",
            "IP_Address": "5.6.7.8",
            "Action": "Log in",
            "Data": "",
            "ID": "2",
        }])))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "cmd": "reporting",
            "data": {"user": "admin2@x.com"},
        })))
        .respond_with(events(json!([])))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn dashboard_fetches_every_admins_history() {
    let server = MockServer::start().await;
    mount_dashboard_responses(&server).await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "cid": COMPANY_ID,
            "provhash": SECRET,
            "cmd": "getsfdata",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "42": {"sharedfoldername": "Super-Admins",
                   "users": [{"username": "admin1@x.com"}]},
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let data = DashboardData::fetch(&client, 7).await.unwrap();

    let admins: Vec<(&str, usize)> = data
        .admins
        .iter()
        .map(|(admin, history)| (admin.username.as_str(), history.len()))
        .collect();
    assert_eq!(admins, vec![("admin1@x.com", 1), ("admin2@x.com", 0)]);
    assert_eq!(data.inactive_users[0].username, "new@x.com");
    assert_eq!(data.non_2fa_users[0].username, "bob@x.com");

    let dashboard = Dashboard::build(data, Tz::UTC);
    assert_eq!(dashboard.super_admin_folder_users, vec!["admin1@x.com"]);
    assert_eq!(dashboard.api_events.len(), 1);
    assert_eq!(dashboard.disabled_users, vec!["gone@x.com"]);
    assert_eq!(dashboard.non_2fa_users["Sales"], vec!["bob@x.com"]);
}

#[tokio::test]
async fn one_failed_fetch_aborts_the_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"cmd": "getsfdata"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"cmd": "getuserdata"})))
        .respond_with(users(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"cmd": "reporting"})))
        .respond_with(events(json!([])))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = DashboardData::fetch(&client, 1).await.unwrap_err();

    match err {
        DashboardError::Fetch { what, inner } => {
            assert_eq!(what, "shared folders");
            assert!(matches!(inner, EndpointError::BadStatus { .. }));
        },
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn impossible_periods_are_rejected_before_sending_anything() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok())
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = DashboardData::fetch(&client, u32::MAX).await.unwrap_err();

    match err {
        DashboardError::Period(inner) => {
            assert_eq!(inner, TimeError::OutOfRange { days: u32::MAX })
        },
        other => panic!("Unexpected error: {:?}", other),
    }
}
