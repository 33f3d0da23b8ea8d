use anyhow::{Context, Error};
use env_logger::Env;
use lastpass_provisioning::{
    config::{self, DEBUG_VAR},
    Client, Config, Dashboard, DashboardData, DeactivationMode, EventService,
    GroupChange, LastPassTime, Organization, User, UserService,
};
use serde_derive::Deserialize;
use std::{path::PathBuf, str::FromStr};
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::from_args();
    log::debug!("Starting application with {:#?}", args);

    if let Err(e) = run(args).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let mut config = Config::load(args.config.as_deref())
        .context("Unable to load the configuration")?;
    if let Some(tz) = &args.timezone {
        config.timezone = config::parse_timezone(tz)?;
    }

    let verbose = args.verbose
        || args.cmd.verbose()
        || std::env::var(DEBUG_VAR).map_or(false, |v| !v.is_empty());
    let client = Client::new(&config)
        .context("Unable to create the HTTP client")?
        .verbose(verbose);

    match args.cmd {
        Command::Create(Create::User {
            bulk,
            org,
            dept,
            email,
        }) => {
            let source = match (bulk, org) {
                (Some(path), _) => NewUsers::Bulk(path),
                (None, Some(path)) => NewUsers::Chart(path),
                (None, None) => NewUsers::Single { email, dept },
            };
            create_users(&client, source).await
        },
        Command::Get(Get::Users { filter }) => get_users(&client, filter).await,
        Command::Get(Get::Events { user, duration, .. }) => {
            get_events(&client, &config, user.as_deref(), duration).await
        },
        Command::Get(Get::Groups) => get_groups(&client).await,
        Command::Describe(Describe::User { email }) => {
            let user = UserService::new(&client).get_user_data(&email).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        },
        Command::Delete(Delete::User { mode, email }) => {
            let status = UserService::new(&client)
                .delete_user(&email, mode)
                .await
                .with_context(|| format!("Unable to {} {}", mode, email))?;
            log::info!("{}: {}", email, status);
            Ok(())
        },
        Command::Update(Update::User {
            email,
            field: UserField::Department { join, leave },
        }) => update_department(&client, &email, &join, &leave).await,
        Command::ChangeGroups { user, add, del } => {
            let changes = [GroupChange {
                username: user,
                add,
                del,
            }];
            let status = UserService::new(&client)
                .change_groups_membership(&changes)
                .await?;
            log::info!("{}", status);
            Ok(())
        },
        Command::DisableMfa { email } => {
            let status =
                UserService::new(&client).disable_multifactor(&email).await?;
            log::info!("{}: {}", email, status);
            Ok(())
        },
        Command::ResetPassword { email } => {
            let status =
                UserService::new(&client).reset_password(&email).await?;
            log::info!("{}: {}", email, status);
            Ok(())
        },
        Command::Dashboard { duration, .. } => {
            let data = DashboardData::fetch(&client, duration).await?;
            print!("{}", Dashboard::build(data, config.timezone));
            Ok(())
        },
    }
}

/// Where `create user` gets its users from.
#[derive(Debug, Clone, PartialEq)]
enum NewUsers {
    Single {
        email: Option<String>,
        dept: Vec<String>,
    },
    Bulk(PathBuf),
    Chart(PathBuf),
}

impl NewUsers {
    fn load(self) -> Result<Vec<User>, Error> {
        match self {
            NewUsers::Single {
                email: Some(email),
                dept,
            } => Ok(vec![User {
                groups: dept,
                ..User::new(email)
            }]),
            NewUsers::Single { email: None, .. } => Err(anyhow::anyhow!(
                "Either an email address, --bulk or --org is required"
            )),
            NewUsers::Bulk(path) => {
                let src = std::fs::read_to_string(&path).with_context(|| {
                    format!("Unable to read \"{}\"", path.display())
                })?;
                let BulkUsers { data } = serde_json::from_str(&src)
                    .with_context(|| {
                        format!("Unable to parse \"{}\"", path.display())
                    })?;
                Ok(data)
            },
            NewUsers::Chart(path) => Ok(Organization::load(path)?.users()),
        }
    }
}

async fn create_users(client: &Client, source: NewUsers) -> Result<(), Error> {
    let users = source.load()?;

    UserService::new(client)
        .batch_add(&users)
        .await
        .context("Unable to create users")?;

    for user in &users {
        log::info!("created {} in {:?}", user.username, user.groups);
    }

    Ok(())
}

async fn get_users(client: &Client, filter: UserFilter) -> Result<(), Error> {
    let service = UserService::new(client);
    let users = match filter {
        UserFilter::All => service.get_all_users().await?,
        UserFilter::Non2fa => service.get_non_2fa_users().await?,
        UserFilter::Inactive => service.get_inactive_users().await?,
        UserFilter::Disabled => service.get_disabled_users().await?,
        UserFilter::Admin => service.get_admin_users().await?,
    };

    for user in &users {
        println!("{}", user.username);
    }

    Ok(())
}

async fn get_events(
    client: &Client,
    config: &Config,
    user: Option<&str>,
    days: u32,
) -> Result<(), Error> {
    let to = LastPassTime::now();
    let from = to.days_before(days)?;
    let service = EventService::new(client);

    let events = match user {
        None => service.get_all_event_reports(from, to).await?,
        Some(user) if user.eq_ignore_ascii_case("api") => {
            service.get_api_event_reports(from, to).await?
        },
        Some(user) => service.get_event_report(user, "", from, to).await?,
    };

    let events = events.in_timezone(config.timezone);
    println!("{}", serde_json::to_string_pretty(&events)?);

    Ok(())
}

async fn get_groups(client: &Client) -> Result<(), Error> {
    let users = UserService::new(client).get_users(&User::default()).await?;

    for group in users.group_names() {
        println!("{}", group);
    }

    Ok(())
}

async fn update_department(
    client: &Client,
    email: &str,
    join: &[String],
    leave: &[String],
) -> Result<(), Error> {
    let service = UserService::new(client);
    let mut user = service.get_user_data(email).await?;

    for group in leave {
        user.leave(group);
    }
    for group in join {
        user.join(group);
    }

    service
        .update_user(&user)
        .await
        .with_context(|| format!("Unable to update {}", email))?;
    log::info!("{} is now in {:?}", email, user.groups);

    Ok(())
}

/// The file read by `create user --bulk`.
#[derive(Debug, Deserialize)]
struct BulkUsers {
    data: Vec<User>,
}

/// Manage a LastPass Enterprise account through the provisioning API.
#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "A YAML file with the company ID, secret and endpoint"
    )]
    config: Option<PathBuf>,
    #[structopt(long, help = "The timezone event times are shown in")]
    timezone: Option<String>,
    #[structopt(
        short,
        long,
        help = "Dump every request and response (includes the secret)"
    )]
    verbose: bool,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Create users")]
    Create(Create),
    #[structopt(about = "List users, events or groups")]
    Get(Get),
    #[structopt(about = "Show everything LastPass knows about a user")]
    Describe(Describe),
    #[structopt(about = "Deactivate or remove a user")]
    Delete(Delete),
    #[structopt(about = "Change a user's details")]
    Update(Update),
    #[structopt(about = "Add a user to groups and remove them from others")]
    ChangeGroups {
        #[structopt(long)]
        user: String,
        #[structopt(long, number_of_values = 1)]
        add: Vec<String>,
        #[structopt(long, number_of_values = 1)]
        del: Vec<String>,
    },
    #[structopt(about = "Turn off a user's multifactor authentication")]
    DisableMfa { email: String },
    #[structopt(about = "Make a user choose a new master password")]
    ResetPassword { email: String },
    #[structopt(about = "Summarise recent activity for an audit")]
    Dashboard {
        #[structopt(short, long, default_value = "1")]
        duration: u32,
        #[structopt(short, long)]
        verbose: bool,
    },
}

impl Command {
    fn verbose(&self) -> bool {
        match self {
            Command::Get(Get::Events { verbose, .. })
            | Command::Dashboard { verbose, .. } => *verbose,
            _ => false,
        }
    }
}

#[derive(Debug, StructOpt)]
enum Create {
    User {
        #[structopt(
            long,
            parse(from_os_str),
            help = "A JSON file shaped like {\"data\": [users...]}"
        )]
        bulk: Option<PathBuf>,
        #[structopt(
            long,
            parse(from_os_str),
            conflicts_with = "bulk",
            help = "A YAML organisation chart; every member is added"
        )]
        org: Option<PathBuf>,
        #[structopt(long, number_of_values = 1)]
        dept: Vec<String>,
        #[structopt(required_unless_one = &["bulk", "org"])]
        email: Option<String>,
    },
}

#[derive(Debug, StructOpt)]
enum Get {
    Users {
        #[structopt(
            short,
            long,
            default_value = "all",
            possible_values = &[
                "all", "non2fa", "inactive", "disabled", "admin"
            ]
        )]
        filter: UserFilter,
    },
    Events {
        #[structopt(short, long, help = "A username, or \"api\"")]
        user: Option<String>,
        #[structopt(short, long, default_value = "1")]
        duration: u32,
        #[structopt(short, long)]
        verbose: bool,
    },
    Groups,
}

#[derive(Debug, StructOpt)]
enum Describe {
    User { email: String },
}

#[derive(Debug, StructOpt)]
enum Delete {
    User {
        #[structopt(
            short,
            long,
            default_value = "deactivate",
            possible_values = &["deactivate", "remove", "delete"],
            case_insensitive = true
        )]
        mode: DeactivationMode,
        email: String,
    },
}

#[derive(Debug, StructOpt)]
enum Update {
    User {
        email: String,
        #[structopt(subcommand)]
        field: UserField,
    },
}

#[derive(Debug, StructOpt)]
enum UserField {
    Department {
        #[structopt(long, number_of_values = 1)]
        join: Vec<String>,
        #[structopt(long, number_of_values = 1)]
        leave: Vec<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum UserFilter {
    All,
    Non2fa,
    Inactive,
    Disabled,
    Admin,
}

impl FromStr for UserFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(UserFilter::All),
            "non2fa" => Ok(UserFilter::Non2fa),
            "inactive" => Ok(UserFilter::Inactive),
            "disabled" => Ok(UserFilter::Disabled),
            "admin" => Ok(UserFilter::Admin),
            other => Err(anyhow::anyhow!("Unknown filter \"{}\"", other)),
        }
    }
}
