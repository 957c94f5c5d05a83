use anyhow::Context;
use clap::{Parser, Subcommand};
use radioconfig::init_config;
use radiodj::{Error as UserError, Flag, UserDirectory, UserRecord, SUPERADMIN};
use radiomedia::{MediaExt, MediaLibrary};
use radiomonitor::{ChannelRegistry, Monitor, MonitorExt, MonitorSettings, MonitorState};
use radiompd::MpdConnector;
use radioserver::{LoggingOptions, ServerBuilder};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "RadioBackend")]
#[command(about = "Now-playing backend of the radio channels")]
#[command(version)]
struct Cli {
    /// Configuration directory (config.yaml and the user database)
    #[arg(long, global = true, default_value = "")]
    config_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the channels and serve the JSON endpoints
    Serve {
        /// Directory of the static web files
        #[arg(long)]
        http_dir: Option<PathBuf>,

        /// Directory of the music files
        #[arg(long)]
        music_dir: Option<PathBuf>,

        /// Channel configuration file
        #[arg(long)]
        channels: Option<PathBuf>,

        /// HTTP port
        port: String,
    },
    /// Create a DJ account with a generated password
    Newuser { user: String },
    /// Generate a new password for a DJ
    Newpass { user: String },
    Ban { user: String },
    Unban { user: String },
    /// Give admin rights to a DJ
    Promote { user: String },
    Demote { user: String },
    /// List the DJ accounts, or show a single one
    Users { user: Option<String> },
    /// Check the password of a DJ, exits with 1 when it is refused
    Checkpass { user: String, password: String },
}

/// Reason for a non-zero exit
enum Failure {
    /// Bad arguments or configuration, or a refused user command
    Refused(String),
    /// The HTTP port could not be bound
    Bind(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Refused(_) => 1,
            Failure::Bind(_) => 2,
        }
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Refused(format!("{:#}", e))
    }
}

impl From<UserError> for Failure {
    fn from(e: UserError) -> Self {
        Failure::Refused(e.to_string())
    }
}

type Outcome = std::result::Result<(), Failure>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match init_config(&cli.config_dir) {
        Ok(_) => run(cli.command).await,
        Err(e) => Err(Failure::from(e)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            match &failure {
                Failure::Refused(message) => eprintln!("{}", message),
                Failure::Bind(e) => eprintln!("{:#}", e),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}

async fn run(command: Command) -> Outcome {
    match command {
        Command::Serve {
            http_dir,
            music_dir,
            channels,
            port,
        } => serve(http_dir, music_dir, channels, &port).await,
        Command::Newuser { user } => newuser(&user).await,
        Command::Newpass { user } => newpass(&user).await,
        Command::Ban { user } => set_flag(&user, Flag::Banned, true).await,
        Command::Unban { user } => set_flag(&user, Flag::Banned, false).await,
        Command::Promote { user } => set_flag(&user, Flag::Admin, true).await,
        Command::Demote { user } => set_flag(&user, Flag::Admin, false).await,
        Command::Users { user } => users(user.as_deref()).await,
        Command::Checkpass { user, password } => checkpass(&user, &password).await,
    }
}

async fn open_users() -> Result<UserDirectory, Failure> {
    let path = radioconfig::get_config().get_users_database();
    UserDirectory::open(&path)
        .await
        .map_err(|e| Failure::Refused(format!("{}: {}", path.display(), e)))
}

async fn newuser(user: &str) -> Outcome {
    let users = open_users().await?;
    match users.create_user(user).await {
        Ok(password) => {
            println!("User \"{}\" created with password \"{}\".", user, password);
            Ok(())
        }
        Err(UserError::UserExists(_)) => {
            Err(Failure::Refused(format!("User \"{}\" already exists!", user)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn newpass(user: &str) -> Outcome {
    let users = open_users().await?;
    let password = users.set_password(user).await?;
    println!("Changed password to \"{}\".", password);
    Ok(())
}

async fn set_flag(user: &str, flag: Flag, value: bool) -> Outcome {
    let users = open_users().await?;
    match users.set_flag(user, flag, value).await {
        Ok(_) => {
            let done = match (flag, value) {
                (Flag::Banned, true) => "is now banned",
                (Flag::Banned, false) => "is now unbanned",
                (Flag::Admin, true) => "is now an admin",
                (Flag::Admin, false) => "is no longer an admin",
            };
            println!("User \"{}\" {}.", user, done);
            Ok(())
        }
        Err(UserError::ProtectedUser { .. }) => {
            let verb = match flag {
                Flag::Banned => "ban",
                Flag::Admin => "demote",
            };
            Err(Failure::Refused(format!("Cannot {} the superadmin!", verb)))
        }
        Err(e) => Err(e.into()),
    }
}

/// One line per account: name, flags and creation day
fn describe(user: &UserRecord) -> String {
    let flags: Vec<&str> = [(user.admin, "admin"), (user.banned, "banned")]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect();
    let mut line = user.username.clone();
    if !flags.is_empty() {
        line.push_str(&format!(" ({})", flags.join(", ")));
    }
    line.push_str(&format!(" created {}", user.created_at.format("%Y-%m-%d")));
    line
}

async fn users(user: Option<&str>) -> Outcome {
    let users = open_users().await?;
    match user {
        Some(name) => match users.get(name).await? {
            Some(record) => println!("{}", describe(&record)),
            None => return Err(Failure::Refused(format!("User \"{}\" does not exist!", name))),
        },
        None => {
            for record in users.list().await? {
                println!("{}", describe(&record));
            }
        }
    }
    Ok(())
}

async fn checkpass(user: &str, password: &str) -> Outcome {
    let users = open_users().await?;
    if users.verify(user, password).await? {
        println!("Password of \"{}\" accepted.", user);
        Ok(())
    } else {
        Err(Failure::Refused(format!("Password of \"{}\" refused.", user)))
    }
}

fn parse_port(port: &str) -> Result<u16, Failure> {
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Failure::Refused(
            "PORT must be an integer between 1 and 65535".to_string(),
        )),
    }
}

fn monitor_settings() -> anyhow::Result<MonitorSettings> {
    let config = radioconfig::get_config();
    Ok(MonitorSettings {
        poll_interval: config.get_poll_interval()?,
        before: config.get_playlist_before()?,
        after: config.get_playlist_after()?,
        stale_after: config.get_stale_after()?,
    })
}

/// Payload of `GET /info`
fn backend_info(channels: &[String]) -> serde_json::Value {
    serde_json::json!({
        "name": "RadioBackend",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": channels,
    })
}

async fn serve(
    http_dir: Option<PathBuf>,
    music_dir: Option<PathBuf>,
    channels: Option<PathBuf>,
    port: &str,
) -> Outcome {
    let config = radioconfig::get_config();
    let port = parse_port(port)?;

    let http_dir = http_dir.unwrap_or_else(|| PathBuf::from(config.get_http_dir()));
    if !http_dir.is_dir() {
        return Err(Failure::Refused(
            "--http-dir must be a directory".to_string(),
        ));
    }

    let music_dir = music_dir.unwrap_or_else(|| PathBuf::from(config.get_music_dir()));
    if !music_dir.is_dir() {
        return Err(Failure::Refused(
            "--music-dir must be a directory".to_string(),
        ));
    }

    let channels = channels.unwrap_or_else(|| PathBuf::from(config.get_channels_file()));
    let registry = load_channels(&channels)?;
    let channel_names: Vec<String> = registry.iter().map(|c| c.name.clone()).collect();

    let mut server = ServerBuilder::new_configured().http_port(port).build();
    server.init_logging(LoggingOptions::from_config()).await;
    info!(
        channels = registry.len(),
        file = %channels.display(),
        "Channel configuration loaded"
    );

    let users = open_users().await?;
    if let Some(password) = users.ensure_superadmin().await? {
        println!(
            "User \"{}\" created with password \"{}\".",
            SUPERADMIN, password
        );
    }

    let settings = monitor_settings().context("invalid radio settings")?;
    let timeout = config.get_mpd_timeout().context("invalid MPD timeout")?;
    let monitor = Arc::new(Monitor::new(
        MpdConnector::new(timeout),
        Arc::new(registry),
        settings,
    ));

    server
        .init_monitor(MonitorState::from_monitor(&monitor))
        .await?;
    server
        .init_media(MediaLibrary::new(&http_dir, &music_dir))
        .await?;
    server
        .add_route("/info", move || {
            let info = backend_info(&channel_names);
            async move { info }
        })
        .await;
    server.add_dir(&http_dir).await;

    server.start().await.map_err(Failure::Bind)?;
    let poller = monitor.clone().spawn(server.shutdown_token());

    info!("Radio backend is ready, press Ctrl+C to stop");
    server.wait().await;
    if let Err(e) = poller.await {
        warn!(error = %e, "Monitor task ended abnormally");
    }
    info!("Radio backend stopped");
    Ok(())
}

fn load_channels(path: &Path) -> Result<ChannelRegistry, Failure> {
    ChannelRegistry::load(path).map_err(|e| {
        Failure::Refused(format!(
            "--channels must be a channel configuration file ({}: {})",
            path.display(),
            e
        ))
    })
}
