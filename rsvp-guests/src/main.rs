//! rsvp - organizer command line for the RSVP tracker
//!
//! Manages events and guest lists in the local database and drives the
//! invitation sender. Guest-facing pages and real mail delivery live in
//! other processes; here invitations go through the logging transport.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rsvp_common::config::Settings;
use rsvp_common::db::{EventDetails, Response};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use rsvp_guests::mailer::LogTransport;
use rsvp_guests::notify::LogNotifier;
use rsvp_guests::rsvp::ResponseRecorder;
use rsvp_guests::{events, import, reconcile, AttendeeStore, Candidate, InvitationSender, SqliteStore};

/// Command-line arguments for rsvp
#[derive(Parser, Debug)]
#[command(name = "rsvp")]
#[command(about = "Event invitations and RSVP tracking")]
#[command(version)]
struct Args {
    /// Folder holding rsvp.db
    #[arg(long, global = true, env = "RSVP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Public URL used in invitation links
    #[arg(long, global = true, env = "RSVP_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),
    /// Manage an event's guest list
    #[command(subcommand)]
    Guest(GuestCommand),
    /// Send invitations
    #[command(subcommand)]
    Send(SendCommand),
    /// Record a guest's answer
    Rsvp {
        token: String,
        /// yes or no
        response: String,
        #[arg(long)]
        party_size: Option<i64>,
    },
    /// Show guest counts for an event
    Stats { event: Uuid },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    Create {
        #[arg(long)]
        title: String,
        /// RFC 3339 start time
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        description: Option<String>,
        /// IANA timezone used when displaying times
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        location_name: Option<String>,
        #[arg(long)]
        location_link: Option<String>,
    },
    List,
    Delete { event: Uuid },
}

#[derive(Subcommand, Debug)]
enum GuestCommand {
    /// Add or update a single guest
    Add {
        event: Uuid,
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        party_size: Option<i64>,
        /// Additional addresses to CC (replaces any stored ones)
        #[arg(long = "cc")]
        cc: Vec<String>,
    },
    /// Import CSV/TSV lines from a file ("-" for stdin)
    Import { event: Uuid, file: PathBuf },
    /// Import a pasted To:/Cc: header from a file ("-" for stdin)
    Paste { event: Uuid, file: PathBuf },
    /// Copy every guest from one event to another
    Copy { from: Uuid, to: Uuid },
    /// Replace a guest's additional emails
    Emails { attendee: Uuid, emails: Vec<String> },
    List { event: Uuid },
    Remove { attendee: Uuid },
}

#[derive(Subcommand, Debug)]
enum SendCommand {
    One { attendee: Uuid },
    All { event: Uuid },
}

fn read_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rsvp_guests=info,rsvp_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("rsvp v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::resolve(args.root_folder.as_deref(), args.base_url.as_deref());
    settings
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    let db_path = settings.database_path();
    let pool = rsvp_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let store: Arc<dyn AttendeeStore> = Arc::new(SqliteStore::new(pool));

    match args.command {
        Command::Event(cmd) => run_event(store.as_ref(), cmd).await,
        Command::Guest(cmd) => run_guest(store.as_ref(), cmd).await,
        Command::Send(cmd) => {
            let sender = InvitationSender::new(store, Arc::new(LogTransport), settings.base_url);
            run_send(&sender, cmd).await
        }
        Command::Rsvp {
            token,
            response,
            party_size,
        } => {
            let response: Response = response.parse()?;
            let recorder = ResponseRecorder::new(store)
                .with_notifier(Arc::new(LogNotifier))
                .notify_inline();
            let attendee = recorder.record(&token, response, party_size).await?;
            print_json(&attendee)
        }
        Command::Stats { event } => print_json(&store.guest_stats(event).await?),
    }
}

async fn run_event(store: &dyn AttendeeStore, cmd: EventCommand) -> Result<()> {
    match cmd {
        EventCommand::Create {
            title,
            start,
            end,
            description,
            timezone,
            location_name,
            location_link,
        } => {
            let details = EventDetails {
                title,
                starts_at: start,
                ends_at: end,
                description,
                timezone,
                location_name,
                location_link,
                banner_ref: None,
            };
            print_json(&events::create_event(store, details).await?)
        }
        EventCommand::List => print_json(&store.list_events().await?),
        EventCommand::Delete { event } => Ok(events::delete_event(store, event).await?),
    }
}

async fn run_guest(store: &dyn AttendeeStore, cmd: GuestCommand) -> Result<()> {
    match cmd {
        GuestCommand::Add {
            event,
            email,
            name,
            party_size,
            cc,
        } => {
            let mut candidate = Candidate::new(event, name, email);
            candidate.party_size = party_size;
            if !cc.is_empty() {
                candidate = candidate.with_additional_emails(cc);
            }
            let outcome = reconcile(store, candidate).await?;
            info!("Guest {} {}", outcome.attendee.email, if outcome.created { "added" } else { "updated" });
            print_json(&outcome.attendee)
        }
        GuestCommand::Import { event, file } => {
            let text = read_input(&file)?;
            let summary = import::import_lines(store, event, &text).await;
            if summary.failed > 0 {
                warn!("{} guests could not be imported, check logs", summary.failed);
            }
            print_json(&summary)
        }
        GuestCommand::Paste { event, file } => {
            let text = read_input(&file)?;
            print_json(&import::import_header(store, event, &text).await?)
        }
        GuestCommand::Copy { from, to } => print_json(&import::copy_attendees(store, from, to).await?),
        GuestCommand::Emails { attendee, emails } => {
            print_json(&rsvp_guests::reconcile::update_additional_emails(store, attendee, &emails).await?)
        }
        GuestCommand::List { event } => print_json(&store.list_attendees(event).await?),
        GuestCommand::Remove { attendee } => {
            if !store.delete_attendee(attendee).await? {
                bail!("attendee {} not found", attendee);
            }
            Ok(())
        }
    }
}

async fn run_send(sender: &InvitationSender, cmd: SendCommand) -> Result<()> {
    match cmd {
        SendCommand::One { attendee } => Ok(sender.send_one(attendee).await?),
        SendCommand::All { event } => {
            let report = sender.send_all_pending(event).await?;
            print_json(&report)?;
            if !report.all_succeeded() {
                bail!("some invitations failed to send, check logs");
            }
            Ok(())
        }
    }
}
