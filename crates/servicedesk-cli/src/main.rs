//! Service Desk CLI
//!
//! Command-line front end over the service desk core, backed by a JSON data
//! file.
//!
//! # Usage
//!
//! ```bash
//! servicedesk init
//! servicedesk create --title "WiFi drops" --priority high --category cat-001 --requester user-001
//! servicedesk list --status new --status assigned --page 2
//! servicedesk transition TKT-2026-0001 in_progress --as staff-001
//! servicedesk rate TKT-2026-0001 5 --comment "Fast fix"
//! servicedesk stats --format json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicedesk_core::{Channel, Priority, TicketStatus};

mod commands;
mod config;
mod data;
mod output;

#[derive(Parser)]
#[command(name = "servicedesk")]
#[command(author = "OpenSASE")]
#[command(version)]
#[command(about = "IT service desk ticket management", long_about = None)]
struct Cli {
    /// JSON data file holding tickets and teams
    #[arg(long, env = "SERVICEDESK_DATA", default_value = "servicedesk.json")]
    data: PathBuf,

    /// Configuration file (.toml or .json)
    #[arg(long, env = "SERVICEDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Actor recorded on mutations
    #[arg(long = "as", env = "SERVICEDESK_ACTOR", default_value = "system")]
    actor: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty data file and the default config
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Open a new ticket
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Category id; unknown ids fall back to the default category
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        requester: String,
        #[arg(long, value_enum, default_value = "web")]
        channel: ChannelArg,
    },
    /// Show ticket details
    Show { id: String },
    /// List tickets, newest first
    List {
        #[arg(long)]
        status: Vec<TicketStatus>,
        #[arg(long)]
        priority: Vec<Priority>,
        /// Matches title or description, case-insensitive
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        requester: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Move a ticket to a new status
    Transition {
        id: String,
        status: TicketStatus,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Add a comment to a ticket
    Comment {
        id: String,
        text: String,
        /// Visible to staff only
        #[arg(long)]
        internal: bool,
    },
    /// Assign a ticket to an agent and/or team
    Assign {
        id: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        team: Option<String>,
    },
    /// Rate a resolved or closed ticket
    Rate {
        id: String,
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Ticket analytics
    Stats {
        /// Per-agent breakdown instead of the summary
        #[arg(long)]
        agents: bool,
    },
    /// Show the active SLA policies
    Sla,
    /// Manage teams
    Team {
        #[command(subcommand)]
        action: TeamCommands,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// List teams
    List,
    /// Create a team
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a member to a team
    AddMember {
        team: String,
        user: String,
        #[arg(long)]
        leader: bool,
    },
    /// Remove a member from a team
    RemoveMember { team: String, user: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Web,
    Email,
    Mobile,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Web => Channel::Web,
            ChannelArg::Email => Channel::Email,
            ChannelArg::Mobile => Channel::Mobile,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
