//! JSON data file backing the CLI
//!
//! The whole desk lives in one file: tickets and teams. It is read into the
//! in-memory repositories at start-up and written back after a mutation. A
//! sibling `.lock` file is held from open to exit, so concurrent invocations
//! take turns instead of overwriting each other.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use servicedesk_core::infrastructure::{
    InMemoryCategoryRepository, InMemoryTeamRepository, InMemoryTicketRepository, SystemClock,
};
use servicedesk_core::{DeskConfig, DomainEvent, EventPublisher, RepositoryError, Team, TeamService, Ticket, TicketService};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataFile {
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

impl DataFile {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("data file {} not found, run `servicedesk init` first", path.display());
        }
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write through a temporary file so a crash never leaves half a file.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, content).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

pub const LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Exclusive hold on a data file. The lock file is removed on drop.
#[derive(Debug)]
pub struct DataLock {
    lock_path: PathBuf,
}

impl DataLock {
    pub fn lock_path(data: &Path) -> PathBuf {
        let mut name = data.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock, waiting up to `wait` for another holder to finish.
    pub fn acquire(data: &Path, wait: Duration) -> Result<Self> {
        let lock_path = Self::lock_path(data);
        let deadline = Instant::now() + wait;

        loop {
            match OpenOptions::new().create_new(true).write(true).open(&lock_path) {
                Ok(_) => return Ok(Self { lock_path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && Instant::now() < deadline => {
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    anyhow::bail!(
                        "{} is in use by another servicedesk process (remove {} if it is stale)",
                        data.display(),
                        lock_path.display()
                    );
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("creating lock file {}", lock_path.display()));
                }
            }
        }
    }
}

impl Drop for DataLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// Logs every domain event at debug level.
#[derive(Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        for event in events {
            tracing::debug!(event_type = event.event_type(), aggregate_id = event.aggregate_id(), "domain event");
        }
        Ok(())
    }
}

/// Services wired over the repositories loaded from the data file.
pub struct Desk {
    path: PathBuf,
    _lock: DataLock,
    tickets: Arc<InMemoryTicketRepository>,
    teams: Arc<InMemoryTeamRepository>,
    pub service: Arc<TicketService>,
    pub team_service: TeamService,
    pub config: DeskConfig,
}

impl Desk {
    pub fn open(path: &Path, config: DeskConfig) -> Result<Self> {
        let lock = DataLock::acquire(path, LOCK_WAIT)?;
        let data = DataFile::read(path)?;
        tracing::debug!(
            path = %path.display(),
            tickets = data.tickets.len(),
            teams = data.teams.len(),
            "opened data file"
        );

        let tickets = Arc::new(InMemoryTicketRepository::from_tickets(data.tickets));
        let teams = Arc::new(InMemoryTeamRepository::from_teams(data.teams));
        let categories = Arc::new(InMemoryCategoryRepository::with_catalog(config.categories.catalog.clone()));
        let events = Arc::new(TracingEventPublisher);
        let clock = Arc::new(SystemClock);

        let service = TicketService::new(tickets.clone(), categories, teams.clone(), events.clone(), clock.clone())
            .with_config(&config)
            .context("applying configuration")?;
        let team_service = TeamService::new(teams.clone(), events, clock);

        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
            tickets,
            teams,
            service: Arc::new(service),
            team_service,
            config,
        })
    }

    pub fn save(&self) -> Result<()> {
        let data = DataFile {
            tickets: self.tickets.export(),
            teams: self.teams.export(),
        };
        data.write(&self.path)?;
        tracing::debug!(path = %self.path.display(), tickets = data.tickets.len(), "saved data file");
        Ok(())
    }
}
