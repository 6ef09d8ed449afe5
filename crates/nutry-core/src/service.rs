// Background recompute loop - keeps the ranking in step with the kitchen
use crate::recommendation::{Recommendation, RecommendationEngine, RecommendationMode, Snapshot};
use crate::store::KitchenStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Latest published ranking
#[derive(Debug, Clone)]
pub struct Ranking {
    /// Bumped on every publish; 0 means nothing computed yet
    pub generation: u64,
    pub mode: RecommendationMode,
    pub entries: Vec<Recommendation>,
    pub computed_at: DateTime<Utc>,
}

impl Ranking {
    fn empty(mode: RecommendationMode) -> Self {
        Self {
            generation: 0,
            mode,
            entries: Vec::new(),
            computed_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
enum Command {
    SetMode(RecommendationMode),
    ToggleMode,
    Refresh,
}

enum Wake {
    DataChanged,
    Command(Command),
    Shutdown,
}

/// Cheap cloneable handle for talking to a running service
#[derive(Clone)]
pub struct RecommendationHandle {
    commands: mpsc::Sender<Command>,
    rankings: watch::Receiver<Ranking>,
}

impl RecommendationHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ServiceStopped)
    }

    pub async fn set_mode(&self, mode: RecommendationMode) -> Result<()> {
        self.send(Command::SetMode(mode)).await
    }

    pub async fn toggle_mode(&self) -> Result<()> {
        self.send(Command::ToggleMode).await
    }

    /// Force a recompute even if nothing changed (e.g. time moved on)
    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    pub fn latest(&self) -> Ranking {
        self.rankings.borrow().clone()
    }

    /// Wait for the first ranking matching `predicate`
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<Ranking>
    where
        F: FnMut(&Ranking) -> bool,
    {
        let mut rankings = self.rankings.clone();
        let ranking = rankings
            .wait_for(|ranking| predicate(ranking))
            .await
            .map_err(|_| Error::ServiceStopped)?;
        Ok(ranking.clone())
    }

    pub async fn wait_for_generation(&self, generation: u64) -> Result<Ranking> {
        self.wait_until(|ranking| ranking.generation >= generation)
            .await
    }
}

/// Single-flight recompute worker
///
/// Wakes on store writes or handle commands, waits out the debounce window
/// so a burst collapses into one pass, then ranks against a fresh snapshot.
/// Changes are marked seen before the snapshot is read, so a write racing
/// the recompute just triggers one more pass - nothing is left stale.
pub struct RecommendationService {
    store: Arc<dyn KitchenStore>,
    engine: RecommendationEngine,
    debounce: Duration,
    commands: mpsc::Receiver<Command>,
    changes: watch::Receiver<u64>,
    publisher: watch::Sender<Ranking>,
    generation: u64,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn KitchenStore>,
        engine: RecommendationEngine,
        debounce: Duration,
    ) -> (Self, RecommendationHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (publisher, rankings) = watch::channel(Ranking::empty(engine.mode()));
        let changes = store.changes();

        let service = Self {
            store,
            engine,
            debounce,
            commands: command_rx,
            changes,
            publisher,
            generation: 0,
        };
        let handle = RecommendationHandle {
            commands: command_tx,
            rankings,
        };
        (service, handle)
    }

    /// Build and start the loop on the current tokio runtime
    pub fn spawn(
        store: Arc<dyn KitchenStore>,
        engine: RecommendationEngine,
        debounce: Duration,
    ) -> (RecommendationHandle, JoinHandle<()>) {
        let (service, handle) = Self::new(store, engine, debounce);
        let task = tokio::spawn(service.run());
        (handle, task)
    }

    /// Runs until every handle is dropped
    pub async fn run(mut self) {
        info!(mode = %self.engine.mode(), "Recommendation service started");
        self.changes.borrow_and_update();
        self.recompute().await;

        loop {
            let wake = tokio::select! {
                changed = self.changes.changed() => match changed {
                    Ok(()) => Wake::DataChanged,
                    Err(_) => Wake::Shutdown,
                },
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => Wake::Shutdown,
                },
            };

            match wake {
                Wake::Shutdown => break,
                Wake::DataChanged => debug!("store changed"),
                Wake::Command(command) => self.apply(command),
            }

            if !self.debounce.is_zero() {
                tokio::time::sleep(self.debounce).await;
            }
            while let Ok(command) = self.commands.try_recv() {
                self.apply(command);
            }
            self.changes.borrow_and_update();

            self.recompute().await;
        }

        info!("Recommendation service stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetMode(mode) => self.engine.set_mode(mode),
            Command::ToggleMode => {
                self.engine.toggle_mode();
            }
            Command::Refresh => {}
        }
        debug!(?command, mode = %self.engine.mode(), "command applied");
    }

    async fn recompute(&mut self) {
        let snapshot = match Snapshot::load(self.store.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Keep serving the previous ranking; the next change retries
                error!(error = %e, "Failed to load kitchen snapshot");
                return;
            }
        };

        let now = Utc::now();
        let entries = self.engine.recompute(&snapshot, now);
        self.generation += 1;
        debug!(
            generation = self.generation,
            mode = %self.engine.mode(),
            dishes = entries.len(),
            "ranking published"
        );

        self.publisher.send_replace(Ranking {
            generation: self.generation,
            mode: self.engine.mode(),
            entries,
            computed_at: now,
        });
    }
}
