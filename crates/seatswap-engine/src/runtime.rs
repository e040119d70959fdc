//! Service wiring.

use std::sync::Arc;

use seatswap_core::{JobJournal, SystemClock};
use seatswap_live::ConnectionRegistry;
use seatswap_settings::SeatswapSettings;
use seatswap_store::{Database, SqliteJobJournal, SqliteSessionStore, SqliteUserDirectory};
use tokio::task::JoinHandle;
use tracing::info;

use crate::engine::{EngineConfig, ReplacementEngine};
use crate::error::EngineError;
use crate::scheduler::TokioScheduler;

/// A running replacement service: store, live registry, scheduler and
/// engine wired together.
pub struct Runtime {
    engine: Arc<ReplacementEngine>,
    registry: Arc<ConnectionRegistry>,
    store: SqliteSessionStore,
    directory: SqliteUserDirectory,
    scheduler: Arc<TokioScheduler>,
    dispatcher: JoinHandle<()>,
}

impl Runtime {
    /// Open the configured database and start the service.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(settings: &SeatswapSettings) -> Result<Self, EngineError> {
        let path = seatswap_settings::database_path(settings);
        let db = Database::open(&path)?;
        Self::with_database(db, settings)
    }

    /// Start the service on an already opened database.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_database(db: Database, settings: &SeatswapSettings) -> Result<Self, EngineError> {
        let store = SqliteSessionStore::new(db.clone());
        let directory = SqliteUserDirectory::new(db.clone());
        let journal: Arc<dyn JobJournal> = Arc::new(SqliteJobJournal::new(db));
        let registry = Arc::new(ConnectionRegistry::new(settings.live.send_queue_capacity));

        let (scheduler, dispatcher) = TokioScheduler::new(Arc::new(SystemClock), Some(journal));
        let scheduler = Arc::new(scheduler);

        let engine = Arc::new(ReplacementEngine::new(
            Arc::new(store.clone()),
            registry.clone(),
            scheduler.clone(),
            Arc::new(directory.clone()),
            EngineConfig::from(&settings.replacement),
        ));
        let dispatcher = dispatcher.spawn(engine.clone());
        let recovered = scheduler.recover()?;

        info!(
            recovered,
            idle_threshold_ms = settings.replacement.idle_threshold_ms,
            max_duration_ms = settings.replacement.max_duration_ms,
            "replacement service started"
        );

        Ok(Self {
            engine,
            registry,
            store,
            directory,
            scheduler,
            dispatcher,
        })
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<ReplacementEngine> {
        &self.engine
    }

    /// Live connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Session persistence, for creating and inspecting sessions.
    pub fn store(&self) -> &SqliteSessionStore {
        &self.store
    }

    /// User directory, for registering display names.
    pub fn directory(&self) -> &SqliteUserDirectory {
        &self.directory
    }

    /// Stop timers and the dispatcher. Journaled jobs survive for the next start.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        self.dispatcher.abort();
        let _ = self.dispatcher.await;
        info!("replacement service stopped");
    }
}
