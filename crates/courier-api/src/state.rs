//! Application state wiring the engine components together.
//!
//! `AppState` holds the concrete component instances used by the bot runner
//! and the one-shot CLI commands. The engine components are generic over the
//! port traits, but AppState pins them to the concrete infra implementations.

use std::sync::Arc;

use courier_core::broadcast::Dispatcher;
use courier_core::flow::FlowStore;
use courier_core::orders::OrderDirectory;
use courier_core::window::MessageWindow;
use courier_infra::config::{load_engine_config, resolve_data_dir};
use courier_infra::sqlite::{DatabasePool, SqliteUserRepository};
use courier_types::config::EngineConfig;

/// Shared application state holding the engine components and the store.
pub struct AppState {
    pub config: EngineConfig,
    pub users: Arc<SqliteUserRepository>,
    pub window: Arc<MessageWindow>,
    pub flows: Arc<FlowStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub orders: Arc<OrderDirectory>,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, build the engine components.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_engine_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("courier.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        Ok(Self {
            users: Arc::new(SqliteUserRepository::new(db_pool)),
            window: Arc::new(MessageWindow::from_config(&config)),
            flows: Arc::new(FlowStore::new()),
            dispatcher: Arc::new(Dispatcher::from_config(&config)),
            orders: Arc::new(OrderDirectory::seeded()),
            config,
        })
    }
}
