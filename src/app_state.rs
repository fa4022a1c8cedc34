use std::sync::Arc;

use crate::config::Config;
use crate::responses::{FormatterRegistry, Responses};
use crate::store::DocStore;
use crate::sync::App;

/// Shared per-process state: the orchestration facade, the response shaper
/// and the error formatter registry, all built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub responses: Arc<Responses>,
    pub registry: Arc<FormatterRegistry>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = DocStore::connect(&config.database.url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open document store: {}", e))?;

        let app = Arc::new(App::new(&store));
        let responses = Arc::new(Responses::new(app.users.clone()));
        let registry = Arc::new(FormatterRegistry::new(app.users.clone()));

        Ok(Self {
            app,
            responses,
            registry,
            config,
        })
    }

    /// State backed by an already-connected store; used by tests.
    pub fn with_store(store: &DocStore, config: Config) -> Self {
        let app = Arc::new(App::new(store));
        let responses = Arc::new(Responses::new(app.users.clone()));
        let registry = Arc::new(FormatterRegistry::new(app.users.clone()));
        Self {
            app,
            responses,
            registry,
            config,
        }
    }
}
