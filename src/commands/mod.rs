pub mod find;
pub mod load;
pub mod status;
pub mod users;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{Environment, StoreArgs};
use crate::config::{StoreSettings, load_store_settings, resolve_environment};
use crate::store::DocumentStore;

pub struct StoreContext {
    pub environment: Environment,
    pub settings: StoreSettings,
    pub store: DocumentStore,
}

pub fn open_store(args: &StoreArgs) -> Result<StoreContext> {
    let environment = resolve_environment(args.environment);
    let settings = load_store_settings(args.config.as_deref())
        .context("failed to resolve document store settings")?;
    let store = DocumentStore::new(settings.clone(), environment.database_name());

    info!(
        environment = environment.as_str(),
        database = store.database(),
        root = %settings.root.display(),
        auth = settings.auth,
        "selected document store"
    );

    Ok(StoreContext {
        environment,
        settings,
        store,
    })
}
