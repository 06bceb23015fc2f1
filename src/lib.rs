//! shelfbot application library
//!
//! A chat-bot front end for a personal book catalogue kept in one JSON file.

pub mod modules;

use anyhow::Context;
use shelfbot_kernel::settings::Settings;
use shelfbot_kernel::{InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::books::{
    dispatch::{Dispatcher, Update},
    error::CatalogueError,
    models::Book,
    presenter::Reply,
    store::CatalogueStore,
};

/// Bring every module up, serve HTTP until shutdown, then stop modules.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry
        .init_all(&ctx)
        .await
        .context("failed to initialize modules")?;

    tracing::info!(
        env = ?settings.environment,
        catalogue = %settings.storage.catalogue_path.display(),
        "shelfbot bootstrap complete"
    );

    registry
        .start_all(&ctx)
        .await
        .context("failed to start modules")?;

    let served = shelfbot_http::start_server(&registry, &settings).await;

    registry.stop_all().await.context("failed to stop modules")?;
    served
}

/// Build the dispatcher and prepare the catalogue without any transport.
pub async fn standalone_dispatcher(settings: &Settings) -> anyhow::Result<Dispatcher> {
    shelfbot_telemetry::init(&settings.telemetry);

    let dispatcher = Dispatcher::from_settings(settings)?;
    if settings.storage.create_if_missing {
        dispatcher
            .store()
            .ensure_exists()
            .await
            .context("failed to prepare the catalogue file")?;
    }
    Ok(dispatcher)
}
