pub mod books;

use std::sync::Arc;

use shelfbot_kernel::settings::Settings;
use shelfbot_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
) -> anyhow::Result<Arc<books::BooksModule>> {
    registry.register_core(shelfbot_telemetry::create_module());

    let books = books::create_module(settings)?;
    registry.register_custom(books.clone());

    Ok(books)
}
