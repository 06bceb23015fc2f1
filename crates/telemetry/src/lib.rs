//! Tracing subscriber bootstrap.

use std::sync::Arc;

use async_trait::async_trait;
use shelfbot_kernel::settings::{LogFormat, TelemetrySettings};
use shelfbot_kernel::{InitCtx, Module};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber described by `settings`, writing to stderr.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns `false`
/// when a subscriber was already installed, which is not treated as an error.
pub fn init(settings: &TelemetrySettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };

    if installed {
        tracing::info!(
            target: "shelfbot-telemetry",
            format = ?settings.log_format,
            filter = %settings.log_filter,
            "telemetry initialized"
        );
    }

    installed
}

/// Core module wrapping [`init`] so the registry brings logging up first.
pub struct TelemetryModule;

#[async_trait]
impl Module for TelemetryModule {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        init(&ctx.settings.telemetry);
        Ok(())
    }
}

/// Create a new instance of the telemetry module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(TelemetryModule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfbot_kernel::settings::Settings;

    #[tokio::test]
    async fn second_init_is_harmless() {
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };
        let module = create_module();

        module.init(&ctx).await.unwrap();
        module.init(&ctx).await.unwrap();
        assert!(!init(&settings.telemetry));
    }
}
