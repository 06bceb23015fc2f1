use anyhow::Context;
use shelfbot_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load shelfbot settings")?;

    shelfbot_app::serve(settings).await
}
