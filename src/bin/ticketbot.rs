use anyhow::Result;
use std::sync::Arc;
use ticket_panel::{config::Settings, AppContext, run};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let ctx: Arc<AppContext> = AppContext::bootstrap(settings)?;
    run(ctx).await
}
