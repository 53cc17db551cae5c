use std::sync::Arc;

use caw_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), caw_core::Error> {
    caw_core::logging::init("caw")?;

    let cfg = Arc::new(Config::load()?);

    caw_telegram::router::run(cfg)
        .await
        .map_err(|e| caw_core::Error::External(format!("telegram monitor failed: {e}")))?;

    Ok(())
}
