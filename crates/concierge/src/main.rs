use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use concierge_core::{
    config::Config,
    controller::Concierge,
    messaging::{
        port::NotificationPort,
        throttled::{ThrottleConfig, ThrottledNotifier},
    },
    snapshot::HttpSnapshotSource,
};

#[tokio::main]
async fn main() -> Result<(), concierge_core::Error> {
    concierge_core::logging::init("concierge")?;

    let cfg = Arc::new(Config::load()?);

    let detector = concierge_detect::build_detector(&cfg).await?;
    let source = Arc::new(HttpSnapshotSource::new(
        cfg.snapshot_url.clone(),
        cfg.snapshot_timeout,
    )?);

    let telegram = concierge_telegram::connect(&cfg.telegram_bot_token)
        .await
        .map_err(|e| concierge_core::Error::External(format!("telegram bot failed: {e}")))?;
    let notifier: Arc<dyn NotificationPort> = Arc::new(ThrottledNotifier::new(
        Arc::new(telegram),
        ThrottleConfig::default(),
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let mut concierge = Concierge::new(cfg, source, detector, notifier);
    concierge.run(cancel).await;

    println!("\nConcierge stopped by user.");
    Ok(())
}
