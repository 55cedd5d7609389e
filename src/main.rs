//! news-pulse binary entrypoint.
//! Boots the ingestion scheduler and the Axum read surface on Shuttle.

use news_pulse::metrics::Metrics;
use news_pulse::{build_app, Settings};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_pulse=info,ingest=info,scheduler=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env().map_err(anyhow::Error::from)?;

    // Recorder first so series described during wiring are kept.
    let metrics = match Metrics::init(settings.interval.as_secs()) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = %e, "prometheus recorder not installed; /metrics disabled");
            None
        }
    };

    let app = build_app(settings).await?;
    let scheduler = app.start_scheduler();
    let mut router = app.router(scheduler);
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    info!(
        interval_secs = app.settings.interval.as_secs(),
        target_lang = %app.settings.target_lang,
        "news-pulse started"
    );
    Ok(router.into())
}
