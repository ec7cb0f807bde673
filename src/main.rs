//! DSP bidding core entrypoint.
//!
//! Bootstraps configuration, logging, the catalog source, and the recall
//! sink, runs the first catalog snapshot cycle to completion (spec §4.1:
//! "The first successful cycle must complete before the HTTP endpoint
//! accepts traffic"), then starts the background reload loop and the HTTP
//! server.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{middleware as axum_mw, routing::post, Router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dsp_bidder::catalog::sqlite::SqliteCatalogSource;
use dsp_bidder::catalog::CatalogSource;
use dsp_bidder::codec::OpaqueIdCodec;
use dsp_bidder::config::Config;
use dsp_bidder::dispatcher::{handle_bid, AppState};
use dsp_bidder::metrics::{self, Metrics};
use dsp_bidder::middleware::request_logging;
use dsp_bidder::pricing::SimplePolicy;
use dsp_bidder::recall::SqliteRecallSink;
use dsp_bidder::snapshot::{run_on_interval, SnapshotPublisher};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    metrics::install_recorder().context("failed to install metrics recorder")?;
    let metrics = Arc::new(Metrics::new());

    let codec = Arc::new(OpaqueIdCodec::from_config(&config.codec_key).context("invalid CODEC_KEY")?);
    let catalog_source: Arc<dyn CatalogSource> =
        Arc::new(SqliteCatalogSource::open(&config.catalog_db_path).context("failed to open catalog database")?);
    let recall_sink = Arc::new(SqliteRecallSink::open(&config.recall_db_path).context("failed to open recall database")?);

    let publisher = Arc::new(SnapshotPublisher::new(Arc::new(SimplePolicy)));

    // Block on the first cycle — the source may not be ready yet on cold
    // start, so retry instead of failing hard (spec §4.1).
    loop {
        match publisher.reload(catalog_source.as_ref()).await {
            Ok(()) => {
                tracing::info!("initial catalog snapshot loaded");
                metrics.reload_success_total.increment(1);
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "initial catalog load failed, retrying in 5s");
                metrics.reload_failure_total.increment(1);
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
    }

    let state = AppState {
        publisher: publisher.clone(),
        recall_sink,
        codec,
        test_only: config.test_only,
        metrics: metrics.clone(),
    };

    {
        let publisher = publisher.clone();
        let catalog_source = catalog_source.clone();
        let metrics = metrics.clone();
        let interval = config.catalog_reload_interval;
        tokio::spawn(async move {
            run_on_interval(interval, || {
                let publisher = publisher.clone();
                let catalog_source = catalog_source.clone();
                let metrics = metrics.clone();
                async move {
                    match publisher.reload(catalog_source.as_ref()).await {
                        Ok(()) => {
                            tracing::info!("catalog snapshot reloaded");
                            metrics.reload_success_total.increment(1);
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "catalog reload cycle aborted, keeping old snapshot");
                            metrics.reload_failure_total.increment(1);
                        }
                    }
                }
            })
            .await;
        });
    }

    let app = Router::new()
        .route("/bid", post(handle_bid))
        .layer(axum_mw::from_fn(request_logging))
        .with_state(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "dsp bidding core listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
