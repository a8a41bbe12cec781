use std::process::ExitCode;

use hub_hooks::config::Config;
use hub_hooks::delivery::{EventStream, event_channel};
use hub_hooks::server::{AppState, build_router};
use hub_hooks::webhooks::EventDetail;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_hooks=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if config.secret.is_empty() {
        warn!("No webhook secret configured; signature verification is DISABLED");
    }

    let (publisher, events) = event_channel(&config.delivery);
    let state = AppState::with_static_secret(config.secret.clone(), publisher)
        .with_max_body_bytes(config.max_body_bytes);
    let app = build_router(state);

    let consumer = tokio::spawn(log_events(events));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.listen_addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.listen_addr, delivery = ?config.delivery, "listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    // The router owns the only publisher, so once the server has finished the
    // in-flight requests the channel closes and the consumer runs dry.
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;

    if let Err(e) = consumer.await {
        warn!(error = %e, "Event consumer task failed");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

/// Stand-in consumer: logs each event until the channel closes.
async fn log_events(mut events: EventStream) {
    while let Some(event) = events.recv().await {
        log_event(&event);
    }
    info!("Delivery channel closed");
}

fn log_event(event: &hub_hooks::webhooks::Event) {
    let delivery_id = event.delivery_id.as_ref().map(|d| d.as_str());

    if let Some(e) = &event.error {
        warn!(delivery_id, event = %event.name, error = %e, "Received undecodable event");
        return;
    }

    match &event.detail {
        Some(EventDetail::PullRequest(pr)) => info!(
            delivery_id,
            repo = %pr.repository.repo_id(),
            number = pr.number,
            action = ?pr.action,
            sender = %pr.sender.login,
            "Pull request event"
        ),
        Some(EventDetail::Push(push)) => info!(
            delivery_id,
            repo = %push.repository.repo_id(),
            git_ref = %push.ref_name,
            after = %push.after.short(),
            commits = push.commits.len(),
            sender = %push.sender.login,
            "Push event"
        ),
        None => info!(delivery_id, event = %event.name, "Ignored event"),
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
