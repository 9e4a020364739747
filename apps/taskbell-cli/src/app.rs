//! Wires the notification client, toast manager and terminal output.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use taskbell_client::{ClientEvent, ClientHandlers, ConnectionState, NotificationClient};
use taskbell_toast::{ToastManager, ToastPhase};

use crate::config::CliConfig;

/// Runs until Ctrl-C, or until the client gives up reconnecting.
pub async fn run(config: CliConfig) -> anyhow::Result<()> {
    let target = config.target()?;
    let cancel = CancellationToken::new();
    let toasts = Arc::new(ToastManager::default());

    let handlers = {
        let toasts = config.toasts.then(|| Arc::clone(&toasts));
        ClientHandlers::new()
            .on_notification(move |n| {
                println!("{}", n.summary());
                if let Some(toasts) = &toasts {
                    toasts.show(n.clone());
                }
            })
            .on_error(|e| tracing::warn!(error = %e, "transport error"))
    };

    let client = NotificationClient::new(config.client_config(), handlers);

    // -- Toast phases --
    let mut toast_events = toasts.subscribe();
    let toast_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                _ = toast_cancel.cancelled() => break,
                ev = toast_events.recv() => ev,
            };
            match ev {
                Ok(ev) if ev.phase == ToastPhase::Removed => {
                    tracing::debug!(id = ev.id, "toast gone");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "toast events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // -- Status line --
    let mut events = client.subscribe();
    let closed = CancellationToken::new();
    let status_closed = closed.clone();
    let status_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                _ = status_cancel.cancelled() => break,
                ev = events.recv() => ev,
            };
            match ev {
                Ok(ClientEvent::StateChanged(state)) => {
                    tracing::info!(state = state.label(), "connection state");
                    if state == ConnectionState::Closed {
                        status_closed.cancel();
                    }
                }
                Ok(ClientEvent::Reconnecting { attempt, delay }) => {
                    eprintln!("connection lost, retry {attempt} in {}s", delay.as_secs_f32());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "client events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    client.connect(target.clone()).await?;
    tracing::info!(url = %target, "connecting");

    // -- Main loop: wait for shutdown --
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = closed.cancelled() => {
            tracing::error!(
                attempts = config.max_reconnect_attempts,
                "server unreachable, giving up"
            );
        }
    }

    // -- Graceful shutdown --
    client.shutdown().await;
    toasts.dispose();
    cancel.cancel();

    let history = client.current_notifications();
    if !history.is_empty() {
        tracing::info!(received = history.len(), "reminders this session");
    }
    Ok(())
}
