use std::error::Error;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use placebo::alerts::{admin_alerts, forward_alerts};
use placebo::chat::{ChannelCoordinator, ChatClient, MemoryChat, SlackClient};
use placebo::config::{Config, SlackConfig};
use placebo::documents::{DocumentClient, MemoryDocuments};
use placebo::google::{DriveClient, GoogleClient, SheetsClient};
use placebo::server::{AppState, build_router};
use placebo::tracker::{MemoryTracker, TrackerClient, TrackerMutator};
use placebo::worker::{Coordinator, WorkerSettings, task_queue};

const DRY_RUN_QM_CHANNEL: &str = "CQM";
const DRY_RUN_UNLOCKS_CHANNEL: &str = "CUNLOCKS";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;

    let admin = config
        .slack
        .as_ref()
        .and_then(|slack| Some((slack.token.clone(), slack.admin_user.clone()?)));
    let (alert_layer, alerts) = admin.as_ref().map(|_| admin_alerts()).unzip();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(alert_layer)
        .init();

    if let (Some((token, admin_user)), Some(rx)) = (admin, alerts) {
        info!(%admin_user, "Sending error logs to the admin");
        tokio::spawn(forward_alerts(SlackClient::new(token), admin_user, rx));
    }

    if config.signing_secret.is_none() {
        warn!("No signing secret configured; Slack requests will not be verified");
    }

    let chat = config.slack.clone().map(|slack| {
        let SlackConfig {
            token,
            qm_channel_id,
            unlocks_channel_id,
            ..
        } = slack;
        (SlackClient::new(token), qm_channel_id, unlocks_channel_id)
    });

    match (chat, config.google.clone()) {
        (Some((slack, qm, unlocks)), Some(google_config)) => {
            let google = GoogleClient::new(google_config.access_token);
            let sheets = SheetsClient::new(
                google.clone(),
                google_config.spreadsheet_id,
                google_config.sheet_id,
            );
            let drive = DriveClient::new(
                google,
                google_config.template_id,
                google_config.puzzles_folder_id,
                google_config.solved_folder_id,
            );
            serve(&config, sheets, ChannelCoordinator::new(slack, qm, unlocks), drive).await
        }
        (Some((slack, qm, unlocks)), None) => {
            info!("No Google credentials; tracker and documents are in memory");
            let chat = ChannelCoordinator::new(slack, qm, unlocks);
            serve(&config, MemoryTracker::new(), chat, MemoryDocuments::new()).await
        }
        (None, Some(google_config)) => {
            info!("No Slack token; chat is in memory");
            let google = GoogleClient::new(google_config.access_token);
            let sheets = SheetsClient::new(
                google.clone(),
                google_config.spreadsheet_id,
                google_config.sheet_id,
            );
            let drive = DriveClient::new(
                google,
                google_config.template_id,
                google_config.puzzles_folder_id,
                google_config.solved_folder_id,
            );
            serve(&config, sheets, dry_run_chat(), drive).await
        }
        (None, None) => {
            info!("Dry run: no remote services configured");
            serve(
                &config,
                MemoryTracker::new(),
                dry_run_chat(),
                MemoryDocuments::new(),
            )
            .await
        }
    }
}

fn dry_run_chat() -> ChannelCoordinator<MemoryChat> {
    ChannelCoordinator::new(MemoryChat::new(), DRY_RUN_QM_CHANNEL, DRY_RUN_UNLOCKS_CHANNEL)
}

/// Starts the worker and the HTTP server, returning once both have stopped.
async fn serve<T, C, D>(
    config: &Config,
    tracker: T,
    chat: ChannelCoordinator<C>,
    documents: D,
) -> Result<(), Box<dyn Error>>
where
    T: TrackerClient + Send + Sync + 'static,
    C: ChatClient + Send + Sync + 'static,
    D: DocumentClient + Clone + Send + Sync + 'static,
{
    let (queue, rx) = task_queue();
    let coordinator = Coordinator::new(
        TrackerMutator::new(tracker, config.slack_workspace.clone()),
        chat,
        documents,
        queue.clone(),
        WorkerSettings {
            create_metas: config.create_metas,
        },
    );

    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(coordinator.run(rx, shutdown.clone()));

    let signing_secret = config.signing_secret.clone().map(String::into_bytes);
    let app = build_router(AppState::new(queue, signing_secret));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;

    shutdown.cancel();
    worker.await?;
    Ok(())
}
