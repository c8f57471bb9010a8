use std::sync::Arc;

use quillsign_core::config::PortalConfig;
use quillsign_core::PortalBackend;
use quillsign_backend_remote::{RealtimeSubscriber, RemoteBackend};
use quillsign_portal::{ClientContext, EventHub, NotificationReconciler, SessionManager};
use quillsign_storage_sqlite::{SqliteBackend, SqliteClientStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().pretty().init();

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/portal.toml".to_string());
    let config = PortalConfig::load(&config_path)?;

    // Ensure the data directory exists
    std::fs::create_dir_all("data")?;

    let client_store = Arc::new(SqliteClientStore::connect(&config.storage.database_url).await?);
    let hub = EventHub::new(256);

    // Backend selection happens exactly once, at startup.
    match config.backend.url.clone() {
        Some(url) => {
            tracing::info!("remote backend selected: {url}");
            let backend = Arc::new(RemoteBackend::new(&url, config.backend.api_key.clone()));

            if let Some(realtime_url) = &config.backend.realtime_url {
                let subscriber = RealtimeSubscriber::new(realtime_url, hub.sender());
                tokio::spawn(subscriber.run());
            }

            let manager = Arc::new(SessionManager::new(
                backend.clone(),
                client_store.clone(),
                &config.session,
                ClientContext::default(),
            ));
            if manager.restore().await? {
                if let Some(session) = manager.current().await {
                    backend.set_bearer(&session.token).await;
                }
            }
            run_portal(manager, backend, client_store, hub, config).await
        }
        None => {
            tracing::info!("no remote backend configured, using local fallback");
            let backend = Arc::new(SqliteBackend::connect(&config.storage.database_url).await?);
            let manager = Arc::new(SessionManager::new(
                backend.clone(),
                client_store.clone(),
                &config.session,
                ClientContext::default(),
            ));
            manager.restore().await?;
            run_portal(manager, backend, client_store, hub, config).await
        }
    }
}

/// Bring the restored session (if any) online: validation in the background,
/// never blocking readiness, and the notification loop on its own task.
async fn run_portal<B: PortalBackend>(
    manager: Arc<SessionManager<B, SqliteClientStore>>,
    backend: Arc<B>,
    client_store: Arc<SqliteClientStore>,
    hub: EventHub,
    config: PortalConfig,
) -> anyhow::Result<()> {
    if let Some(session) = manager.current().await {
        tracing::info!(
            sub_account = %session.sub_account.username,
            "sub-account session restored"
        );

        {
            let manager = manager.clone();
            tokio::spawn(async move { manager.validate_current().await });
        }

        let reconciler = Arc::new(NotificationReconciler::new(
            backend,
            client_store,
            &config.notifications,
        ));
        let mut unread = reconciler.unread_counts();
        let events = hub.subscribe();
        let user_id = session.sub_account.main_account_id.clone();
        tokio::spawn(async move { reconciler.run(&user_id, events).await });
        tokio::spawn(async move {
            while unread.changed().await.is_ok() {
                let total = *unread.borrow();
                tracing::info!(total, "unread notifications");
            }
        });
    } else {
        tracing::info!("no stored sub-account session");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
