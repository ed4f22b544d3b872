//! 主应用程序入口
//!
//! 加载配置，连接存储，启动不活跃清理任务与 Axum Web API 服务。

use std::sync::Arc;

use application::{
    ChatService, ChatServiceDependencies, Clock, InactivitySweeper, SweeperDependencies,
    SweeperSettings, SystemClock,
};
use config::{AppConfig, LogConfig, LogFormat};
use infrastructure::Storage;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;
use web_api::{cors_layer, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.log);
    tracing::info!(config = %config.sanitize(), "配置加载完成");

    let storage = Storage::connect(&config.database).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sweeper = Arc::new(InactivitySweeper::new(SweeperDependencies {
        participant_repository: storage.participants.clone(),
        message_repository: storage.messages.clone(),
        clock: clock.clone(),
        settings: SweeperSettings {
            interval: config.sweeper.interval(),
            stale_after: config.sweeper.stale_after(),
            store_timeout: config.store.timeout(),
        },
    }));

    let chat_service = ChatService::new(ChatServiceDependencies {
        participant_repository: storage.participants.clone(),
        message_repository: storage.messages.clone(),
        clock,
        sweeper: sweeper.clone(),
        store_timeout: config.store.timeout(),
    });

    sweeper.ensure_running();

    let app = router(AppState::new(Arc::new(chat_service)))
        .layer(cors_layer(&config.server.cors_origins));

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("聊天室服务器启动在 http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown();
    tracing::info!("Server shut down");
    Ok(())
}

/// `RUST_LOG` 优先于配置中的过滤规则
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.filter.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
