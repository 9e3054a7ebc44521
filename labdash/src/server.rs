//! axumサーバー起動・シャットダウンハンドリング

use crate::shutdown::ShutdownController;
use crate::AppState;
use tokio::net::TcpListener;
use tracing::info;

/// 待ち受けアドレスにバインドしてサーバーを起動する
///
/// ポーリングはここでは開始しない（呼び出し側で `checker.start()` する）。
pub async fn run(state: AppState, bind_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Homelab dashboard listening on {}", listener.local_addr()?);
    serve(listener, state).await
}

/// バインド済みのリスナーでサーバーを起動し、シャットダウンシグナルを待機する
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = crate::api::create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// シャットダウンのきっかけ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownTrigger {
    CtrlC,
    Terminate,
    Requested,
}

/// OSシグナルまたはプロセス内要求を待機
async fn shutdown_signal(shutdown: ShutdownController) {
    let trigger = wait_for_trigger(shutdown).await;
    info!(trigger = ?trigger, "Shutting down dashboard server");
}

async fn wait_for_trigger(shutdown: ShutdownController) -> ShutdownTrigger {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownTrigger::CtrlC,
        _ = terminate => ShutdownTrigger::Terminate,
        _ = shutdown.wait() => ShutdownTrigger::Requested,
    }
}
