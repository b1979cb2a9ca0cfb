//! Thin HTTP surface over [`ChatService`](crate::service::ChatService).

pub mod error;
pub mod routes;

pub use error::{AppError, AppResult};
pub use routes::{AppState, router};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serves the chat API on `listener` until `shutdown` is cancelled. In-flight
/// requests are allowed to complete.
pub async fn serve(
    listener: TcpListener,
    service: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Chat API listening on http://{addr}");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
