use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled on SIGTERM or SIGINT. Pass it to every replica so they all
/// stop together.
pub fn install_shutdown_handler(logger: slog::Logger) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                slog::error!(logger, "Failed to install SIGTERM handler: {}", e);
                token_clone.cancel();
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                slog::info!(logger, "Received SIGTERM, shutting down");
            }
            result = tokio::signal::ctrl_c() => match result {
                Ok(_) => slog::info!(logger, "Received SIGINT, shutting down"),
                Err(e) => slog::error!(logger, "Failed to listen for SIGINT: {}", e),
            },
        }

        token_clone.cancel();
    });

    token
}
