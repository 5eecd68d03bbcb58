use crate::{AppResult, HeadlessPlayer, config::Config};

use sharktopoda_core::{Session, VideoCoordinator};

use std::sync::Arc;

use tracing::{error, info, instrument};

/// Main application state.
///
/// Owns the loaded configuration; the protocol session runs on its own
/// task and is driven through a `SessionHandle`.
pub struct App {
    pub(crate) config: Config,
}

impl App {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C, then shut the session down.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<()> {
        info!("Sharktopoda starting");

        let mut session = Session::new().await?;
        let player = Arc::new(HeadlessPlayer::new());
        let coordinator = VideoCoordinator::new(player, session.serial_context());
        session.configure(&coordinator);

        let handle = session.handle();
        let session_task = tokio::spawn(session.run());

        let server = &self.config.server;
        if server.start_on_launch {
            // Not retried; the port can be changed in config and the app restarted.
            match handle.start_listening(server.port).await {
                Ok(port) => info!(port, "Accepting commands"),
                Err(e) => error!(port = server.port, error = ?e, "Failed to start listening"),
            }
        } else {
            info!("start_on_launch is off, not listening");
        }

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");

        handle.shutdown().await?;
        if let Err(e) = session_task.await {
            error!(error = ?e, "Session task failed");
        }

        info!("Sharktopoda stopped");
        Ok(())
    }
}
