//! Console command reader.
//!
//! Reads commands line by line from stdin and forwards them to the main
//! application over an async channel.

use crate::{AppCommand, AppError, AppResult};

use std::{
    io::{BufRead, BufReader, Read},
    panic::Location,
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Forwards parsed console commands to the application.
pub struct ConsoleHandler {
    command_tx: mpsc::Sender<AppCommand>,
}

impl ConsoleHandler {
    /// Create a handler sending into `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Run the console loop over stdin until shutdown or end of input.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        self.run_with(std::io::stdin(), shutdown_rx).await
    }

    /// Run the console loop over any line source.
    ///
    /// End of input is treated as a quit command.
    #[instrument(skip(self, input, shutdown_rx))]
    pub async fn run_with<R>(
        &self,
        input: R,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> AppResult<()>
    where
        R: Read + Send + 'static,
    {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

        // Single blocking task that forwards lines. When line_rx is dropped
        // the next blocking_send fails and the loop ends.
        let handle = tokio::task::spawn_blocking(move || {
            for line in BufReader::new(input).lines() {
                let Ok(line) = line else {
                    break;
                };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Console handler shutting down");
                    break;
                }
                line = line_rx.recv() => {
                    let Some(line) = line else {
                        info!("Console input closed");
                        self.send(AppCommand::Shutdown).await?;
                        break;
                    };
                    match AppCommand::parse(&line) {
                        Ok(Some(command)) => {
                            let quit = command == AppCommand::Shutdown;
                            self.send(command).await?;
                            if quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!(error = %e, "Rejected console input");
                            println!("{}", usage(&line));
                        }
                    }
                }
            }
        }

        drop(line_rx);

        // The blocking read cannot be interrupted; it ends with the process.
        match tokio::time::timeout(Duration::from_millis(100), handle).await {
            Ok(Ok(())) => debug!("Console reader stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Console reader task panicked"),
            Err(_) => debug!("Console reader still blocked on input, will be cleaned up on exit"),
        }

        Ok(())
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Help text shown for unrecognized input.
pub(crate) fn usage(input: &str) -> String {
    format!(
        "Unknown command {:?}. Commands: start | pause | resume | stop | cancel | status | save [name] | quit",
        input.trim()
    )
}
