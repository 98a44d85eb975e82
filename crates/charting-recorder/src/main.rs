//! Charting Recorder: console microphone recorder producing WAV files for
//! transcription.

mod app;
mod app_command;
mod config;
mod console_handler;
mod error;
mod output_handler;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    console_handler::ConsoleHandler,
    error::{AppError, Result as AppResult},
    output_handler::OutputHandler,
};

use crate::config::Config;

use std::time::Duration;

use charting_recorder_core::Capabilities;
use tokio::sync::{mpsc, watch};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "charting_recorder=debug,charting_recorder_core=info";

/// Application entry point.
fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Console output is the UI; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let output_handler = match OutputHandler::new(&config) {
        Ok(oh) => oh,
        Err(e) => {
            error!("Failed to create OutputHandler: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let console_handler = ConsoleHandler::new(command_tx);
        let app = App::new(
            Capabilities::system(config.audio.selected_device.as_deref()),
            config.recorder_options(),
            output_handler,
            command_rx,
            shutdown_tx,
        );

        tokio::join!(
            async {
                if let Err(e) = console_handler.run(shutdown_rx).await {
                    error!(error = ?e, "Console handler error");
                }
            },
            async {
                if let Err(e) = app.run().await {
                    error!(error = ?e, "App error");
                }
            }
        );
    });

    // The stdin reader may still be blocked on input.
    rt.shutdown_timeout(Duration::from_millis(500));
}
