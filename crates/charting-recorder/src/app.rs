use crate::{AppCommand, AppError, AppResult, OutputHandler, output_handler::file_name};

use std::{panic::Location, sync::Arc, time::SystemTime};

use charting_recorder_core::{
    AudioRecorder, Capabilities, ChannelObserver, RecorderOptions, RecordingState,
    format_duration,
};
use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Main application state.
///
/// Owns the recorder and reacts to console commands and recorder snapshots
/// from a single select loop.
pub struct App {
    pub(crate) recorder: AudioRecorder,
    pub(crate) capabilities: Capabilities,
    pub(crate) options: RecorderOptions,
    pub(crate) output_handler: Arc<OutputHandler>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) state_tx: mpsc::UnboundedSender<RecordingState>,
    pub(crate) state_rx: mpsc::UnboundedReceiver<RecordingState>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) session_id: Option<Uuid>,
    pub(crate) last_shown: RecordingState,
    /// Background transcriptions, drained before shutdown completes.
    pub(crate) transcriptions: JoinSet<()>,
}

impl App {
    /// Create the application around a fresh recorder.
    pub fn new(
        capabilities: Capabilities,
        options: RecorderOptions,
        output_handler: OutputHandler,
        command_rx: mpsc::Receiver<AppCommand>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let recorder = new_recorder(&capabilities, &options, &state_tx);

        Self {
            recorder,
            capabilities,
            options,
            output_handler: Arc::new(output_handler),
            command_rx,
            state_tx,
            state_rx,
            shutdown_tx,
            session_id: None,
            last_shown: RecordingState::default(),
            transcriptions: JoinSet::new(),
        }
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Charting Recorder starting");
        println!("Type `start` to begin recording, `quit` to exit.");

        loop {
            tokio::select! {
                Some(state) = self.state_rx.recv() => {
                    for line in render(&self.last_shown, &state) {
                        println!("{line}");
                    }
                    self.last_shown = state;
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Command channel closed, shutting down");
                        break;
                    };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
            }
        }

        self.recorder.dispose();
        self.finish_transcriptions().await;
        let _ = self.shutdown_tx.send(true);
        info!("Charting Recorder shut down successfully");

        Ok(())
    }

    /// Apply one command. Returns false once the app should exit.
    pub(crate) async fn handle_command(&mut self, cmd: AppCommand) -> bool {
        match cmd {
            AppCommand::StartRecording { session_id } => {
                if let Err(e) = self.start_recording(session_id).await {
                    warn!(session_id = %session_id, error = %e, "Recording not started");
                }
            }
            AppCommand::PauseRecording => self.recorder.pause_recording(),
            AppCommand::ResumeRecording => self.recorder.resume_recording(),
            AppCommand::StopRecording => self.recorder.stop_recording(),
            AppCommand::CancelRecording => self.cancel(),
            AppCommand::Status => println!("{}", status_line(&self.recorder.get_state())),
            AppCommand::Save { name } => {
                if let Err(e) = self.save(name.as_deref()).await {
                    error!(error = ?e, "Failed to save recording");
                    println!("Save failed: {}", e);
                }
            }
            AppCommand::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    /// Start a recording session unless an error is still shown.
    #[instrument(skip(self))]
    async fn start_recording(&mut self, session_id: Uuid) -> AppResult<()> {
        if let Some(shown) = self.recorder.get_state().error {
            println!("{shown} Type `cancel` to dismiss.");
            return Ok(());
        }

        self.recorder.start_recording().await?;
        self.session_id = Some(session_id);

        info!(session_id = %session_id, "Recording started");

        Ok(())
    }

    /// Discard the session and replace the recorder, like closing the
    /// recording dialog.
    #[instrument(skip(self))]
    fn cancel(&mut self) {
        self.recorder.cancel_recording();
        self.recorder.dispose();
        self.recorder = new_recorder(&self.capabilities, &self.options, &self.state_tx);

        if let Some(session_id) = self.session_id.take() {
            info!(session_id = %session_id, "Session discarded");
        }
        self.last_shown = RecordingState::default();
        println!("Recording discarded.");
    }

    /// Save the finalized recording and transcribe it in the background.
    #[instrument(skip(self))]
    async fn save(&mut self, name: Option<&str>) -> AppResult<()> {
        let name = file_name(name, SystemTime::now())?;
        let file = self
            .recorder
            .get_audio_file(&name)
            .ok_or_else(|| AppError::NoRecording {
                location: ErrorLocation::from(Location::caller()),
            })?;

        let path = self.output_handler.save(file.clone()).await?;
        println!("Saved {}", path.display());

        // Reap transcriptions that already finished.
        while self.transcriptions.try_join_next().is_some() {}

        let output_handler = Arc::clone(&self.output_handler);
        let session_id = self.session_id;
        self.transcriptions.spawn(async move {
            let Some(result) = output_handler.transcribe(&file).await else {
                return;
            };
            info!(
                session_id = ?session_id,
                duration_ms = ?result.duration_ms,
                text_len = result.transcript.len(),
                "Transcription complete"
            );
            println!("Transcript ({}):\n{}", file.name, result.transcript);
        });

        Ok(())
    }

    /// Wait for background transcriptions so their output is not lost.
    async fn finish_transcriptions(&mut self) {
        if !self.transcriptions.is_empty() {
            info!(
                pending = self.transcriptions.len(),
                "Waiting for transcriptions to finish"
            );
        }

        while let Some(result) = self.transcriptions.join_next().await {
            if let Err(e) = result {
                warn!(error = ?e, "Transcription task failed");
            }
        }
    }
}

fn new_recorder(
    capabilities: &Capabilities,
    options: &RecorderOptions,
    state_tx: &mpsc::UnboundedSender<RecordingState>,
) -> AudioRecorder {
    AudioRecorder::new(
        capabilities.clone(),
        options.clone(),
        Some(Box::new(ChannelObserver(state_tx.clone()))),
    )
}

/// Console lines describing the change from `previous` to `current`.
pub(crate) fn render(previous: &RecordingState, current: &RecordingState) -> Vec<String> {
    let mut lines = Vec::new();
    let elapsed = format_duration(current.duration_seconds);

    if let Some(message) = current.error.as_ref().filter(|_| current.error != previous.error) {
        lines.push(format!("Error: {message}"));
    }

    match (previous.is_recording, current.is_recording) {
        (false, true) => lines.push("Recording... (pause | stop | cancel)".to_string()),
        (true, false) => lines.push(format!("Stopped at {elapsed}, finalizing...")),
        (true, true) if previous.is_paused != current.is_paused => {
            if current.is_paused {
                lines.push(format!("Paused at {elapsed}"));
            } else {
                lines.push("Resumed".to_string());
            }
        }
        (true, true) if previous.duration_seconds != current.duration_seconds => {
            lines.push(format!("REC {elapsed}"));
        }
        _ => {}
    }

    match (&previous.audio_artifact, &current.audio_artifact) {
        (None, Some(artifact)) => lines.push(format!(
            "Recording ready: {elapsed}, {} bytes ({}). Type `save [name]` to keep it.",
            artifact.len(),
            artifact.mime_type()
        )),
        (Some(_), None) if !current.is_recording => lines.push("Recording cleared.".to_string()),
        _ => {}
    }

    lines
}

/// One-line summary for the `status` command.
pub(crate) fn status_line(state: &RecordingState) -> String {
    let elapsed = format_duration(state.duration_seconds);

    let phase = if state.is_paused {
        format!("paused at {elapsed}")
    } else if state.is_recording {
        format!("recording {elapsed}")
    } else if let Some(artifact) = &state.audio_artifact {
        format!("ready, {elapsed}, {} bytes ({})", artifact.len(), artifact.mime_type())
    } else {
        "idle".to_string()
    };

    match &state.error {
        Some(message) => format!("{phase}; error: {message}"),
        None => phase,
    }
}
