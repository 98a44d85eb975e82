use crate::{AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use uuid::Uuid;

/// Commands sent from the console handler to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new recording session.
    StartRecording {
        /// Unique session ID for this recording.
        session_id: Uuid,
    },
    /// Pause the current session.
    PauseRecording,
    /// Resume a paused session.
    ResumeRecording,
    /// Stop the current session and finalize it.
    StopRecording,
    /// Discard the session and reset the recorder.
    CancelRecording,
    /// Print the current state.
    Status,
    /// Save the finalized recording, then transcribe it.
    Save {
        /// File name; a timestamped default when absent.
        name: Option<String>,
    },
    /// Request application shutdown.
    Shutdown,
}

impl AppCommand {
    /// Parse one console line. Blank lines yield `None`.
    #[track_caller]
    pub fn parse(line: &str) -> AppResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("start", []) => AppCommand::StartRecording {
                session_id: Uuid::new_v4(),
            },
            ("pause", []) => AppCommand::PauseRecording,
            ("resume", []) => AppCommand::ResumeRecording,
            ("stop", []) => AppCommand::StopRecording,
            ("cancel", []) => AppCommand::CancelRecording,
            ("status", []) => AppCommand::Status,
            ("save", []) => AppCommand::Save { name: None },
            ("save", [name]) => AppCommand::Save {
                name: Some(name.to_string()),
            },
            ("quit" | "exit", []) => AppCommand::Shutdown,
            _ => {
                return Err(AppError::InvalidCommand {
                    input: line.trim().to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(Some(command))
    }
}
