use crate::codec::WAV_MIME_TYPE;

use std::{
    collections::HashMap,
    fmt,
    fs,
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, error, instrument};
use uuid::Uuid;

/// An encoded audio blob and its MIME type.
///
/// Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl AudioArtifact {
    /// Wraps `bytes` encoded as `mime_type`.
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Encoded payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type the payload is encoded as.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the payload is the recorder's WAV output rather than a
    /// fallback blob.
    pub fn is_wav(&self) -> bool {
        self.mime_type == WAV_MIME_TYPE
    }
}

impl fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A finalized recording ready to hand to a transcription collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAudioArtifact {
    /// File name, e.g. `recording_1700000000000.wav`.
    pub name: String,
    /// Always [`WAV_MIME_TYPE`].
    pub mime_type: String,
    /// The artifact payload.
    pub bytes: Arc<[u8]>,
}

impl NamedAudioArtifact {
    pub(crate) fn from_artifact(name: &str, artifact: &AudioArtifact) -> Self {
        Self {
            name: name.to_string(),
            mime_type: WAV_MIME_TYPE.to_string(),
            bytes: Arc::clone(&artifact.bytes),
        }
    }

    /// Writes the payload to `dir/name` atomically (temp file, then
    /// rename) and returns the final path.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    #[instrument(skip(self), fields(name = %self.name, bytes = self.bytes.len()))]
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<std::path::PathBuf> {
        fs::create_dir_all(dir)?;

        let path = dir.join(&self.name);
        let temp_path = dir.join(format!(".{}.tmp", self.name));

        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(&self.bytes)?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        debug!(path = ?path, "Audio file written");

        Ok(path)
    }
}

/// Revocable local reference to an artifact, e.g. for playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    /// Handle URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and revokes [`PreviewHandle`]s.
pub trait PreviewStore: Send + Sync {
    /// Registers `artifact` and returns a fresh handle for it.
    fn create(&self, artifact: &AudioArtifact) -> PreviewHandle;

    /// Releases `handle`. Revoking an unknown handle does nothing.
    fn revoke(&self, handle: &PreviewHandle);

    /// Looks up the artifact behind a live handle.
    fn resolve(&self, handle: &PreviewHandle) -> Option<AudioArtifact>;

    /// Number of handles not yet revoked.
    fn live_handles(&self) -> usize;
}

/// In-process `blob:` URL registry.
#[derive(Debug, Default)]
pub struct ObjectUrlStore {
    entries: Mutex<HashMap<PreviewHandle, AudioArtifact>>,
}

impl ObjectUrlStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PreviewHandle, AudioArtifact>> {
        self.entries.lock().unwrap_or_else(|e| {
            error!("Preview store lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

impl PreviewStore for ObjectUrlStore {
    fn create(&self, artifact: &AudioArtifact) -> PreviewHandle {
        let handle = PreviewHandle(format!("blob:charting-recorder/{}", Uuid::new_v4()));
        self.lock().insert(handle.clone(), artifact.clone());
        debug!(handle = %handle, bytes = artifact.len(), "Preview handle created");
        handle
    }

    fn revoke(&self, handle: &PreviewHandle) {
        if self.lock().remove(handle).is_some() {
            debug!(handle = %handle, "Preview handle revoked");
        }
    }

    fn resolve(&self, handle: &PreviewHandle) -> Option<AudioArtifact> {
        self.lock().get(handle).cloned()
    }

    fn live_handles(&self) -> usize {
        self.lock().len()
    }
}
