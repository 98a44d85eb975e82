use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where saved recordings go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (None = `recordings/` under the platform data dir).
    #[serde(default)]
    pub directory: Option<PathBuf>,
}
