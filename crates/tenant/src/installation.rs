use std::path::PathBuf;

/// Marker written when tenancy has been set up for an application
pub const MARKER_FILE: &str = "tenancy.json";

/// Installation state of the application rooted at `base_path`
#[derive(Debug, Clone)]
pub struct Installation {
    base_path: PathBuf,
}

impl Installation {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn marker_path(&self) -> PathBuf {
        self.base_path.join(MARKER_FILE)
    }

    /// Whether the marker exists. Only presence counts; the contents are
    /// never read and an unreadable root reads as "not installed".
    pub fn installed(&self) -> bool {
        self.marker_path().exists()
    }
}
