//! Error taxonomy shared by the resolver, binder and mode controller.

/// Every failure the shading core can report.
///
/// Nothing in this crate panics on a bad request; callers receive one of
/// these and decide whether to log, retry or stay inert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShadingError {
    /// The terrain scene has not finished loading yet. Retry after the load
    /// completes.
    NotLoaded,
    /// No node in the loaded scene matches the configured selector. Fatal:
    /// there is nothing to shade.
    MeshNotFound { selector: String },
    /// A pattern index outside `1..=6` was requested. The prior selection is
    /// kept.
    InvalidSelection { value: u8 },
    /// The scene asset could not be fetched or decoded.
    LoadFailed { path: String, cause: String },
}

impl std::fmt::Display for ShadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShadingError::NotLoaded => write!(f, "terrain scene is not loaded yet"),
            ShadingError::MeshNotFound { selector } => {
                write!(f, "no mesh matching {selector} in the terrain scene")
            }
            ShadingError::InvalidSelection { value } => {
                write!(f, "pattern index {value} is out of range (expected 1..=6)")
            }
            ShadingError::LoadFailed { path, cause } => {
                write!(f, "failed to load terrain scene '{path}': {cause}")
            }
        }
    }
}

impl std::error::Error for ShadingError {}

impl ShadingError {
    /// `true` for errors that leave the subsystem permanently inert.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShadingError::MeshNotFound { .. } | ShadingError::LoadFailed { .. }
        )
    }
}
