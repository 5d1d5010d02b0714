//! Error types for the recorder boundaries.
//!
//! Detection itself never fails; these cover configuration, frame acquisition
//! and session control.

/// Misconfiguration detected when loading catalogs or starting a session.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("calibration needs exactly 11 anchor points, found {found}")]
    InvalidCalibration { found: usize },
    #[error("glyph catalog is empty")]
    EmptySymbolCatalog,
    #[error("sequence catalog is empty")]
    EmptySequenceCatalog,
    #[error("unknown anchor id '{0}'")]
    UnknownAnchor(char),
    #[error("malformed catalog line {line}: {reason}")]
    MalformedCatalogLine { line: usize, reason: String },
}

/// Failure to obtain a frame from the capture collaborator.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("no frame available")]
    NoFrame,
    #[error("frame source exhausted")]
    Exhausted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

/// Errors returned when controlling an auto-capture session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("auto capture is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
