//! Error types for the extraction pipeline.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, rendering or assembling.
#[derive(Error, Debug)]
pub enum Error {
    /// The YAML configuration file does not exist.
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The YAML configuration file is not a valid mapping.
    #[error("Failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An input PDF or Markdown source does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The cover could not be rendered.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// A PDF could not be parsed or serialized.
    #[error("PDF error in {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// The merged document's page tree could not be found or updated.
    #[error("Malformed PDF page tree: {0}")]
    Structure(#[source] lopdf::Error),

    /// Neither a flag nor the config provided a required path.
    #[error("No {0} path given and none configured")]
    MissingPath(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of an HTML-to-PDF backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer process could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The renderer process exited unsuccessfully.
    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The renderer reported success but left no readable PDF behind.
    #[error("renderer produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    /// The in-process browser failed.
    #[error("browser: {0}")]
    Browser(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
