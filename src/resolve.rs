//! Ordered path resolution: explicit flag, then config key, then discovery.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Result;

/// Where a resolved path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Flag,
    Config,
    Discovered,
}

/// One step of a resolution cascade.
#[derive(Debug, Clone)]
pub enum PathSource {
    /// A command-line value. Empty strings count as unset.
    Flag(Option<PathBuf>),
    /// A value read from the YAML config.
    Config(Option<PathBuf>),
    /// The first file in `dir` with the given extension, by name.
    Discover { dir: PathBuf, extension: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub origin: Origin,
}

fn non_empty(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .cloned()
}

impl PathSource {
    pub async fn resolve(&self) -> Result<Option<Resolved>> {
        let resolved = match self {
            PathSource::Flag(path) => non_empty(path).map(|path| Resolved {
                path,
                origin: Origin::Flag,
            }),
            PathSource::Config(path) => non_empty(path).map(|path| Resolved {
                path,
                origin: Origin::Config,
            }),
            PathSource::Discover { dir, extension } => discover(dir, extension)
                .await?
                .map(|path| Resolved {
                    path,
                    origin: Origin::Discovered,
                }),
        };
        Ok(resolved)
    }
}

/// Apply sources in priority order and return the first that yields a path.
pub async fn resolve_first(sources: &[PathSource]) -> Result<Option<Resolved>> {
    for source in sources {
        if let Some(resolved) = source.resolve().await? {
            debug!("Resolved {} from {:?}", resolved.path.display(), resolved.origin);
            return Ok(Some(resolved));
        }
    }
    Ok(None)
}

/// First file in `dir` whose extension matches, sorted by file name.
/// A missing directory yields nothing.
pub async fn discover(dir: &Path, extension: &str) -> Result<Option<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension)
            && entry.file_type().await?.is_file()
        {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates.into_iter().next())
}
