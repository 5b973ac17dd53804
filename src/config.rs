use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// Top-level key that holds the page entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKey {
    /// `pages:`, used by the generic extractor.
    Pages,
    /// `workouts:`, used by the workout exporter.
    Workouts,
}

impl ListKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKey::Pages => "pages",
            ListKey::Workouts => "workouts",
        }
    }
}

/// One configured page reference. The page number is 1-based and may be
/// given under either `pageIndex` or `page`. Other keys such as `name` are
/// free-form and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageEntry {
    #[serde(default, rename = "pageIndex")]
    pub page_index: Option<i64>,
    #[serde(default)]
    pub page: Option<i64>,
}

impl PageEntry {
    pub fn numbered(page: i64) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    /// The 1-based page number, preferring `pageIndex` over `page`.
    pub fn page_number(&self) -> Option<i64> {
        self.page_index.or(self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    pages: Option<Vec<PageEntry>>,
    #[serde(default)]
    workouts: Option<Vec<PageEntry>>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default, rename = "appendFirstPage")]
    append_first_page: Option<PathBuf>,
}

/// Configuration normalized from either supported YAML shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub entries: Vec<PageEntry>,
    /// Default input PDF (`file`).
    pub file: Option<PathBuf>,
    /// Default output PDF (`output`).
    pub output: Option<PathBuf>,
    /// Markdown cover, relative to the config file's directory.
    pub append_first_page: Option<PathBuf>,
}

impl Config {
    pub async fn load(path: &Path, key: ListKey) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let config = Self::parse(&content, key).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Loaded {} {} entries from {}",
            config.entries.len(),
            key.as_str(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(content: &str, key: ListKey) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document has no mapping to deserialize.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawConfig = serde_yaml::from_str(content)?;
        let entries = match key {
            ListKey::Pages => raw.pages,
            ListKey::Workouts => raw.workouts,
        };

        Ok(Self {
            entries: entries.unwrap_or_default(),
            file: raw.file,
            output: raw.output,
            append_first_page: raw.append_first_page,
        })
    }

    /// Resolve `appendFirstPage` against the directory holding the config.
    pub fn cover_path(&self, config_path: &Path) -> Option<PathBuf> {
        let cover = self.append_first_page.as_ref()?;
        if cover.as_os_str().is_empty() {
            return None;
        }
        let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(cover))
    }
}
