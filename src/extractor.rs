use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::assembler::{load_pdf, AssemblyReport, DocumentAssembler};
use crate::config::{Config, ListKey, PageEntry};
use crate::cover::CoverRenderer;
use crate::error::{Error, Result};
use crate::renderer::HtmlToPdf;
use crate::resolve::{resolve_first, Origin, PathSource, Resolved};
use crate::selector::{select_pages, Selection};

/// The two supported configuration shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Reads `pages:` and takes default paths from `file`, `output` and
    /// `appendFirstPage`.
    Generic,
    /// Reads `workouts:`; default paths come only from the command line.
    Workout,
}

impl Profile {
    pub fn list_key(self) -> ListKey {
        match self {
            Profile::Generic => ListKey::Pages,
            Profile::Workout => ListKey::Workouts,
        }
    }

    /// Load the config and resolve every path the run needs.
    ///
    /// The workout profile takes its input only from the command line, so a
    /// missing input is reported ahead of a missing config: the returned job
    /// carries no entries and `Extractor::run` stops on it.
    pub async fn plan(self, args: &PathArgs) -> Result<Job> {
        match self {
            Profile::Generic => {
                let config = Config::load(&args.yaml, self.list_key()).await?;
                let input = required(
                    &[
                        PathSource::Flag(args.input.clone()),
                        PathSource::Config(config.file.clone()),
                    ],
                    "input",
                )
                .await?;
                let output = required(
                    &[
                        PathSource::Flag(args.output.clone()),
                        PathSource::Config(config.output.clone()),
                    ],
                    "output",
                )
                .await?;
                let cover = resolve_first(&[
                    PathSource::Flag(args.markdown.clone()),
                    PathSource::Config(config.cover_path(&args.yaml)),
                    args.discover_markdown(),
                ])
                .await?;

                Ok(Job {
                    input,
                    output,
                    cover,
                    entries: config.entries,
                })
            }
            Profile::Workout => {
                let input = required(&[PathSource::Flag(args.input.clone())], "input").await?;
                let output = required(&[PathSource::Flag(args.output.clone())], "output").await?;
                if !fs::try_exists(&input).await? {
                    return Ok(Job {
                        input,
                        output,
                        cover: None,
                        entries: Vec::new(),
                    });
                }

                let config = Config::load(&args.yaml, self.list_key()).await?;
                let cover = resolve_first(&[
                    PathSource::Flag(args.markdown.clone()),
                    args.discover_markdown(),
                ])
                .await?;

                Ok(Job {
                    input,
                    output,
                    cover,
                    entries: config.entries,
                })
            }
        }
    }
}

async fn required(sources: &[PathSource], what: &'static str) -> Result<PathBuf> {
    resolve_first(sources)
        .await?
        .map(|resolved| resolved.path)
        .ok_or(Error::MissingPath(what))
}

/// Paths as given on the command line.
#[derive(Debug, Clone)]
pub struct PathArgs {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub yaml: PathBuf,
    pub markdown: Option<PathBuf>,
    pub resources_dir: PathBuf,
}

impl PathArgs {
    fn discover_markdown(&self) -> PathSource {
        PathSource::Discover {
            dir: self.resources_dir.clone(),
            extension: "md",
        }
    }
}

/// Everything needed for one extraction.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub cover: Option<Resolved>,
    pub entries: Vec<PageEntry>,
}

impl Job {
    pub fn cover_path(&self) -> Option<&Path> {
        self.cover.as_ref().map(|c| c.path.as_path())
    }

    pub fn cover_discovered(&self) -> bool {
        self.cover
            .as_ref()
            .is_some_and(|c| c.origin == Origin::Discovered)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub output: PathBuf,
    pub selection: Selection,
    pub assembly: AssemblyReport,
}

#[derive(Debug)]
pub enum Outcome {
    /// The input PDF does not exist; nothing was written.
    InputMissing(PathBuf),
    Saved(ExtractReport),
}

pub struct Extractor<R> {
    covers: CoverRenderer<R>,
}

impl<R: HtmlToPdf> Extractor<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            covers: CoverRenderer::new(renderer),
        }
    }

    /// Run a job, stopping early if the input PDF is absent.
    pub async fn run(&self, job: &Job) -> Result<Outcome> {
        if !fs::try_exists(&job.input).await? {
            return Ok(Outcome::InputMissing(job.input.clone()));
        }
        self.extract(job).await.map(Outcome::Saved)
    }

    pub async fn extract(&self, job: &Job) -> Result<ExtractReport> {
        info!("Extracting pages from {}", job.input.display().to_string().green());

        let selection = select_pages(&job.entries);
        if selection.duplicates > 0 || selection.unnumbered > 0 {
            warn!(
                "Ignored {} duplicate and {} unnumbered page entries",
                selection.duplicates, selection.unnumbered
            );
        }

        let source = load_pdf(&job.input).await?;

        let cover = match job.cover_path() {
            Some(markdown) => {
                let bytes = self.covers.render(markdown).await?;
                let document =
                    lopdf::Document::load_mem(&bytes).map_err(|source| Error::Pdf {
                        path: markdown.to_path_buf(),
                        source,
                    })?;
                Some(document)
            }
            None => None,
        };

        let mut assembled = DocumentAssembler::new(&source)
            .with_cover(cover.as_ref())
            .assemble(&selection)?;
        assembled.save(&job.output).await?;

        Ok(ExtractReport {
            output: job.output.clone(),
            selection,
            assembly: assembled.report,
        })
    }
}
