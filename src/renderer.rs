use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::RenderError;

/// Turns an HTML file on disk into a PDF file on disk.
///
/// Implementations must leave a complete PDF at `pdf_path` when they
/// return `Ok`. The caller owns both paths and removes them afterwards.
#[allow(async_fn_in_trait)]
pub trait HtmlToPdf {
    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError>;
}

/// Runs an external program as `<program> [args...] <html> <pdf>`.
///
/// The default invocation is `node puppeteer_render.js`. Any exit status
/// other than zero is a failure; the call blocks until the process exits.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn node(script: impl Into<String>) -> Self {
        Self::new("node").arg(script)
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::node("puppeteer_render.js")
    }
}

impl HtmlToPdf for CommandRenderer {
    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
        debug!(
            "Running {} {:?} {} {}",
            self.program,
            self.args,
            html_path.display(),
            pdf_path.display()
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(html_path)
            .arg(pdf_path)
            .status()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub scale: f64,
    pub paper_width: f64,
    pub paper_height: f64,
    pub print_background: bool,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for PdfOptions {
    // A4 in inches, which is what the print endpoint expects.
    fn default() -> Self {
        Self {
            scale: 1.0,
            paper_width: 8.27,
            paper_height: 11.69,
            print_background: true,
            margin_top: 0.4,
            margin_right: 0.4,
            margin_bottom: 0.4,
            margin_left: 0.4,
        }
    }
}

/// Prints HTML through a headless Chromium driven over the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    pdf_options: PdfOptions,
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    async fn print(&self, browser: &Browser, html: &str) -> Result<Vec<u8>, RenderError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to create new page: {}", e)))?;

        page.set_content(html)
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to set page content: {}", e)))?;

        let params = PrintToPdfParams {
            scale: Some(self.pdf_options.scale),
            paper_width: Some(self.pdf_options.paper_width),
            paper_height: Some(self.pdf_options.paper_height),
            print_background: Some(self.pdf_options.print_background),
            margin_top: Some(self.pdf_options.margin_top),
            margin_right: Some(self.pdf_options.margin_right),
            margin_bottom: Some(self.pdf_options.margin_bottom),
            margin_left: Some(self.pdf_options.margin_left),
            ..Default::default()
        };

        page.pdf(params)
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to generate PDF: {}", e)))
    }
}

impl HtmlToPdf for ChromiumRenderer {
    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
        let html = fs::read_to_string(html_path).await?;

        let mut builder = BrowserConfig::builder().no_sandbox();
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| RenderError::Browser(format!("Failed to create browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        let result = self.print(&browser, &html).await;

        browser.close().await.ok();
        handle.abort();

        let pdf_data = result?;
        fs::write(pdf_path, pdf_data).await?;
        Ok(())
    }
}

/// Backend chosen at runtime.
#[derive(Debug, Clone)]
pub enum Renderer {
    Command(CommandRenderer),
    Chromium(ChromiumRenderer),
}

impl HtmlToPdf for Renderer {
    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
        match self {
            Renderer::Command(r) => r.render(html_path, pdf_path).await,
            Renderer::Chromium(r) => r.render(html_path, pdf_path).await,
        }
    }
}
