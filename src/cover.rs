use pulldown_cmark::{html, Options, Parser};
use scraper::{Html, Selector};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, RenderError, Result};
use crate::renderer::HtmlToPdf;

const STYLE: &str = r#"
        body { font-family: Helvetica, Arial, sans-serif; margin: 2em; }
        h1, h2, h3, h4 { color: #2a4d7c; }
        table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
        th, td { border: 1px solid #888; padding: 0.5em; text-align: left; }
        th { background: #d5e4f3; }
        code { background: #eee; padding: 2px 4px; border-radius: 4px; }
        pre { background: #f4f4f4; padding: 1em; border-radius: 4px; }
        ul { margin: 1em 0; padding-left: 2em; }
        li { margin: 0.5em 0; }
"#;

/// Convert Markdown to an HTML fragment with tables enabled.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut fragment = String::new();
    html::push_html(&mut fragment, parser);
    fragment
}

/// Text of the first heading in the fragment, if any.
fn document_title(fragment: &str) -> Option<String> {
    let doc = Html::parse_fragment(fragment);
    let selector = Selector::parse("h1, h2, h3").ok()?;
    let title = doc
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!title.is_empty()).then_some(title)
}

/// Wrap an HTML fragment in the fixed cover template.
pub fn html_document(fragment: &str) -> String {
    let title = document_title(fragment).unwrap_or_else(|| "Cover".to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{}</title>
    <style>{}</style>
</head>
<body>
{}</body>
</html>
"#,
        html_escape::encode_text(&title),
        STYLE,
        fragment
    )
}

/// Renders a Markdown file to PDF bytes through an [`HtmlToPdf`] backend.
pub struct CoverRenderer<R> {
    backend: R,
}

impl<R: HtmlToPdf> CoverRenderer<R> {
    pub fn new(backend: R) -> Self {
        Self { backend }
    }

    pub async fn render(&self, markdown_path: &Path) -> Result<Vec<u8>> {
        info!("Rendering cover from {}", markdown_path.display());

        let markdown = match fs::read_to_string(markdown_path).await {
            Ok(markdown) => markdown,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(markdown_path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let document = html_document(&markdown_to_html(&markdown));

        // Both paths are removed when dropped, whichever way we leave.
        let html_path = tempfile::Builder::new()
            .prefix("cover-")
            .suffix(".html")
            .tempfile()?
            .into_temp_path();
        let pdf_path = tempfile::Builder::new()
            .prefix("cover-")
            .suffix(".pdf")
            .tempfile()?
            .into_temp_path();

        fs::write(&html_path, document).await?;

        self.backend.render(&html_path, &pdf_path).await?;

        let bytes = match fs::read(&pdf_path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(RenderError::MissingOutput(pdf_path.to_path_buf()).into()),
        };

        debug!("Cover rendered to {} bytes", bytes.len());
        Ok(bytes)
    }
}
