//! Document sources: where ingestion gets its pages from.
//!
//! [`ManifestSource`] reads a `;`-separated CSV manifest with the columns
//! `link_name;article_name;path` and a header row. Each `path` names a text
//! file already extracted from the published PDF, with pages separated by
//! form feeds (the output format of `pdftotext`). Every page becomes one
//! [`Document`].

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::document::{Document, keys};
use crate::error::{RagError, Result};

/// Page separator in extracted text files.
const PAGE_BREAK: char = '\u{0C}';

/// Yields `(content, metadata)` documents for ingestion.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load every document of the source.
    async fn load(&self) -> Result<Vec<Document>>;
}

/// A fixed, in-memory set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<Document>,
}

impl StaticSource {
    /// Serve `documents` as they are.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn load(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

/// Reads the pages listed in a CSV manifest.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    manifest: PathBuf,
}

impl ManifestSource {
    /// Read from the manifest at `path`. Relative entries resolve against
    /// the manifest's directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { manifest: path.into() }
    }

    fn resolve(&self, entry: &str) -> PathBuf {
        let entry = Path::new(entry);
        if entry.is_absolute() {
            return entry.to_path_buf();
        }
        match self.manifest.parent() {
            Some(dir) => dir.join(entry),
            None => entry.to_path_buf(),
        }
    }
}

/// Split extracted text into pages. A trailing form feed does not start a page.
fn pages(text: &str) -> Vec<&str> {
    let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    text.split(PAGE_BREAK).collect()
}

impl ManifestSource {
    fn read_pages(&self) -> Result<Vec<Document>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_path(&self.manifest)
            .map_err(|e| {
                RagError::Source(format!("cannot open manifest {}: {e}", self.manifest.display()))
            })?;

        let mut documents = Vec::new();
        let mut files = 0;
        for record in reader.records() {
            let record = record.map_err(|e| RagError::Source(format!("malformed manifest: {e}")))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let (Some(link_name), Some(article_name), Some(entry)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                return Err(RagError::Source(format!(
                    "manifest line {line}: expected link_name;article_name;path"
                )));
            };

            let path = self.resolve(entry);
            let text = fs::read_to_string(&path).map_err(|e| {
                RagError::Source(format!("manifest line {line}: cannot read {}: {e}", path.display()))
            })?;

            let before = documents.len();
            for (page, content) in pages(&text).into_iter().enumerate() {
                documents.push(
                    Document::page_of(content, entry, page as u64)
                        .with_metadata(keys::TITLE, link_name)
                        .with_metadata(keys::ARTICLE, article_name),
                );
            }
            debug!(source = entry, pages = documents.len() - before, "loaded source file");
            files += 1;
        }

        info!(manifest = %self.manifest.display(), files, pages = documents.len(), "manifest loaded");
        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for ManifestSource {
    /// Reads the manifest and its files on the blocking thread pool.
    async fn load(&self) -> Result<Vec<Document>> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.read_pages())
            .await
            .map_err(|e| RagError::Source(format!("manifest loading task failed: {e}")))?
    }
}
