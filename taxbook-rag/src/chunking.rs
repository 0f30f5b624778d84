//! Document chunking.
//!
//! - [`RecursiveChunker`]: splits hierarchically by paragraphs, lines,
//!   sentences, words, then characters, with configurable overlap
//! - [`ParentChildSplitter`]: splits documents into parent chunks and each
//!   parent into child chunks, producing a [`Corpus`]
//!
//! All sizes are measured in characters, not bytes. Chunks are exact
//! substrings of their input: separators stay attached to the text that
//! precedes them, so consecutive chunks cover the input without gaps.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::{ChildRecord, Corpus, Document, ParentRecord, keys};

/// Separators tried in order, coarsest first. The empty separator is the
/// hard character cut.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A strategy for splitting a document into smaller documents.
///
/// Each returned chunk inherits the input's metadata plus a
/// [`keys::START_INDEX`] entry holding its character offset.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// An empty document yields exactly one empty chunk.
    fn chunk(&self, document: &Document) -> Vec<Document>;
}

/// A chunk of text with its character offset in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text.
    pub text: String,
    /// Offset of the first character of `text` in the source, in characters.
    pub start_index: usize,
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Text is first cut at the coarsest separator that occurs in it. Pieces are
/// merged greedily into windows of at most `chunk_size` characters; a piece
/// that alone exceeds `chunk_size` is split again with the next separator.
/// Consecutive windows share up to `chunk_overlap` characters of whole pieces.
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(2000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split raw text into chunks.
    pub fn split_text(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return vec![TextChunk { text: String::new(), start_index: 0 }];
        }

        let origin = Span { start: 0, end: 0, char_start: 0, chars: 0 };
        split_spans(text, origin, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .map(|span| TextChunk {
                text: text[span.start..span.end].to_string(),
                start_index: span.char_start,
            })
            .collect()
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Document> {
        self.split_text(&document.content)
            .into_iter()
            .map(|chunk| {
                let mut metadata = document.metadata.clone();
                metadata.insert(keys::START_INDEX.to_string(), chunk.start_index.into());
                Document { content: chunk.text, metadata }
            })
            .collect()
    }
}

/// A byte range into the text being split, with its character offset and length.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    char_start: usize,
    chars: usize,
}

/// Split `text` (located at `origin` in the full input) into spans of at most
/// `chunk_size` characters.
fn split_spans(
    text: &str,
    origin: Span,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<Span> {
    let position = separators.iter().position(|sep| sep.is_empty() || text.contains(sep));
    let (separator, remaining) = match position {
        Some(index) => (separators[index], &separators[index + 1..]),
        None => ("", &[][..]),
    };

    let mut spans = Vec::new();
    let mut pending: Vec<Span> = Vec::new();

    for piece in split_keeping_separator(text, origin, separator) {
        if piece.chars <= chunk_size || separator.is_empty() {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            spans.extend(merge_spans(&pending, chunk_size, chunk_overlap));
            pending.clear();
        }
        let local = &text[piece.start - origin.start..piece.end - origin.start];
        spans.extend(split_spans(local, piece, chunk_size, chunk_overlap, remaining));
    }

    if !pending.is_empty() {
        spans.extend(merge_spans(&pending, chunk_size, chunk_overlap));
    }

    spans
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment. The empty separator splits into single characters.
fn split_keeping_separator(text: &str, origin: Span, separator: &str) -> Vec<Span> {
    let mut result = Vec::new();
    let mut char_start = origin.char_start;

    if separator.is_empty() {
        for (offset, ch) in text.char_indices() {
            let start = origin.start + offset;
            result.push(Span { start, end: start + ch.len_utf8(), char_start, chars: 1 });
            char_start += 1;
        }
        return result;
    }

    let mut start = 0;
    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        let chars = text[start..end].chars().count();
        result.push(Span { start: origin.start + start, end: origin.start + end, char_start, chars });
        char_start += chars;
        start = end;
    }

    if start < text.len() {
        let chars = text[start..].chars().count();
        result.push(Span {
            start: origin.start + start,
            end: origin.start + text.len(),
            char_start,
            chars,
        });
    }

    result
}

/// Merge contiguous pieces into windows of at most `chunk_size` characters,
/// carrying up to `chunk_overlap` characters of trailing pieces into the
/// next window.
fn merge_spans(pieces: &[Span], chunk_size: usize, chunk_overlap: usize) -> Vec<Span> {
    let mut windows = Vec::new();
    let mut current: VecDeque<Span> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        if total + piece.chars > chunk_size && !current.is_empty() {
            windows.push(join(&current, total));
            while total > chunk_overlap || (total + piece.chars > chunk_size && total > 0) {
                let Some(first) = current.pop_front() else { break };
                total -= first.chars;
            }
        }
        current.push_back(*piece);
        total += piece.chars;
    }

    if !current.is_empty() {
        windows.push(join(&current, total));
    }

    windows
}

fn join(pieces: &VecDeque<Span>, chars: usize) -> Span {
    match (pieces.front(), pieces.back()) {
        (Some(first), Some(last)) => {
            Span { start: first.start, end: last.end, char_start: first.char_start, chars }
        }
        _ => Span { start: 0, end: 0, char_start: 0, chars: 0 },
    }
}

/// Splits documents into parent chunks, then each parent into child chunks.
///
/// Parent ids are `parent-{document_index}-{parent_index}` and child ids are
/// `{parent_id}/{child_index}`, so identical input always produces an
/// identical [`Corpus`].
///
/// # Example
///
/// ```rust,ignore
/// use taxbook_rag::ParentChildSplitter;
///
/// let corpus = ParentChildSplitter::new(2000, 200, 400).split(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct ParentChildSplitter {
    parent: RecursiveChunker,
    child: RecursiveChunker,
}

impl ParentChildSplitter {
    /// Create a splitter with the given parent window, parent overlap and child window.
    pub fn new(parent_size: usize, parent_overlap: usize, child_size: usize) -> Self {
        Self {
            parent: RecursiveChunker::new(parent_size, parent_overlap),
            child: RecursiveChunker::new(child_size, 0),
        }
    }

    /// Create a splitter from the chunk sizes in a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.parent_chunk_size, config.parent_chunk_overlap, config.child_chunk_size)
    }

    /// The chunker used for parent windows.
    pub fn parent_chunker(&self) -> &RecursiveChunker {
        &self.parent
    }

    /// Split documents into a [`Corpus`] of parents and children.
    pub fn split(&self, documents: &[Document]) -> Corpus {
        let mut corpus = Corpus::default();

        for (doc_index, document) in documents.iter().enumerate() {
            for (parent_index, parent) in self.parent.chunk(document).into_iter().enumerate() {
                let parent_id = format!("parent-{doc_index}-{parent_index}");

                for (child_index, mut child) in self.child.chunk(&parent).into_iter().enumerate() {
                    child.metadata.insert(keys::PARENT_ID.to_string(), parent_id.clone().into());
                    corpus.children.push(ChildRecord {
                        id: format!("{parent_id}/{child_index}"),
                        parent_id: parent_id.clone(),
                        document: child,
                        embedding: Vec::new(),
                    });
                }

                corpus.parents.push(ParentRecord { parent_id, document: parent });
            }
        }

        corpus
    }
}

/// Split `documents` into parents of at most `parent_size` characters
/// (overlapping by `parent_overlap`) and children of at most `child_size`.
pub fn split(
    documents: &[Document],
    parent_size: usize,
    parent_overlap: usize,
    child_size: usize,
) -> Corpus {
    ParentChildSplitter::new(parent_size, parent_overlap, child_size).split(documents)
}
