//! Line-addressable chunking for embedding
//!
//! Files at or under the whole-file threshold become a single chunk. Larger
//! files are cut into partial chunks by accumulating whole lines until the
//! next line would push the total past the budget. Lines are never split, so
//! an oversized line always gets a chunk of its own.

use crate::config::ChunkConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default chunk budget, in characters
pub const MAX_CHUNK_SIZE: usize = 4000;
/// Default whole-file threshold, in characters
pub const WHOLE_FILE_THRESHOLD: usize = 4000;

/// How a chunk relates to its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    WholeFile,
    Partial,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WholeFile => "whole_file",
            Self::Partial => "partial",
        }
    }
}

/// Contiguous, 1-based line range of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `(line_number, line_text)` pairs, contiguous and ascending
    pub content: Vec<(usize, String)>,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    /// Basename, suffixed with the start line for partial chunks
    pub name: String,
}

impl Chunk {
    fn new(file: &str, lines: Vec<(usize, String)>, chunk_type: ChunkType) -> Option<Self> {
        let start_line = lines.first()?.0;
        let end_line = lines.last()?.0;
        let base = basename(file);
        let name = match chunk_type {
            ChunkType::WholeFile => base.to_string(),
            ChunkType::Partial => format!("{}_{}", base, start_line),
        };
        Some(Self {
            content: lines,
            file: file.to_string(),
            start_line,
            end_line,
            chunk_type,
            name,
        })
    }

    /// Line texts joined with newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|(_, line)| line.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Characters in the chunk, newlines excluded
    pub fn char_count(&self) -> usize {
        self.content.iter().map(|(_, line)| line.chars().count()).sum()
    }
}

/// Chunker with fixed sizing
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chunk_size: usize,
    whole_file_threshold: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE, WHOLE_FILE_THRESHOLD)
    }
}

impl Chunker {
    pub fn new(max_chunk_size: usize, whole_file_threshold: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            whole_file_threshold,
        }
    }

    pub fn from_config(config: &ChunkConfig) -> Self {
        Self::new(config.max_chunk_size, config.whole_file_threshold)
    }

    /// Chunk one file
    pub fn chunk(&self, path: &str, content: &str) -> Vec<Chunk> {
        chunk_file(path, content, self.max_chunk_size, self.whole_file_threshold)
    }

    /// Chunk every file of a walk, in path order
    pub fn chunk_all(&self, files: &BTreeMap<String, String>) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = files
            .iter()
            .flat_map(|(path, content)| self.chunk(path, content))
            .collect();
        tracing::debug!("Chunked {} files into {} chunks", files.len(), chunks.len());
        chunks
    }
}

/// Split a file into chunks; empty files yield none
pub fn chunk_file(
    path: &str,
    content: &str,
    max_chunk_size: usize,
    whole_file_threshold: usize,
) -> Vec<Chunk> {
    let lines = split_lines(content);
    if lines.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = lines.iter().map(|line| line.chars().count()).sum();
    let numbered = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.to_string()));

    if total_chars <= whole_file_threshold {
        return Chunk::new(path, numbered.collect(), ChunkType::WholeFile)
            .into_iter()
            .collect();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<(usize, String)> = Vec::new();
    let mut current_size = 0;

    for (number, line) in numbered {
        let len = line.chars().count();
        if current_size + len > max_chunk_size && !current.is_empty() {
            chunks.extend(Chunk::new(path, std::mem::take(&mut current), ChunkType::Partial));
            current_size = 0;
        }
        current.push((number, line));
        current_size += len;
    }
    chunks.extend(Chunk::new(path, current, ChunkType::Partial));

    chunks
}

/// Split on `\n`, dropping a `\r` before it; a single trailing newline does
/// not start another line
fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
