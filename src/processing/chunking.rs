//! Token-budget chunking for extracted page text.
//!
//! Splitting is delegated to `semchunk-rs`; this module supplies the token counter and
//! the sliding overlap between adjacent chunks. Token counting prefers `tiktoken-rs`
//! for the configured model and falls back to whitespace counting when the model has no
//! known encoding (common for locally aliased Ollama models).

use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, get_bpe_from_model};

use super::types::ChunkingError;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

pub(crate) const DEFAULT_CHUNK_SIZE: usize = 1000;
pub(crate) const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Resolve the effective chunk size and overlap for a request.
///
/// Explicit overrides win; otherwise the defaults of 1000 tokens per chunk with a
/// 100-token overlap apply. The overlap is always kept strictly below the chunk size.
pub(crate) fn determine_chunk_params(
    size_override: Option<usize>,
    overlap_override: Option<usize>,
) -> (usize, usize) {
    let chunk_size = size_override.unwrap_or(DEFAULT_CHUNK_SIZE).max(1);
    let overlap = overlap_override
        .unwrap_or(DEFAULT_CHUNK_OVERLAP)
        .min(chunk_size.saturating_sub(1));
    (chunk_size, overlap)
}

/// Chunk text into segments bounded by `chunk_size` tokens.
///
/// Each chunk after the first is prefixed with up to `overlap` tokens from the tail of
/// its predecessor so spans around boundaries remain visible to retrieval. Returns an
/// empty vector when the input is all whitespace.
pub(crate) fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    model: &str,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let token_counter = build_token_counter(model);
    Ok(chunk_text_with_counter(
        text,
        chunk_size,
        overlap,
        token_counter,
    ))
}

/// Build a token counter for the configured embedding model.
///
/// Unknown models fall back to the `cl100k_base` encoding, and if even that encoding
/// cannot be loaded the counter degrades to whitespace tokens. The fallback is logged
/// at `warn` level to aid diagnosis while keeping ingestion flowing.
fn build_token_counter(model: &str) -> TokenCounter {
    let encoding = get_bpe_from_model(model).or_else(|model_err| {
        tracing::debug!(
            model,
            error = %model_err,
            "Tokenizer model lookup failed; using cl100k_base"
        );
        cl100k_base()
    });

    match encoding {
        Ok(encoding) => {
            let encoding = Arc::new(encoding);
            Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len())
        }
        Err(error) => {
            tracing::warn!(
                model,
                error = %error,
                "Tokenizer unavailable; falling back to whitespace counter"
            );
            whitespace_token_counter()
        }
    }
}

fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    token_counter: TokenCounter,
) -> Vec<String> {
    let counter_for_chunker = token_counter.clone();
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, overlap, &token_counter)
}

/// Prefix each chunk after the first with a token-limited tail of its predecessor.
fn apply_overlap(chunks: Vec<String>, overlap: usize, token_counter: &TokenCounter) -> Vec<String> {
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;

    for current in chunks {
        let combined = match previous.as_deref() {
            Some(prev) => {
                let tail = overlap_tail(prev, overlap, token_counter);
                if tail.is_empty() {
                    current.clone()
                } else {
                    format!("{tail} {current}")
                }
            }
            None => current.clone(),
        };
        overlapped.push(combined);
        previous = Some(current);
    }

    overlapped
}

/// Longest word-aligned suffix of `text` that stays within `token_limit` tokens.
fn overlap_tail(text: &str, token_limit: usize, token_counter: &TokenCounter) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut start = words.len();

    while start > 0 {
        let candidate = words[start - 1..].join(" ");
        if token_counter.as_ref()(&candidate) > token_limit {
            break;
        }
        start -= 1;
    }

    words[start..].join(" ")
}
