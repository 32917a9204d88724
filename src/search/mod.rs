//! Full-text search over laid-out blocks or, before layout exists, the AST
//!
//! Matching is case-insensitive substring search over whitespace-normalized
//! text. Scores reward both frequency and an early first match:
//! `occurrences × 10 + max(0, 100 − first_offset)`. Offsets count
//! characters, not bytes.

use serde::{Deserialize, Serialize};

use crate::ast::DocumentAst;
use crate::layout::LayoutBlock;

pub const EXCERPT_RADIUS: usize = 42;
const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    pub node_id: String,
    pub excerpt: String,
    pub score: u64,
    pub page_index: u32,
}

/// Lowercase, collapse whitespace runs to one space, trim
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

/// Character offset of the first case-insensitive occurrence of `needle`
fn find_folded(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window.iter().zip(needle).all(|(a, b)| fold(*a) == fold(*b)))
}

/// Up to `radius` characters either side of the first match of `query` in
/// `content`, with an ellipsis on each truncated end. Falls back to the
/// first `2 × radius` characters when the raw query does not occur.
pub fn build_excerpt(content: &str, query: &str, radius: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let needle: Vec<char> = query.chars().collect();

    let Some(index) = find_folded(&chars, &needle) else {
        return chars.iter().take(radius * 2).collect();
    };

    let start = index.saturating_sub(radius);
    let end = (index + needle.len() + radius).min(chars.len());

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push(ELLIPSIS);
    }
    excerpt.extend(&chars[start..end]);
    if end < chars.len() {
        excerpt.push(ELLIPSIS);
    }
    excerpt
}

struct Match {
    first: usize,
    count: u64,
}

fn match_normalized(content: &str, query: &str) -> Option<Match> {
    let normalized = normalize(content);
    let first_byte = normalized.find(query)?;
    let count = normalized.match_indices(query).count() as u64;
    Some(Match {
        first: normalized[..first_byte].chars().count(),
        count,
    })
}

fn score(found: &Match) -> u64 {
    found.count * 10 + 100u64.saturating_sub(found.first as u64)
}

fn sort_hits(hits: &mut [SearchHit]) {
    // stable: equal scores keep document order
    hits.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Search laid-out blocks; hits carry the block's page index
pub fn search_layout_blocks(blocks: &[LayoutBlock], raw_query: &str) -> Vec<SearchHit> {
    let query = normalize(raw_query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = blocks
        .iter()
        .filter_map(|block| {
            let found = match_normalized(&block.searchable_text, &query)?;
            Some(SearchHit {
                id: format!("hit-{}-{}", block.id, found.first),
                block_id: Some(block.id.clone()),
                node_id: block.node_id.clone(),
                excerpt: build_excerpt(&block.searchable_text, raw_query, EXCERPT_RADIUS),
                score: score(&found),
                page_index: block.page_index,
            })
        })
        .collect();

    sort_hits(&mut hits);
    tracing::debug!(query = %query, hits = hits.len(), "Layout search completed");
    hits
}

/// Search the AST directly; every hit reports page 0
pub fn search_ast(ast: &DocumentAst, raw_query: &str) -> Vec<SearchHit> {
    let query = normalize(raw_query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = ast
        .blocks()
        .filter_map(|node| {
            let content = node.plain_text();
            let found = match_normalized(&content, &query)?;
            Some(SearchHit {
                id: format!("ast-hit-{}-{}", node.id(), found.first),
                block_id: None,
                node_id: node.id().to_string(),
                excerpt: build_excerpt(&content, raw_query, EXCERPT_RADIUS),
                score: score(&found),
                page_index: 0,
            })
        })
        .collect();

    sort_hits(&mut hits);
    hits
}
