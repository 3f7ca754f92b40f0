//! Fallback extraction of task metadata from older markdown descriptions.
//!
//! Recognised forms, first match wins per field:
//! - `**Repository:** <value>`, `**Branch:** <value>`, `**Base branch:** <value>`
//!   (label case-insensitive, colon inside or after the bold markers, value
//!   optionally wrapped in `<` `>`)
//! - `<!-- repo: <value> -->`, `<!-- branch: <value> -->`, `<!-- base: <value> -->`

use std::sync::OnceLock;

use regex::Regex;

use crate::work::TaskMetadata;

struct LegacyPatterns {
    repository: [Regex; 2],
    branch: [Regex; 2],
    base_branch: [Regex; 2],
}

fn label_pattern(label: &str) -> String {
    format!(r"(?im)^\s*\*\*\s*{label}\s*:?\s*\*\*\s*:?\s*<?([^\s<>]+)>?\s*$")
}

fn sentinel_pattern(label: &str) -> String {
    format!(r"(?i)<!--\s*{label}\s*:\s*([^\s]+?)\s*-->")
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|error| unreachable!("legacy metadata pattern is valid: {error}"))
}

fn patterns() -> &'static LegacyPatterns {
    static PATTERNS: OnceLock<LegacyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LegacyPatterns {
        repository: [
            compile(&label_pattern("repository")),
            compile(&sentinel_pattern("repo(?:sitory)?")),
        ],
        branch: [
            compile(&label_pattern("branch")),
            compile(&sentinel_pattern("branch")),
        ],
        base_branch: [
            compile(&label_pattern(r"base\s+branch")),
            compile(&sentinel_pattern(r"base(?:\s*branch)?")),
        ],
    })
}

fn first_capture(candidates: &[Regex], markdown: &str) -> Option<String> {
    candidates.iter().find_map(|pattern| {
        pattern
            .captures(markdown)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_owned())
            .filter(|value| !value.is_empty())
    })
}

pub fn parse_legacy_task_metadata(markdown: &str) -> TaskMetadata {
    let patterns = patterns();
    TaskMetadata {
        repository: first_capture(&patterns.repository, markdown),
        branch: first_capture(&patterns.branch, markdown),
        base_branch: first_capture(&patterns.base_branch, markdown),
        issue_url: None,
    }
}
