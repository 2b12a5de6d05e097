//! Footage digest handed to the planning prompt.

use std::collections::{BTreeMap, HashSet};

use reel_models::SegmentHit;

use crate::error::PipelineResult;
use crate::index::ForensicsIndex;

const MAX_KEYWORDS: usize = 8;
const MAX_LINES_PER_FILE: usize = 5;

const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "also", "because", "been", "before", "being", "could", "does",
    "doing", "down", "each", "even", "every", "from", "have", "having", "here", "into", "just",
    "like", "made", "make", "many", "more", "most", "much", "must", "never", "only", "other",
    "over", "really", "same", "should", "since", "some", "such", "than", "that", "their", "them",
    "then", "there", "these", "they", "thing", "things", "this", "those", "through", "very",
    "want", "were", "what", "when", "where", "which", "while", "will", "with", "would", "your",
    "yours",
];

/// Distinct search keywords from a script, in order of first appearance.
pub fn extract_keywords(script: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    script
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_KEYWORDS)
        .collect()
}

/// Matching footage grouped by file, plus the whole library listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootageInsights {
    /// File name to `[start-end] description` lines
    pub matches: BTreeMap<String, Vec<String>>,
    /// Every file name in the library
    pub library: Vec<String>,
}

impl FootageInsights {
    pub fn from_hits(hits: &[SegmentHit], library: Vec<String>) -> Self {
        let mut matches: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen = HashSet::new();
        for hit in hits {
            if !seen.insert(hit.segment.id) {
                continue;
            }
            let lines = matches.entry(hit.origin_filename.clone()).or_default();
            if lines.len() < MAX_LINES_PER_FILE {
                lines.push(format!(
                    "[{:.1}-{:.1}s] {}",
                    hit.segment.start_time, hit.segment.end_time, hit.segment.description
                ));
            }
        }
        Self { matches, library }
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Text block embedded in the planning prompt.
    pub fn to_digest(&self) -> String {
        if self.has_matches() {
            let mut out = String::from("Matching footage:\n");
            for (file, lines) in &self.matches {
                out.push_str(&format!("- {}\n", file));
                for line in lines {
                    out.push_str(&format!("    {}\n", line));
                }
            }
            out
        } else if !self.library.is_empty() {
            format!(
                "No footage matched the script. Available files: {}",
                self.library.join(", ")
            )
        } else {
            "The footage library is empty. Use null for every suggestedFootageRef.".to_string()
        }
    }
}

impl ForensicsIndex {
    /// Search the index for each script keyword and collect the results.
    pub async fn insights_for_script(&self, script: &str) -> PipelineResult<FootageInsights> {
        let mut hits = Vec::new();
        for keyword in extract_keywords(script) {
            hits.extend(self.search(&keyword).await?);
        }
        let mut library: Vec<String> = self
            .list_assets()
            .await?
            .into_iter()
            .map(|a| a.origin_filename)
            .collect();
        library.sort();
        library.dedup();
        Ok(FootageInsights::from_hits(&hits, library))
    }
}
