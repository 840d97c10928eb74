use crate::book::Chapter;
use crate::extract::{self, inline_text};
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-3]\b[^>]*>(.*?)</h[1-3]\s*>").expect("Failed to compile heading regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub title: String,
    pub raw: &'a str,
}

pub fn segment(raw: &str) -> Vec<Segment<'_>> {
    let headings: Vec<(usize, usize, &str)> = HEADING
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some((whole.start(), whole.end(), inner.as_str()))
        })
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(i, &(_, end, inner))| {
            let next = headings.get(i + 1).map_or(raw.len(), |h| h.0);
            Segment {
                title: inline_text(inner),
                raw: &raw[end..next],
            }
        })
        .collect()
}

/// Fewer than two non-empty chapters fall back to one chapter for the whole document.
pub fn chapters(raw: &str, document_title: &str) -> Vec<Chapter> {
    let cleaned = extract::strip_noise_regions(raw);
    let segments = segment(&cleaned);

    let chapters: Vec<Chapter> = segments
        .par_iter()
        .map(|segment| Chapter::new(&segment.title, extract::extract_str(segment.raw)))
        .filter(|chapter| !chapter.text.is_empty())
        .collect();

    if chapters.len() <= 1 {
        debug!(
            "Found {} headings, {} usable; using the whole document as one chapter",
            segments.len(),
            chapters.len()
        );
        return vec![Chapter::new(document_title, extract::extract_str(raw))];
    }

    debug!("Segmented document into {} chapters", chapters.len());
    chapters
}
