use crate::constants::UNTITLED;
use crate::extract;
use crate::paginate::{Geometry, paginate};
use crate::segment;
use rayon::prelude::*;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub text: String,
    pub start_page: usize,
}

impl Chapter {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            start_page: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Document {
    pub fn parse(raw: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(raw);
        let title = extract::extract_title(&raw).unwrap_or_else(|| UNTITLED.to_string());
        let chapters = segment::chapters(&raw, &title);
        Self { title, chapters }
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub pages: Vec<String>,
    geometry: Geometry,
}

impl Book {
    pub fn from_html(raw: &[u8], geometry: Geometry) -> Self {
        Self::from_document(Document::parse(raw), geometry)
    }

    pub fn from_document(document: Document, geometry: Geometry) -> Self {
        let (pages, chapters) = build_pages(document.chapters, geometry);
        info!(
            "Laid out \"{}\": {} chapters, {} pages at {}x{}",
            document.title,
            chapters.len(),
            pages.len(),
            geometry.line_width,
            geometry.lines_per_page
        );
        Self {
            title: document.title,
            chapters,
            pages,
            geometry,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    pub fn chapter_at(&self, page: usize) -> Option<usize> {
        let after = self.chapters.partition_point(|c| c.start_page <= page);
        after.checked_sub(1)
    }

    pub fn clamp_page(&self, page: usize) -> usize {
        page.min(self.pages.len().saturating_sub(1))
    }

    pub fn relayout(&mut self, geometry: Geometry, current_page: usize) -> usize {
        if geometry == self.geometry {
            return self.clamp_page(current_page);
        }

        let old_total = self.pages.len();
        let (pages, chapters) = build_pages(std::mem::take(&mut self.chapters), geometry);
        self.pages = pages;
        self.chapters = chapters;
        self.geometry = geometry;

        let new_page = remap_page(current_page, old_total, self.pages.len());
        debug!(
            "Relayout to {}x{}: page {}/{} -> {}/{}",
            geometry.line_width,
            geometry.lines_per_page,
            current_page,
            old_total,
            new_page,
            self.pages.len()
        );
        new_page
    }
}

pub fn build_pages(chapters: Vec<Chapter>, geometry: Geometry) -> (Vec<String>, Vec<Chapter>) {
    let per_chapter: Vec<Vec<String>> = chapters
        .par_iter()
        .map(|chapter| paginate(&chapter.title, &chapter.text, geometry))
        .collect();

    let mut pages = Vec::with_capacity(per_chapter.iter().map(Vec::len).sum());
    let mut chapters = chapters;
    for (chapter, chapter_pages) in chapters.iter_mut().zip(per_chapter) {
        chapter.start_page = pages.len();
        pages.extend(chapter_pages);
    }
    (pages, chapters)
}

/// `floor(old_page * new_total / old_total)`, clamped to the last page.
pub fn remap_page(old_page: usize, old_total: usize, new_total: usize) -> usize {
    if old_total == 0 || new_total == 0 {
        return 0;
    }
    let scaled = old_page as u128 * new_total as u128 / old_total as u128;
    usize::try_from(scaled)
        .unwrap_or(usize::MAX)
        .min(new_total - 1)
}
