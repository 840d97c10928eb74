use crate::constants::{
    DEFAULT_LINE_WIDTH, DEFAULT_LINES_PER_PAGE, MAX_FONT_SCALE, MIN_FONT_SCALE, MIN_LINE_WIDTH,
    MIN_LINES_PER_PAGE, PARAGRAPH_BREAK, SCALE_LINES_STEP, SCALE_WIDTH_STEP,
    VIEWPORT_HEIGHT_MARGIN, VIEWPORT_WIDTH_MARGIN,
};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub line_width: usize,
    pub lines_per_page: usize,
}

impl Geometry {
    pub fn new(line_width: usize, lines_per_page: usize) -> Self {
        Self {
            line_width: line_width.max(MIN_LINE_WIDTH),
            lines_per_page: lines_per_page.max(MIN_LINES_PER_PAGE),
        }
    }

    /// A zero dimension means the terminal size is not known yet.
    pub fn from_viewport(width: u16, height: u16, scale: i32) -> Self {
        let scale = clamp_font_scale(scale);
        let base_width = if width > 0 {
            i32::from(width) - VIEWPORT_WIDTH_MARGIN
        } else {
            DEFAULT_LINE_WIDTH as i32
        };
        let base_lines = if height > 0 {
            i32::from(height) - VIEWPORT_HEIGHT_MARGIN
        } else {
            DEFAULT_LINES_PER_PAGE as i32
        };

        let line_width = (base_width - SCALE_WIDTH_STEP * scale).max(MIN_LINE_WIDTH as i32);
        let lines_per_page = (base_lines - SCALE_LINES_STEP * scale).max(MIN_LINES_PER_PAGE as i32);
        Self::new(line_width as usize, lines_per_page as usize)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_WIDTH, DEFAULT_LINES_PER_PAGE)
    }
}

pub fn clamp_font_scale(scale: i32) -> i32 {
    scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE)
}

pub fn paginate(title: &str, body: &str, geometry: Geometry) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }

    let geometry = Geometry::new(geometry.line_width, geometry.lines_per_page);
    let text = format!("{title}{PARAGRAPH_BREAK}{body}");
    let lines = wrap_text(&text, geometry.line_width);

    lines
        .chunks(geometry.lines_per_page)
        .map(|chunk| chunk.join("\n").trim().to_string())
        .collect()
}

pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let paragraphs = text
        .split(PARAGRAPH_BREAK)
        .map(str::trim)
        .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(wrap_paragraph(paragraph, width));
    }
    lines
}

/// A word wider than `width` gets a line of its own instead of being split.
pub fn wrap_paragraph(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;

    for word in paragraph.split_whitespace() {
        let word_width = word.width();
        if line.is_empty() {
            line.push_str(word);
            line_width = word_width;
            continue;
        }
        if line_width + 1 + word_width > width {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_width = word_width;
            continue;
        }
        line.push(' ');
        line.push_str(word);
        line_width += 1 + word_width;
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
