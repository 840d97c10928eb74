use crate::constants::PARAGRAPH_BREAK;
use quick_xml::escape::resolve_html5_entity;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

const MAX_ENTITY_LENGTH: usize = 32;

// Named references that HTML also accepts without the trailing semicolon.
const LEGACY_ENTITIES: [&str; 106] = [
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren",
    "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34",
    "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr",
    "micro", "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm",
    "oslash", "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy",
    "sup1", "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml",
    "uuml", "yacute", "yen", "yuml",
];
const MAX_LEGACY_ENTITY_LENGTH: usize = 6;

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("Failed to compile style regex")
});

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("Failed to compile script regex")
});

// Gutenberg wraps its header and footer in an element carrying
// id="pg-header" / id="pg-footer"; older files use <div>, newer ones <section>.
static BOILERPLATE_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<section\b[^>]*\bid\s*=\s*["']?pg-(?:header|footer)(?:["'\s][^>]*)?>.*?</section\s*>|<div\b[^>]*\bid\s*=\s*["']?pg-(?:header|footer)(?:["'\s][^>]*)?>.*?</div\s*>"#,
    )
    .expect("Failed to compile boilerplate region regex")
});

static LINE_BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:br|hr)\b[^>]*>").expect("Failed to compile line break regex")
});

static BLOCK_CLOSE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/\s*(?:p|div|blockquote|li|h[1-6])\s*>")
        .expect("Failed to compile block close regex")
});

static PARAGRAPH_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*p\b[^>]*>").expect("Failed to compile paragraph open regex")
});

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Failed to compile newline regex"));

static START_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*\*\s*START OF (?:THE|THIS) PROJECT GUTENBERG.*?\*\*\*")
        .expect("Failed to compile start marker regex")
});

static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*\*\s*END OF (?:THE|THIS) PROJECT GUTENBERG.*?\*\*\*")
        .expect("Failed to compile end marker regex")
});

static ATTRIBUTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^The Project Gutenberg e-?Book of.*$")
        .expect("Failed to compile attribution regex")
});

static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("Failed to compile title regex")
});

static TITLE_ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^The Project Gutenberg e-?Book of\s*")
        .expect("Failed to compile title attribution regex")
});

pub fn extract(raw: &[u8]) -> String {
    extract_str(&String::from_utf8_lossy(raw))
}

pub fn extract_str(input: &str) -> String {
    let text = normalize_line_endings(input);
    let text = strip_noise_regions(&text);
    let text = mark_breaks(&text);
    let text = strip_tags(&text);
    let text = decode_entities(&text);
    let text = normalize_whitespace(&text);
    strip_gutenberg_frame(&text)
}

pub fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn strip_noise_regions(input: &str) -> String {
    let mut text = input.to_string();
    for pattern in [&*STYLE_BLOCK, &*SCRIPT_BLOCK, &*BOILERPLATE_REGION] {
        let replaced = pattern.replace_all(&text, "").into_owned();
        text = replaced;
    }
    text
}

fn mark_breaks(input: &str) -> String {
    let text = LINE_BREAK_TAG.replace_all(input, "\n");
    let text = BLOCK_CLOSE_TAG.replace_all(&text, PARAGRAPH_BREAK);
    PARAGRAPH_OPEN_TAG.replace_all(&text, "").into_owned()
}

/// Unterminated tags swallow the rest of the input; stray `>` is dropped.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Unresolvable references are kept verbatim.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_reference(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(tail: &str) -> Option<(Cow<'static, str>, usize)> {
    decode_terminated(tail).or_else(|| decode_legacy(tail))
}

fn decode_terminated(tail: &str) -> Option<(Cow<'static, str>, usize)> {
    let semicolon = tail
        .bytes()
        .take(MAX_ENTITY_LENGTH)
        .position(|b| b == b';')?;
    let name = &tail[1..semicolon];
    if name.is_empty() {
        return None;
    }

    let decoded = match name.strip_prefix('#') {
        Some(number) => {
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            let ch = char::from_u32(code).filter(|c| *c != '\0')?;
            Cow::Owned(ch.to_string())
        }
        None => Cow::Borrowed(resolve_html5_entity(name)?),
    };
    Some((decoded, semicolon + 1))
}

// Longest legacy name at the start wins, so "&copy2024" is "©2024".
fn decode_legacy(tail: &str) -> Option<(Cow<'static, str>, usize)> {
    let available = tail[1..]
        .bytes()
        .take(MAX_LEGACY_ENTITY_LENGTH)
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    (1..=available).rev().find_map(|len| {
        let name = &tail[1..=len];
        if !LEGACY_ENTITIES.contains(&name) {
            return None;
        }
        resolve_html5_entity(name).map(|decoded| (Cow::Borrowed(decoded), len + 1))
    })
}

pub fn normalize_whitespace(input: &str) -> String {
    let lines: Vec<String> = input.split('\n').map(compact_spaces).collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES
        .replace_all(&joined, PARAGRAPH_BREAK)
        .trim()
        .to_string()
}

fn compact_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_gutenberg_frame(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut body = text;
    if let Some(start) = START_MARKER.find(body) {
        body = &body[start.end()..];
    }
    if let Some(end) = END_MARKER.find(body) {
        body = &body[..end.start()];
    }

    let body = ATTRIBUTION_LINE.replace_all(body, "");
    normalize_whitespace(&body)
}

pub fn inline_text(fragment: &str) -> String {
    let stripped = strip_tags(fragment);
    compact_spaces(&decode_entities(&stripped))
}

pub fn extract_title(input: &str) -> Option<String> {
    let captures = TITLE_TAG.captures(input)?;
    let title = inline_text(captures.get(1)?.as_str());
    let title = TITLE_ATTRIBUTION.replace(&title, "").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}
