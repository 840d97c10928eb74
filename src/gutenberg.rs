use crate::constants::{GUTENBERG_BASE_URL, HTTP_TIMEOUT_SECS, SEARCH_PATH, USER_AGENT};
use crate::error::FetchError;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const READ_LINK_TEXTS: [&str; 3] = ["read now!", "read now", "read online"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookResult {
    pub title: String,
    pub subtitle: String,
    pub extra: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct GutenbergClient {
    http: Client,
}

impl GutenbergClient {
    pub fn new() -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    pub fn search_books(&self, author: &str) -> Result<Vec<BookResult>, FetchError> {
        let url = format!("{GUTENBERG_BASE_URL}{SEARCH_PATH}");
        info!("Searching books for {:?}", author);
        let response = self.http.get(&url).query(&[("query", author)]).send()?;
        let html = check_status(response, &url)?.text()?;
        let books = parse_search_results(&html);
        debug!("Search for {:?} returned {} books", author, books.len());
        Ok(books)
    }

    pub fn download_book(
        &self,
        id_or_url: &str,
        author: &str,
        title: &str,
        dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        let landing_url = normalize_ebook_url(id_or_url);
        let landing = check_status(self.http.get(&landing_url).send()?, &landing_url)?.text()?;

        let read_href = find_read_online_url(&landing)
            .ok_or_else(|| FetchError::ReadLinkNotFound(landing_url.clone()))?;
        let read_url = absolute_url(&read_href);
        debug!("Fetching readable edition {}", read_url);
        let body = check_status(self.http.get(&read_url).send()?, &read_url)?.bytes()?;

        fs::create_dir_all(dir).map_err(FetchError::io("create", dir))?;
        let path = dir.join(build_book_file_name(author, title, &read_href));
        fs::write(&path, &body).map_err(FetchError::io("write", &path))?;
        info!("Downloaded {} bytes to {:?}", body.len(), path);
        Ok(path)
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<reqwest::blocking::Response, FetchError> {
    if response.status() != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

pub fn normalize_ebook_url(id_or_url: &str) -> String {
    let id_or_url = id_or_url.trim();
    if id_or_url.starts_with("http://") || id_or_url.starts_with("https://") {
        return id_or_url.to_string();
    }
    if id_or_url.starts_with("/ebooks/") {
        return format!("{GUTENBERG_BASE_URL}{id_or_url}");
    }
    format!("{GUTENBERG_BASE_URL}/ebooks/{id_or_url}")
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{GUTENBERG_BASE_URL}{href}")
    }
}

pub fn is_readable_html(href: &str) -> bool {
    !href.is_empty()
        && (href.contains("/cache/epub/")
            || href.ends_with(".html")
            || href.ends_with(".html.images"))
}

pub fn sanitize_filename(input: &str) -> String {
    let mapped: String = input
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let mut name = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }
    name.trim_matches('_').to_string()
}

pub fn build_book_file_name(author: &str, title: &str, href: &str) -> String {
    let author = sanitize_filename(author);
    let title = sanitize_filename(title);
    if !author.is_empty() && !title.is_empty() {
        return format!("{author}-{title}.html");
    }
    if !title.is_empty() {
        return format!("{title}.html");
    }
    let from_url = href
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if from_url.is_empty() {
        "book.html".to_string()
    } else {
        from_url.to_string()
    }
}

fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

pub fn parse_search_results(html: &str) -> Vec<BookResult> {
    let dom = parse_html(html);
    let mut books = Vec::new();
    walk(&dom.document, &mut |node: &Handle| {
        if element_name(node) != Some("a") || !has_class(node, "link") {
            return true;
        }
        let Some(href) = attr(node, "href") else {
            return true;
        };
        if !is_ebook_href(&href) {
            return true;
        }

        let title = span_text(node, "title");
        if !title.is_empty() {
            books.push(BookResult {
                title,
                subtitle: span_text(node, "subtitle"),
                extra: span_text(node, "extra"),
                url: absolute_url(&href),
            });
        }
        false
    });
    books
}

// "/ebooks/1342" but not "/ebooks/search/?sort_order=..."
fn is_ebook_href(href: &str) -> bool {
    href.strip_prefix("/ebooks/")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

pub fn find_read_online_url(html: &str) -> Option<String> {
    let dom = parse_html(html);
    let mut found = None;
    walk(&dom.document, &mut |node: &Handle| {
        if found.is_some() {
            return false;
        }
        if element_name(node) != Some("a") {
            return true;
        }
        let href = attr(node, "href").unwrap_or_default();
        let title = attr(node, "title").unwrap_or_default().to_lowercase();
        let text = text_content(node).trim().to_lowercase();

        let labelled = title.contains("read online") || READ_LINK_TEXTS.contains(&text.as_str());
        if labelled && is_readable_html(&href) {
            found = Some(href);
            return false;
        }
        true
    });
    found
}

fn walk(node: &Handle, visit: &mut dyn FnMut(&Handle) -> bool) {
    if !visit(node) {
        return;
    }
    for child in node.children.borrow().iter() {
        walk(child, visit);
    }
}

fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

fn attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class").is_some_and(|value| value.split_whitespace().any(|c| c == class))
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        text.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, text);
    }
}

fn span_text(node: &Handle, class: &str) -> String {
    let mut found = None;
    walk(node, &mut |candidate: &Handle| {
        if found.is_some() {
            return false;
        }
        if element_name(candidate) == Some("span") && has_class(candidate, class) {
            found = Some(text_content(candidate).trim().to_string());
            return false;
        }
        true
    });
    found.unwrap_or_default()
}
