//! Locates filter scripts embedded in page source text.
//!
//! Pages carry their transformation code in `<script data-filter>` tags that
//! survive rendering verbatim. For dependency purposes the tags are located
//! in the raw page text, without rendering: what matters is each script's
//! inline code and `src` reference, and both are present in the source
//! exactly as they will be in the rendered document.

use crate::scan::line_of;

/// One `<script data-filter>` tag found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterScript {
    /// 1-based line the opening tag starts on.
    pub line: usize,
    /// The `src` attribute, verbatim, if the script is external.
    pub src: Option<String>,
    /// Inline code between the tags; empty for external scripts.
    pub body: String,
}

/// Finds every filter script in `source`, in document order.
///
/// A script qualifies when it carries a `data-filter` attribute and its
/// `type` attribute, if present, names runnable script content: `module`,
/// `text/javascript`, or `application/typescript`, the latter two with
/// optional `,`-separated parameters. Tags inside HTML comments are
/// skipped.
pub fn find_filter_scripts(source: &str) -> Vec<FilterScript> {
    let bytes = source.as_bytes();
    let mut scripts = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        if bytes[pos..].starts_with(b"<!--") {
            pos = match find_ci(bytes, pos + 4, b"-->") {
                Some(end) => end + 3,
                None => bytes.len(),
            };
            continue;
        }
        if !starts_with_ci(&bytes[pos..], b"<script") {
            pos += 1;
            continue;
        }
        let after_name = pos + "<script".len();
        // `<scripting>` and friends are different tags.
        match bytes.get(after_name) {
            Some(&b) if b.is_ascii_whitespace() || b == b'>' || b == b'/' => {}
            Some(_) => {
                pos += 1;
                continue;
            }
            None => break,
        }

        let line = line_of(bytes, pos);
        let (attrs, body_start, self_closed) = parse_attributes(bytes, after_name);

        let (body, next) = if self_closed {
            (String::new(), body_start)
        } else {
            match find_ci(bytes, body_start, b"</script") {
                Some(close) => (text(bytes, body_start, close), close + "</script".len()),
                None => (text(bytes, body_start, bytes.len()), bytes.len()),
            }
        };
        pos = next;

        if !attrs.iter().any(|(name, _)| name == "data-filter") {
            continue;
        }
        let type_attr = attrs
            .iter()
            .find(|(name, _)| name == "type")
            .and_then(|(_, value)| value.as_deref());
        if !runnable_type(type_attr) {
            continue;
        }

        let src = attrs
            .into_iter()
            .find(|(name, _)| name == "src")
            .and_then(|(_, value)| value);
        scripts.push(FilterScript { line, src, body });
    }

    scripts
}

/// Whether a `type` attribute names content the filter runner executes.
fn runnable_type(type_attr: Option<&str>) -> bool {
    match type_attr {
        None => true,
        Some(t) => {
            let mime = t.split_once(',').map_or(t, |(mime, _params)| mime);
            t == "module" || mime == "text/javascript" || mime == "application/typescript"
        }
    }
}

/// Parses attributes up to the end of the open tag. Returns the attributes
/// (names lowercased), the offset just past `>`, and whether the tag was
/// written self-closing.
fn parse_attributes(
    bytes: &[u8],
    mut pos: usize,
) -> (Vec<(String, Option<String>)>, usize, bool) {
    let mut attrs = Vec::new();
    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => break,
            Some(b'>') => return (attrs, pos + 1, false),
            Some(b'/') if bytes.get(pos + 1) == Some(&b'>') => return (attrs, pos + 2, true),
            Some(_) => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        if pos == name_start {
            // Stray `/` not followed by `>`.
            pos += 1;
            continue;
        }
        let name = text(bytes, name_start, pos).to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attrs.push((name, None));
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos).copied() {
            Some(quote @ (b'"' | b'\'')) => {
                pos += 1;
                let value_start = pos;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                let value = text(bytes, value_start, pos);
                if pos < bytes.len() {
                    pos += 1;
                }
                value
            }
            _ => {
                let value_start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                text(bytes, value_start, pos)
            }
        };
        attrs.push((name, Some(value)));
    }
    (attrs, pos, false)
}

fn text(bytes: &[u8], start: usize, end: usize) -> String {
    std::str::from_utf8(&bytes[start..end])
        .unwrap_or("")
        .to_string()
}

fn starts_with_ci(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len()
        && haystack
            .iter()
            .zip(needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn find_ci(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    (from..haystack.len().saturating_sub(needle.len() - 1))
        .find(|&i| starts_with_ci(&haystack[i..], needle))
}
