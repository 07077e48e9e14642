pub mod request;
pub mod response;

pub use request::split_request;
pub use response::split_response;

use crate::models::Headers;

/// Normalize line endings and split a raw HTTP message on its first blank
/// line. Without a blank line the whole text (minus trailing newlines) is the
/// head and the body is empty.
pub(crate) fn split_head_and_body(raw: &str) -> (String, String) {
    let normalized = raw.replace("\r\n", "\n");
    match normalized.split_once("\n\n") {
        Some((head, body)) => (head.to_string(), body.to_string()),
        None => (normalized.trim_end_matches('\n').to_string(), String::new()),
    }
}

/// Parse `Name: Value` lines. Returns the first offending line on failure.
pub(crate) fn parse_header_lines<'a, I>(lines: I) -> Result<Headers, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = line.split_once(": ").ok_or_else(|| line.to_string())?;
        headers.insert(name, value);
    }
    Ok(headers)
}
