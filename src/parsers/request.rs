// Raw HTTP request splitter for idox
// Turns a request captured from a proxy (Burp, Caido, ...) into a Request template

use super::{parse_header_lines, split_head_and_body};
use crate::error::{IdoxError, RequestParseError};
use crate::models::{Body, Headers, Request};

/// Split a raw HTTP request into its method, URL, headers, cookies and body.
///
/// The URL is `Host` + request-line URI with no scheme; the scheme is added
/// at dispatch time. A POST whose `Content-Type` mentions `json` gets a
/// parsed JSON body. Every failure surfaces as `IdoxError::MalformedRequest`
/// carrying the underlying cause.
pub fn split_request(raw: &str) -> Result<Request, IdoxError> {
    parse_request(raw).map_err(IdoxError::MalformedRequest)
}

fn parse_request(raw: &str) -> Result<Request, RequestParseError> {
    let (head, body) = split_head_and_body(raw);
    let mut lines = head.split('\n');

    let request_line = lines.next().filter(|l| !l.is_empty()).ok_or(RequestParseError::Empty)?;
    let parts: Vec<&str> = request_line.split(' ').collect();
    let (method, uri) = match parts.as_slice() {
        [method, uri, _version] => (method.to_ascii_uppercase(), *uri),
        _ => {
            return Err(RequestParseError::RequestLine {
                line: request_line.to_string(),
            })
        }
    };

    let headers = parse_header_lines(lines).map_err(|line| RequestParseError::HeaderLine { line })?;
    let cookies = parse_cookies(&headers);

    let is_json = headers
        .get("Content-Type")
        .map_or(false, |ct| ct.contains("json"));
    let body = if method == "POST" && is_json {
        Body::Json(serde_json::from_str(&body)?)
    } else {
        Body::Text(body)
    };

    let host = headers.get("Host").ok_or(RequestParseError::MissingHost)?;
    let url = format!("{}{}", host, uri);

    Ok(Request {
        url,
        method,
        body,
        headers,
        cookies,
    })
}

/// Split the `Cookie` header into ordered pairs; segments without `=` are skipped.
fn parse_cookies(headers: &Headers) -> Vec<(String, String)> {
    let raw = headers.get("Cookie").unwrap_or("");
    raw.split(';')
        .filter_map(|segment| segment.split_once('='))
        .map(|(name, value)| (name.trim_start().to_string(), value.to_string()))
        .collect()
}
