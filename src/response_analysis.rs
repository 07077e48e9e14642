// Response classification for idox
// Infers the file extension an artifact is stored under

use crate::models::Headers;
use crate::transport::TransportResponse;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_EXTENSION: &str = "txt";

const EICAR: &str = r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// Content-Type fragments checked in order once the body heuristics fail.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("application/pdf", "pdf"),
    ("application/json", "json"),
];

lazy_static! {
    static ref DISPOSITION_FILENAME: Regex =
        Regex::new(r#"filename="[^"]*\.([A-Za-z0-9]+)""#).unwrap();
}

/// Infer the extension for a response. Never fails; falls back to `txt`.
///
/// Order: HTML markers in the body, XML declaration, the EICAR test string,
/// well-known Content-Types, then a `filename="..."` in Content-Disposition.
pub fn classify(headers: &Headers, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);

    if text.to_ascii_lowercase().contains("<!doctype html") || text.contains("</html>") {
        return "html".to_string();
    }
    if text.starts_with("<?xml") {
        return "xml".to_string();
    }
    if text.contains(EICAR) {
        return "txt".to_string();
    }

    let content_type = headers.get("Content-Type").unwrap_or("");
    if let Some((_, ext)) = CONTENT_TYPES.iter().find(|(ct, _)| content_type.contains(ct)) {
        return ext.to_string();
    }

    headers
        .get("Content-Disposition")
        .and_then(|value| DISPOSITION_FILENAME.captures(value))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub fn classify_response(response: &TransportResponse) -> String {
    classify(&response.headers, &response.body)
}
