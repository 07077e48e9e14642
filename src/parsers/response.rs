// Raw HTTP response splitter for idox
// Used to classify responses captured outside a run

use super::{parse_header_lines, split_head_and_body};
use crate::error::{IdoxError, ResponseParseError};
use crate::models::Response;
use crate::transport::TransportResponse;

/// Split a raw HTTP response into protocol, status, headers and body.
pub fn split_response(raw: &str) -> Result<Response, IdoxError> {
    parse_response(raw).map_err(IdoxError::MalformedResponse)
}

fn parse_response(raw: &str) -> Result<Response, ResponseParseError> {
    let (head, body) = split_head_and_body(raw);
    let mut lines = head.split('\n');

    let status_line = lines.next().filter(|l| !l.is_empty()).ok_or(ResponseParseError::Empty)?;
    let mut parts = status_line.splitn(3, ' ');
    let (proto, code) = match (parts.next(), parts.next()) {
        (Some(proto), Some(code)) if !proto.is_empty() => (proto, code),
        _ => {
            return Err(ResponseParseError::StatusLine {
                line: status_line.to_string(),
            })
        }
    };
    let status_code = code.parse::<u16>().map_err(|_| ResponseParseError::StatusCode {
        code: code.to_string(),
    })?;
    let status_text = parts.next().unwrap_or("").to_string();

    let headers = parse_header_lines(lines).map_err(|line| ResponseParseError::HeaderLine { line })?;

    Ok(Response {
        proto: proto.to_string(),
        status_code,
        status_text,
        headers,
        body,
    })
}

impl From<Response> for TransportResponse {
    fn from(response: Response) -> Self {
        TransportResponse {
            status: response.status_code,
            headers: response.headers,
            body: response.body.into_bytes(),
        }
    }
}
