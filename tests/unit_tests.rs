/// Unit tests for sequences, injection and response classification
use idox::error::IdoxError;
use idox::injection::{locate, substitute, InjectionSite};
use idox::models::{Body, Headers, Request};
use idox::parsers::split_request;
use idox::response_analysis::classify;
use idox::sequences::{CustomSequence, FileSequence, NumericSequence, Sequence};
use serde_json::json;
use std::io::Write;

fn drain(seq: &mut impl Sequence) -> Vec<String> {
    std::iter::from_fn(|| seq.next_token()).collect()
}

// ============================================
// Sequences
// ============================================

#[test]
fn test_numeric_sequence_yields_range() {
    let mut seq = NumericSequence::new(0, Some(25), 1).unwrap();
    let tokens = drain(&mut seq);
    let expected: Vec<String> = (0..25).map(|n| n.to_string()).collect();
    assert_eq!(tokens, expected);

    // Exhausted sequences stay exhausted
    assert_eq!(seq.next_token(), None);
    assert_eq!(seq.next_token(), None);
}

#[test]
fn test_numeric_sequence_with_step() {
    let mut seq = NumericSequence::new(10, Some(20), 4).unwrap();
    assert_eq!(drain(&mut seq), vec!["10", "14", "18"]);
}

#[test]
fn test_unbounded_sequence_needs_a_limit() {
    let seq = NumericSequence::unbounded(5, 5).unwrap();
    let mut limited = seq.limit(3);
    assert_eq!(drain(&mut limited), vec!["5", "10", "15"]);
    assert_eq!(limited.next_token(), None);
}

#[test]
fn test_file_sequence_reads_lines_in_order() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "alpha\r\nbeta\n\ngamma\n").unwrap();

    let mut seq = FileSequence::open(file.path()).unwrap();
    // Interior empty lines are tokens, the trailing newline is not
    assert_eq!(drain(&mut seq), vec!["alpha", "beta", "", "gamma"]);
    assert_eq!(seq.next_token(), None);
}

#[test]
fn test_file_sequence_without_trailing_newline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "1\n2").unwrap();
    let mut seq = FileSequence::open(file.path()).unwrap();
    assert_eq!(drain(&mut seq), vec!["1", "2"]);
}

#[test]
fn test_file_sequence_keeps_going_past_invalid_utf8() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"1\n\xff\xfe\n3\r\n4\n").unwrap();

    let mut seq = FileSequence::open(file.path()).unwrap();
    assert_eq!(drain(&mut seq), vec!["1", "\u{FFFD}\u{FFFD}", "3", "4"]);
}

#[test]
fn test_missing_sequence_file() {
    let result = FileSequence::open("/definitely/not/here.txt");
    assert!(matches!(result, Err(IdoxError::SequenceFileMissing { .. })));
}

#[test]
fn test_custom_sequence() {
    let values = vec!["T-USER-1A", "T-USER-1B", "T-USER-2A", "T-USER-2B"];
    let mut seq = CustomSequence::new(values.into_iter().map(String::from));
    assert_eq!(drain(&mut seq), vec!["T-USER-1A", "T-USER-1B", "T-USER-2A", "T-USER-2B"]);
    assert_eq!(seq.next_token(), None);
}

// ============================================
// Injection
// ============================================

fn request_with(url: &str, headers: &[(&str, &str)], cookies: &[(&str, &str)], body: Body) -> Request {
    Request {
        url: url.to_string(),
        method: "POST".to_string(),
        body,
        headers: headers.iter().copied().collect(),
        cookies: cookies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

#[test]
fn test_locate_checks_url_first() {
    let request = request_with(
        "example.com/files/{INJECT}",
        &[("X-Id", "{INJECT}")],
        &[],
        Body::from("{INJECT}"),
    );
    assert_eq!(locate(&request, "{INJECT}").unwrap(), InjectionSite::Url);
}

#[test]
fn test_locate_each_site() {
    let headers = request_with("example.com/", &[("X-Id", "{INJECT}")], &[], Body::default());
    assert_eq!(locate(&headers, "{INJECT}").unwrap(), InjectionSite::Headers);

    let cookies = request_with("example.com/", &[], &[("session", "{INJECT}")], Body::default());
    assert_eq!(locate(&cookies, "{INJECT}").unwrap(), InjectionSite::Cookies);

    let body = request_with("example.com/", &[], &[], Body::Json(json!({ "id": "{INJECT}" })));
    assert_eq!(locate(&body, "{INJECT}").unwrap(), InjectionSite::Body);
}

#[test]
fn test_cookie_marker_in_parsed_request_is_found_in_headers() {
    // The Cookie header is part of the header mapping, which is checked first
    let request = split_request("GET / HTTP/1.1\nHost: example.com\nCookie: id={INJECT}\n\n").unwrap();
    assert_eq!(locate(&request, "{INJECT}").unwrap(), InjectionSite::Headers);
}

#[test]
fn test_marker_in_host_header_selects_url() {
    // The URL is built from Host, so it is checked first and the Host header keeps the marker
    let request = split_request("GET /a HTTP/1.1\nHost: {INJECT}.example.com\n\n").unwrap();
    assert_eq!(request.url, "{INJECT}.example.com/a");
    assert_eq!(locate(&request, "{INJECT}").unwrap(), InjectionSite::Url);

    let substituted = substitute(&request, InjectionSite::Url, "{INJECT}", "tenant1");
    assert_eq!(substituted.url, "tenant1.example.com/a");
    assert_eq!(substituted.headers.get("Host"), Some("{INJECT}.example.com"));
}

#[test]
fn test_locate_is_plain_substring_match() {
    let request = request_with("example.com/a.b", &[], &[], Body::default());
    assert!(matches!(
        locate(&request, "a*b"),
        Err(IdoxError::InjectionPointNotFound { .. })
    ));
    assert_eq!(locate(&request, "a.b").unwrap(), InjectionSite::Url);
}

#[test]
fn test_locate_without_marker_fails() {
    let request = request_with("example.com/", &[("A", "b")], &[("c", "d")], Body::from("e"));
    let err = locate(&request, "{INJECT}").unwrap_err();
    assert!(err.to_string().contains("{INJECT}"), "error should name the marker: {}", err);
}

#[test]
fn test_substitute_url_leaves_other_fields_identical() {
    let template = request_with(
        "example.com/files/{INJECT}",
        &[("X-Untouched", "{INJECT}")],
        &[("sid", "{INJECT}")],
        Body::from("body {INJECT}"),
    );
    let request = substitute(&template, InjectionSite::Url, "{INJECT}", "42");

    assert_eq!(request.url, "example.com/files/42");
    assert_eq!(request.headers, template.headers);
    assert_eq!(request.cookies, template.cookies);
    assert_eq!(request.body, template.body);
    assert_eq!(request.method, template.method);
}

#[test]
fn test_substitute_headers_cookies_and_body() {
    let template = request_with(
        "example.com/",
        &[("X-User", "user-{INJECT}")],
        &[("sid", "{INJECT}")],
        Body::Json(json!({ "owner": { "id": "{INJECT}" }, "flag": false })),
    );

    let headers = substitute(&template, InjectionSite::Headers, "{INJECT}", "7");
    assert_eq!(headers.headers.get("x-user"), Some("user-7"));
    assert_eq!(headers.cookies, template.cookies);

    let cookies = substitute(&template, InjectionSite::Cookies, "{INJECT}", "7");
    assert_eq!(cookies.cookies, vec![("sid".to_string(), "7".to_string())]);
    assert_eq!(cookies.headers, template.headers);

    let body = substitute(&template, InjectionSite::Body, "{INJECT}", "7");
    assert_eq!(body.body, Body::Json(json!({ "owner": { "id": "7" }, "flag": false })));
    assert_eq!(body.url, template.url);
}

// ============================================
// Classification
// ============================================

fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs.iter().copied().collect()
}

#[test]
fn test_classify_xml() {
    assert_eq!(classify(&Headers::new(), b"<?xml version=\"1.0\"?><a/>"), "xml");
}

#[test]
fn test_classify_html() {
    assert_eq!(classify(&Headers::new(), b"<body>hi</body></html>"), "html");
    assert_eq!(classify(&Headers::new(), b"<!doctype html><p>"), "html");
}

#[test]
fn test_classify_pdf_from_content_type() {
    let h = headers(&[("Content-Type", "application/pdf")]);
    assert_eq!(classify(&h, b"%PDF-1.7 ..."), "pdf");
}

#[test]
fn test_classify_content_types() {
    assert_eq!(classify(&headers(&[("content-type", "image/png")]), b"\x89PNG"), "png");
    assert_eq!(classify(&headers(&[("Content-Type", "image/jpeg")]), b"\xff\xd8"), "jpeg");
    assert_eq!(
        classify(&headers(&[("Content-Type", "application/json; charset=utf-8")]), b"{}"),
        "json"
    );
}

#[test]
fn test_classify_eicar_is_txt_even_with_content_type() {
    let body = br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";
    let h = headers(&[("Content-Type", "application/pdf")]);
    assert_eq!(classify(&h, body), "txt");
}

#[test]
fn test_classify_content_disposition() {
    let h = headers(&[("Content-Disposition", "attachment; filename=\"invoice-42.zip\"")]);
    assert_eq!(classify(&h, b"PK"), "zip");
}

#[test]
fn test_classify_defaults_to_txt() {
    assert_eq!(classify(&Headers::new(), b"plain"), "txt");
    let h = headers(&[("Content-Disposition", "inline")]);
    assert_eq!(classify(&h, b"plain"), "txt");
}
