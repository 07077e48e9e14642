use idox::reporting::{export_summary, render_summary};
use idox::stats::StatsRecorder;
use std::fs;

#[test]
fn reporting_export_creates_summary_file() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = StatsRecorder::new();
    recorder.record_code(404);
    recorder.record_code(200);
    recorder.record_code(200);
    recorder.record_error("Timeout");
    let stats = recorder.snapshot();

    let path = export_summary(&stats, dir.path()).expect("summary export should succeed");

    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("idox_summary_"), "unexpected name {}", name);
    assert!(name.ends_with(".json"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total_attempts"], 4);
    assert_eq!(json["seen_codes"]["200"], 2);
    assert_eq!(json["seen_codes"]["404"], 1);
    assert_eq!(json["seen_errors"]["Timeout"], 1);
    assert!(json["generated_at"].is_string());
}

#[test]
fn summary_lists_keys_in_order() {
    let recorder = StatsRecorder::new();
    recorder.record_code(500);
    recorder.record_code(200);
    recorder.record_error("Timeout");
    recorder.record_error("ConnectError");

    let text = render_summary(&recorder.snapshot());

    assert!(text.starts_with("Requests: 4 (2 responses, 2 errors)\n"));
    assert!(text.find("200: 1").unwrap() < text.find("500: 1").unwrap());
    assert!(text.find("ConnectError: 1").unwrap() < text.find("Timeout: 1").unwrap());
}

#[test]
fn summary_of_empty_run() {
    let text = render_summary(&StatsRecorder::new().snapshot());
    assert_eq!(text, "Requests: 0 (0 responses, 0 errors)\nStatus codes:\n  none\nErrors:\n  none\n");
}
