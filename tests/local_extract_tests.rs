//! Offline extraction from `.eml` files on disk.

use std::path::{Path, PathBuf};

use mailgrab::extract::Extractor;
use mailgrab::harvest::{self, HarvestRequest};
use mailgrab::mailbox::local::{LocalMailbox, LOCAL_FOLDER};
use mailgrab::parser::filename::ExtensionFilter;
use mailgrab::parser::mime::parse_candidates;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_fixture_candidates() {
    let raw = std::fs::read(fixture("report.eml")).unwrap();
    let candidates = parse_candidates(&raw).unwrap();

    let names: Vec<&str> = candidates.iter().map(|c| c.filename.as_str()).collect();
    assert_eq!(names, vec!["report.pdf", "chart.png"]);
    assert_eq!(candidates[0].content_type, "application/pdf");
    assert_eq!(candidates[0].size(), 659);
    assert_eq!(candidates[1].size(), 768);
    assert!(candidates[0].part_index < candidates[1].part_index);
}

#[test]
fn test_extract_same_file_twice() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("attachments");
    let mut ex = Extractor::new(&out, ExtensionFilter::accept_all()).unwrap();
    let mut mailbox = LocalMailbox::new(vec![fixture("report.eml"), fixture("report.eml")]);

    let summary = harvest::harvest(
        &mut mailbox,
        &mut ex,
        HarvestRequest {
            label: LOCAL_FOLDER,
            query: "ALL",
        },
        &|_, _| {},
        &mut |_, _| {},
    )
    .unwrap();

    assert_eq!(summary.messages_processed, 2);
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.bytes_written, 659 + 768);

    let pdf = std::fs::read(out.join("report.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(out.join("chart.png").exists());
}

#[test]
fn test_missing_file_is_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut ex = Extractor::new(dir.path(), ExtensionFilter::new([".pdf"])).unwrap();
    let mut mailbox = LocalMailbox::new(vec![
        dir.path().join("missing.eml"),
        fixture("report.eml"),
    ]);

    let summary = harvest::harvest(
        &mut mailbox,
        &mut ex,
        HarvestRequest {
            label: LOCAL_FOLDER,
            query: "ALL",
        },
        &|_, _| {},
        &mut |_, _| {},
    )
    .unwrap();

    assert_eq!(summary.messages_failed, 1);
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.filtered, 1);
    assert!(dir.path().join("report.pdf").exists());
    assert!(!dir.path().join("chart.png").exists());
}
