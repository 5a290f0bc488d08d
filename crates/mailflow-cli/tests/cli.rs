use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BODY: &str = "Hello,\ndeal name: ABC123\namount: $100,000\nexpiration date: 12/31/2025\n";

/// `mailflow` isolated from the user's config and API key.
fn mailflow(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mailflow").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn write_docx(dir: &Path, name: &str, text: &str) -> PathBuf {
    let xml = format!(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
        text
    );
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, writer.finish().unwrap().into_inner()).unwrap();
    path
}

#[test]
fn test_process_prints_fields_as_json() {
    let dir = TempDir::new().unwrap();
    let email = write(dir.path(), "email.txt", BODY);

    let output = mailflow(dir.path())
        .args(["process", "--email"])
        .arg(&email)
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["fields"]["deal_name"], "ABC123");
    assert_eq!(result["fields"]["amount"], "100,000");
    assert_eq!(result["fields"]["expiration_date"], "12/31/2025");
    assert_eq!(result["is_duplicate"], false);
    assert!(result["classification"].is_null());
    assert!(
        result["classification_error"]
            .as_str()
            .unwrap()
            .contains("OPENAI_API_KEY")
    );
}

#[test]
fn test_process_reads_docx_and_skips_unknown() {
    let dir = TempDir::new().unwrap();
    let email = write(dir.path(), "email.txt", "See attached.");
    let docx = write_docx(dir.path(), "terms.docx", "amount: $500");
    let notes = write(dir.path(), "notes.txt", "deal name: HIDDEN");

    mailflow(dir.path())
        .args(["process", "--format", "text", "--email"])
        .arg(&email)
        .arg(&docx)
        .arg(&notes)
        .assert()
        .success()
        .stdout(predicate::str::contains("500"))
        .stdout(predicate::str::contains("unsupported"))
        .stdout(predicate::str::contains("HIDDEN").not());
}

#[test]
fn test_record_then_detect_duplicate() {
    let dir = TempDir::new().unwrap();
    let email = write(dir.path(), "email.txt", BODY);
    let corpus = dir.path().join("corpus.jsonl");
    std::fs::write(&corpus, "").unwrap();

    mailflow(dir.path())
        .args(["process", "--record", "--email"])
        .arg(&email)
        .arg("--corpus")
        .arg(&corpus)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_duplicate\": false"));

    mailflow(dir.path())
        .args(["process", "--format", "csv", "--email"])
        .arg(&email)
        .arg("--corpus")
        .arg(&corpus)
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicate email detected"));
}

#[test]
fn test_corpus_add_and_list() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus.jsonl");
    let first = write(dir.path(), "first.txt", "Closing notice for ABC123\nsecond line");

    mailflow(dir.path())
        .args(["corpus", "add", "--corpus"])
        .arg(&corpus)
        .arg(&first)
        .assert()
        .success();

    mailflow(dir.path())
        .args(["corpus", "list", "--corpus"])
        .arg(&corpus)
        .assert()
        .success()
        .stdout(predicate::str::contains("1: Closing notice for ABC123"))
        .stdout(predicate::str::contains("second line").not());
}

#[test]
fn test_missing_email_file_fails() {
    let dir = TempDir::new().unwrap();

    mailflow(dir.path())
        .args(["process", "--email", "/nonexistent/email.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read email"));
}

#[test]
fn test_config_init_and_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    mailflow(dir.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();

    mailflow(dir.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    mailflow(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"threshold\": 0.8"));
}

#[test]
fn test_strict_config_fails_without_classifier() {
    let dir = TempDir::new().unwrap();
    let email = write(dir.path(), "email.txt", BODY);
    let config = write(
        dir.path(),
        "config.json",
        r#"{"pipeline": {"fail_on_classification_error": true}}"#,
    );

    mailflow(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["process", "--email"])
        .arg(&email)
        .assert()
        .failure()
        .stderr(predicate::str::contains("classification error"));
}
