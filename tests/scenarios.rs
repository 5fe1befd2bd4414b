//! End-to-end runs of the `bulk-exif` binary against synthetic images.

#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use bulk_exif::exif::{self, Endian, MetadataBlock, TagValue};
use tempfile::TempDir;

fn bulk_exif(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bulk-exif"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn segment(marker: u8, contents: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, marker];
    seg.extend_from_slice(&((contents.len() + 2) as u16).to_be_bytes());
    seg.extend_from_slice(contents);
    seg
}

/// SOI, optional APP1 EXIF segment, a minimal scan, EOI.
fn jpeg(block: Option<&MetadataBlock>) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
    if let Some(block) = block {
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend(exif::encode(block).unwrap());
        data.extend(segment(0xE1, &app1));
    }
    data.extend(segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]));
    data.extend_from_slice(&[0x12, 0x34, 0x56, 0xFF, 0xD9]);
    data
}

fn acme_jpeg() -> Vec<u8> {
    let mut block = MetadataBlock::new(Endian::Little);
    block.primary.insert(0x010F, TagValue::ascii("Acme"));
    block.primary.insert(0x0112, TagValue::Short(vec![1]));
    jpeg(Some(&block))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_edits(dir: &Path, yaml: &str) -> String {
    let path = dir.join("edits.yaml");
    fs::write(&path, yaml).unwrap();
    path.to_string_lossy().into_owned()
}

// ── read ─────────────────────────────────────────────────────────────

#[test]
fn read_prints_make() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("acme.jpg"), acme_jpeg()).unwrap();

    let output = bulk_exif(&["read", dir.path().to_str().unwrap()]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("acme.jpg\n--------\n"), "{out}");
    assert!(out.lines().any(|l| l == "Make Acme"), "{out}");
}

#[test]
fn read_skips_non_images() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let output = bulk_exif(&["read", dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn read_json_groups_fields() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("acme.jpg"), acme_jpeg()).unwrap();

    let output = bulk_exif(&["read", "--json", dir.path().to_str().unwrap()]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["exif"]["0th"]["Make"], "Acme");
    assert_eq!(value[0]["exif"]["0th"]["Orientation"], 1);
}

#[test]
fn read_rejects_missing_directory() {
    let output = bulk_exif(&["read", "/nonexistent/photos"]);
    assert!(!output.status.success());
}

// ── edit ─────────────────────────────────────────────────────────────

#[test]
fn edit_then_read_shows_new_value() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("acme.jpg"), acme_jpeg()).unwrap();
    let edits = write_edits(dir.path(), "exif:\n  Make: NewCo\n");

    let output = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits]);
    assert!(output.status.success());

    let out = stdout(&bulk_exif(&["read", images.to_str().unwrap()]));
    assert!(out.lines().any(|l| l == "Make NewCo"), "{out}");
    assert!(out.lines().any(|l| l == "Orientation 1"), "{out}");
}

#[test]
fn edit_skips_unconvertible_field_and_applies_the_rest() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("acme.jpg"), acme_jpeg()).unwrap();
    let edits = write_edits(dir.path(), "exif:\n  Make: NewCo\n  Flash: true\n");

    let output = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Flash"), "{stderr}");

    let out = stdout(&bulk_exif(&["read", images.to_str().unwrap()]));
    assert!(out.lines().any(|l| l == "Make NewCo"), "{out}");
    assert!(!out.contains("Flash"), "{out}");
}

#[test]
fn edit_leaves_jpeg_without_metadata_untouched() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let plain = jpeg(None);
    fs::write(images.join("plain.jpg"), &plain).unwrap();
    let edits = write_edits(dir.path(), "exif:\n  Make: NewCo\n");

    let output = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("plain.jpg"), "{stderr}");
    assert_eq!(fs::read(images.join("plain.jpg")).unwrap(), plain);
}

#[test]
fn edit_dry_run_and_backup() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let original = acme_jpeg();
    fs::write(images.join("acme.jpg"), &original).unwrap();
    let edits = write_edits(dir.path(), "exif:\n  Make: NewCo\n");

    let dry = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits, "--dry-run"]);
    assert!(dry.status.success());
    assert!(stdout(&dry).contains("Make"));
    assert_eq!(fs::read(images.join("acme.jpg")).unwrap(), original);

    let real = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits, "--backup"]);
    assert!(real.status.success());
    assert_eq!(fs::read(images.join("acme.jpg.bak")).unwrap(), original);
    assert_ne!(fs::read(images.join("acme.jpg")).unwrap(), original);
}

#[test]
fn edit_with_bad_config_fails_before_touching_images() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let original = acme_jpeg();
    fs::write(images.join("acme.jpg"), &original).unwrap();
    let edits = write_edits(dir.path(), "exif: [broken");

    let output = bulk_exif(&["edit", images.to_str().unwrap(), "-E", &edits]);
    assert!(!output.status.success());
    assert_eq!(fs::read(images.join("acme.jpg")).unwrap(), original);
}
