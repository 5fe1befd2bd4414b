use futures_util::future;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use crate::config::EditSet;
use crate::error::{ExifError, Result};
use crate::exif::{self, EditOutcome, MetadataBlock, TagDictionary};

/// Image formats the tool reads and rewrites, determined by file extension.
///
/// The extension only decides whether a file is picked up; the container is
/// re-detected from the file's magic bytes when it is decoded.
///
/// # Example
///
/// ```rust
/// use bulk_exif::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("IMG_0001.JPG")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("notes.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG: EXIF in an APP1 segment
    Jpeg,
    /// TIFF: the file itself is the EXIF structure
    Tiff,
    /// WebP: EXIF in a RIFF `EXIF` chunk
    WebP,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

/// Switches for [`edit_image`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EditOptions {
    /// Compute the new file but leave the original untouched.
    pub dry_run: bool,
    /// Copy the original to `<name>.<ext>.bak` before replacing it.
    pub backup: bool,
}

/// What [`edit_image`] did to one file.
#[derive(Debug)]
pub struct EditReport {
    pub path: PathBuf,
    /// One outcome per field of the edit set.
    pub outcomes: Vec<EditOutcome>,
    /// Whether the file on disk was replaced.
    pub written: bool,
    /// Backup created before the write, if any.
    pub backup_path: Option<PathBuf>,
}

impl EditReport {
    /// Number of fields that were applied.
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }
}

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Collect supported image files under `root`.
///
/// The directory is walked recursively (following symlinks). Only files with
/// supported image extensions are included; the result is sorted so runs are
/// deterministic. A file reachable under several names (a symlink and its
/// target) is listed once, under the first name in sorted order. A plain
/// file path is accepted too.
///
/// # Example
///
/// ```rust,no_run
/// use bulk_exif::pipeline::collect_images;
/// use std::path::Path;
///
/// let images = collect_images(Path::new("./photos/"));
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();

    if root.is_file() {
        if is_supported_image(root) {
            images.push(root.to_path_buf());
        } else {
            log::debug!("Skipping unsupported file: {}", root.display());
        }
        return images;
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cannot walk {}: {e}", root.display());
                continue;
            }
        };
        let p = entry.path();
        if entry.file_type().is_file() && is_supported_image(p) {
            images.push(p.to_path_buf());
        }
    }

    images.sort();

    let mut seen = HashSet::new();
    images.retain(|p| {
        let real = std::fs::canonicalize(p).unwrap_or_else(|_| p.clone());
        let first = seen.insert(real);
        if !first {
            log::debug!("Skipping duplicate path: {}", p.display());
        }
        first
    });
    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    ImageKind::from_path(path).is_some()
}

/// Read and decode the metadata block of one image.
pub fn read_image(path: &Path) -> Result<MetadataBlock> {
    let data = std::fs::read(path).map_err(|e| ExifError::io(path, e))?;
    let block = exif::decode(&data)?;
    if block.is_empty() {
        log::info!("{}: metadata block has no entries", path.display());
    } else {
        log::debug!("{}: {} entries", path.display(), block.len());
    }
    Ok(block)
}

/// Apply `edits` to one image and write it back.
///
/// 1. **Decode**: read the file and its metadata block
/// 2. **Apply**: run the mutator; unknown or unconvertible fields are logged
/// 3. **Encode**: re-serialize the block and splice it into the container
/// 4. **Write**: optional `.bak` copy, then an atomic replace of the file
///
/// When no field applies, or with [`EditOptions::dry_run`], the file is
/// left exactly as it was.
pub fn edit_image(
    path: &Path,
    edits: &EditSet,
    dict: &TagDictionary,
    options: EditOptions,
) -> Result<EditReport> {
    let original = std::fs::read(path).map_err(|e| ExifError::io(path, e))?;
    let mut block = exif::decode(&original)?;

    let outcomes = exif::apply(&mut block, edits, dict);
    for err in outcomes.iter().filter_map(EditOutcome::error) {
        log::warn!("{}: {err}", path.display());
    }

    let mut report = EditReport {
        path: path.to_path_buf(),
        outcomes,
        written: false,
        backup_path: None,
    };

    if report.applied() == 0 {
        log::info!("{}: no fields applied, file left unchanged", path.display());
        return Ok(report);
    }

    let tiff = exif::encode(&block)?;
    let updated = exif::write_back(&original, &tiff)?;

    if options.dry_run {
        log::info!(
            "{}: dry run, would apply {} field(s)",
            path.display(),
            report.applied()
        );
        return Ok(report);
    }

    if options.backup {
        report.backup_path = Some(backup_file(path)?);
    }

    exif::write_file(path, &updated)?;
    report.written = true;
    log::info!("Updated EXIF data for {}", path.display());
    Ok(report)
}

/// Create a backup of the original file. An existing backup is kept, so it
/// always holds the state before the first edit.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).map_err(|e| ExifError::io(&backup_path, e))?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Run `work` over `paths` with at most `jobs` images in flight.
///
/// Each image runs on the blocking pool. Successful results reach `emit`
/// in the order of `paths`, whatever order the workers finish in; failures
/// are logged with their path and counted, and the batch carries on. Ctrl-C
/// stops new images from being scheduled; those already running finish.
pub async fn run_batch<T, W, E>(paths: Vec<PathBuf>, jobs: usize, work: W, mut emit: E) -> BatchSummary
where
    T: Send + 'static,
    W: Fn(&Path) -> Result<T> + Send + Sync + 'static,
    E: FnMut(&Path, T),
{
    let work = Arc::new(work);
    let stop = Arc::new(AtomicBool::new(false));

    let interrupt = {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing images already in progress");
                stop.store(true, Ordering::SeqCst);
            }
        })
    };

    let total = paths.len();
    let mut results = stream::iter(paths.into_iter().enumerate())
        .take_while(|_| future::ready(!stop.load(Ordering::SeqCst)))
        .map(|(i, path)| {
            let work = Arc::clone(&work);
            async move {
                log::debug!("[{}/{}] {}", i + 1, total, path.display());
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || work(&task_path))
                    .await
                    .unwrap_or_else(|e| Err(ExifError::Worker(e.to_string())));
                (path, result)
            }
        })
        .buffered(jobs.max(1));

    let mut summary = BatchSummary::default();
    while let Some((path, result)) = results.next().await {
        match result {
            Ok(value) => {
                summary.succeeded += 1;
                emit(&path, value);
            }
            Err(e) => {
                summary.failed += 1;
                log::error!("Failed to process {}: {e}", path.display());
            }
        }
    }

    interrupt.abort();
    log::info!(
        "Done: {} succeeded, {} failed out of {total} images",
        summary.succeeded,
        summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::container::fixtures::{acme_block, bare_jpeg, jpeg_with, tiff_with_strip};
    use crate::exif::{IfdKind, TagValue};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_edits() -> EditSet {
        EditSet::parse("exif:\n  Make: NewCo\n").unwrap()
    }

    // ── ImageKind::from_path ──────────────────────────────────────────

    #[test]
    fn image_kind_jpeg() {
        assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("photo.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("PHOTO.JPG")), Some(ImageKind::Jpeg));
    }

    #[test]
    fn image_kind_webp() {
        assert_eq!(ImageKind::from_path(Path::new("image.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("IMAGE.WEBP")), Some(ImageKind::WebP));
    }

    #[test]
    fn image_kind_tiff() {
        assert_eq!(ImageKind::from_path(Path::new("scan.tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("scan.tiff")), Some(ImageKind::Tiff));
    }

    #[test]
    fn image_kind_unsupported() {
        assert_eq!(ImageKind::from_path(Path::new("image.png")), None);
        assert_eq!(ImageKind::from_path(Path::new("photo.heic")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    // ── is_supported_image ───────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.tif")));
        assert!(is_supported_image(Path::new("photo.TIFF")));
    }

    #[test]
    fn unsupported_image_extensions() {
        assert!(!is_supported_image(Path::new("doc.pdf")));
        assert!(!is_supported_image(Path::new("image.png")));
        assert!(!is_supported_image(Path::new("readme.txt")));
        assert!(!is_supported_image(Path::new("photo.jpg.bak")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_directory_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("b.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("a.tif"), b"fake").unwrap();
        fs::write(sub.join("c.webp"), b"fake").unwrap();
        fs::write(sub.join("d.txt"), b"fake").unwrap();

        let images = collect_images(dir.path());
        assert_eq!(
            images,
            vec![
                dir.path().join("a.tif"),
                dir.path().join("b.jpg"),
                sub.join("c.webp"),
            ]
        );
    }

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        assert_eq!(collect_images(&jpg), vec![jpg]);
    }

    #[test]
    fn collect_images_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(collect_images(dir.path()).is_empty());
    }

    #[test]
    fn collect_images_nonexistent_path() {
        assert!(collect_images(Path::new("/nonexistent/path")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn collect_images_lists_symlinked_file_once() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.jpg");
        fs::write(&real, b"fake").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link.jpg")).unwrap();

        // "link.jpg" sorts first and stands in for the target
        assert_eq!(collect_images(dir.path()), vec![dir.path().join("link.jpg")]);
    }

    #[cfg(unix)]
    #[test]
    fn edit_image_through_symlink_edits_target() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.jpg");
        let link = dir.path().join("link.jpg");
        fs::write(&real, jpeg_with(&acme_block())).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let dict = TagDictionary::standard();
        let report = edit_image(&link, &make_edits(), &dict, EditOptions::default()).unwrap();

        assert!(report.written);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let block = read_image(&real).unwrap();
        assert_eq!(block.primary[&0x010F], TagValue::ascii("NewCo"));
    }

    // ── edit_image ───────────────────────────────────────────────────

    #[test]
    fn edit_image_rewrites_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg_with(&acme_block())).unwrap();

        let dict = TagDictionary::standard();
        let report = edit_image(&path, &make_edits(), &dict, EditOptions::default()).unwrap();

        assert!(report.written);
        assert_eq!(report.applied(), 1);
        assert!(report.backup_path.is_none());
        let block = read_image(&path).unwrap();
        assert_eq!(block.primary[&0x010F], TagValue::ascii("NewCo"));
        // Untouched fields survive
        assert_eq!(block.exif, acme_block().exif);
    }

    #[test]
    fn edit_image_dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with(&acme_block());
        fs::write(&path, &original).unwrap();

        let dict = TagDictionary::standard();
        let options = EditOptions {
            dry_run: true,
            backup: true,
        };
        let report = edit_image(&path, &make_edits(), &dict, options).unwrap();

        assert!(!report.written);
        assert_eq!(report.applied(), 1);
        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(!dir.path().join("photo.jpg.bak").exists());
    }

    #[test]
    fn edit_image_backs_up_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with(&acme_block());
        fs::write(&path, &original).unwrap();

        let dict = TagDictionary::standard();
        let options = EditOptions {
            dry_run: false,
            backup: true,
        };
        let report = edit_image(&path, &make_edits(), &dict, options).unwrap();

        let backup = dir.path().join("photo.jpg.bak");
        assert_eq!(report.backup_path.as_deref(), Some(backup.as_path()));
        assert_eq!(fs::read(&backup).unwrap(), original);
        assert_ne!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn edit_image_with_only_unknown_fields_skips_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let original = jpeg_with(&acme_block());
        fs::write(&path, &original).unwrap();

        let dict = TagDictionary::standard();
        let edits = EditSet::parse("exif:\n  Bogus: 1\n").unwrap();
        let report = edit_image(&path, &edits, &dict, EditOptions::default()).unwrap();

        assert!(!report.written);
        assert_eq!(
            report.outcomes,
            vec![EditOutcome::Unknown {
                name: "Bogus".into()
            }]
        );
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn edit_image_without_metadata_fails_and_keeps_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        let original = bare_jpeg();
        fs::write(&path, &original).unwrap();

        let dict = TagDictionary::standard();
        let err = edit_image(&path, &make_edits(), &dict, EditOptions::default()).unwrap_err();

        assert!(matches!(err, ExifError::MissingMetadata));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn edit_image_tiff_keeps_strip_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.tif");
        let original = tiff_with_strip();
        fs::write(&path, &original).unwrap();

        let dict = TagDictionary::standard();
        edit_image(&path, &make_edits(), &dict, EditOptions::default()).unwrap();

        let updated = fs::read(&path).unwrap();
        assert_eq!(&updated[8..12], &original[8..12]);
        let block = read_image(&path).unwrap();
        assert_eq!(block.directory(IfdKind::Primary)[&0x010F], TagValue::ascii("NewCo"));
    }

    #[test]
    fn read_image_reports_missing_file() {
        let err = read_image(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(err, ExifError::Io { .. }));
    }

    // ── run_batch ────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_batch_emits_in_input_order() {
        let paths: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();

        let mut seen = Vec::new();
        let summary = run_batch(
            paths.clone(),
            4,
            |path: &Path| {
                // Earlier images take longer, so they finish last
                let n: u64 = path.file_stem().unwrap().to_str().unwrap().parse().unwrap();
                std::thread::sleep(Duration::from_millis(60 - n * 10));
                Ok(n)
            },
            |path, n| seen.push((path.to_path_buf(), n)),
        )
        .await;

        assert_eq!(summary, BatchSummary { succeeded: 6, failed: 0 });
        let expected: Vec<(PathBuf, u64)> = paths.into_iter().zip(0..).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn run_batch_continues_past_failures() {
        let paths = vec![
            PathBuf::from("good.jpg"),
            PathBuf::from("bad.jpg"),
            PathBuf::from("good2.jpg"),
        ];

        let mut emitted = Vec::new();
        let summary = run_batch(
            paths,
            2,
            |path: &Path| {
                if path.to_string_lossy().contains("bad") {
                    Err(ExifError::MissingMetadata)
                } else {
                    Ok(())
                }
            },
            |path, ()| emitted.push(path.to_path_buf()),
        )
        .await;

        assert_eq!(summary, BatchSummary { succeeded: 2, failed: 1 });
        assert_eq!(
            emitted,
            vec![PathBuf::from("good.jpg"), PathBuf::from("good2.jpg")]
        );
    }

    #[tokio::test]
    async fn run_batch_turns_panics_into_failures() {
        let summary = run_batch(
            vec![PathBuf::from("boom.jpg")],
            1,
            |_: &Path| -> Result<()> { panic!("worker exploded") },
            |_, ()| {},
        )
        .await;

        assert_eq!(summary, BatchSummary { succeeded: 0, failed: 1 });
    }
}
