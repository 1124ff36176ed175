use std::cmp::Ordering;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

/// Sort key extracted from a directory or file name: the first run of ASCII
/// digits, or `NonNumeric` when the name carries none. All numeric keys order
/// before all non-numeric ones; callers break remaining ties on the name
/// itself, so the resulting order never depends on filesystem enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Numeric(u64),
    NonNumeric,
}

pub fn sort_key(name: &str) -> SortKey {
    let digits = name.chars().skip_while(|ch| !ch.is_ascii_digit());
    let mut value: Option<u64> = None;

    for ch in digits {
        let Some(digit) = ch.to_digit(10) else {
            break;
        };
        let current = value.unwrap_or(0);
        value = Some(current.saturating_mul(10).saturating_add(u64::from(digit)));
    }

    match value {
        Some(value) => SortKey::Numeric(value),
        None => SortKey::NonNumeric,
    }
}

/// Chapter order: numeric key first, directory name as tiebreak.
pub fn chapter_order(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

/// Page order within a chapter: numeric key of the filename stem, full
/// filename as tiebreak.
pub fn page_order(a: &str, b: &str) -> Ordering {
    sort_key(stem(a))
        .cmp(&sort_key(stem(b)))
        .then_with(|| a.cmp(b))
}

fn stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapterEntry {
    directory: PathBuf,
    folder_name: String,
}

/// One decoded page, normalized to RGB8, in final document order.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub source: PathBuf,
    pub image: RgbImage,
}

/// The contiguous index range of [`PageSequence::pages`] a chapter occupies.
/// A chapter whose files all failed to decode keeps an empty range and still
/// counts toward chapter-based splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSpan {
    pub folder_name: String,
    pub pages: Range<usize>,
}

/// Every surviving page from every chapter, fully decoded and held in memory
/// for the duration of one run. Chapter-count splitting can only place its
/// boundaries after the whole tree has been scanned, so the sequence is
/// materialized before the first document is written; memory use grows with
/// the total page count.
#[derive(Debug)]
pub struct PageSequence {
    pub pages: Vec<PageImage>,
    pub chapters: Vec<ChapterSpan>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("no supported images found in {}", .0.display())]
    NoImages(PathBuf),
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Scans one level of chapter subdirectories under `root` and produces the
/// globally ordered page sequence. Non-directory entries at the root are
/// ignored; files are filtered by the extension allow-list; a per-file decode
/// failure is recorded and skipped, never fatal.
pub fn scan_chapters(root: &Path) -> Result<PageSequence, ScanError> {
    if !root.exists() || !root.is_dir() {
        return Err(ScanError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut chapters: Vec<ChapterEntry> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let path = entry.path();
        let folder_name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| ScanError::NonUtf8Path(path.clone()))?
            .to_string();

        chapters.push(ChapterEntry {
            directory: path,
            folder_name,
        });
    }

    chapters.sort_by(|a, b| chapter_order(&a.folder_name, &b.folder_name));

    let mut pages: Vec<PageImage> = Vec::new();
    let mut spans: Vec<ChapterSpan> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for chapter in &chapters {
        let start = pages.len();

        let mut files: Vec<(PathBuf, String)> = Vec::new();
        for entry in fs::read_dir(&chapter.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }

            let path = entry.path();
            if !is_supported_image(&path) {
                continue;
            }

            let file_name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| ScanError::NonUtf8Path(path.clone()))?
                .to_string();

            files.push((path, file_name));
        }

        files.sort_by(|a, b| page_order(&a.1, &b.1));

        for (path, file_name) in files {
            match image::open(&path) {
                Ok(decoded) => pages.push(PageImage {
                    source: path,
                    image: decoded.to_rgb8(),
                }),
                Err(err) => {
                    warn!("failed to decode {}: {}", path.display(), err);
                    skipped.push(format!("{}/{}: {}", chapter.folder_name, file_name, err));
                }
            }
        }

        spans.push(ChapterSpan {
            folder_name: chapter.folder_name.clone(),
            pages: start..pages.len(),
        });
    }

    if pages.is_empty() {
        return Err(ScanError::NoImages(root.to_path_buf()));
    }

    Ok(PageSequence {
        pages,
        chapters: spans,
        skipped,
    })
}
