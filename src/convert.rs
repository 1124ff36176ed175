use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batcher::{self, BatchError, SplitPolicy, WriteProgress, WrittenDocument};
use crate::collector::{self, ScanError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Root directory holding one subdirectory per chapter.
    pub root: PathBuf,
    /// Filename stem for the produced PDFs, used verbatim.
    pub output_name: String,
    #[serde(default)]
    pub policy: SplitPolicy,
    /// Defaults to the current working directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOutcome {
    pub documents: Vec<WrittenDocument>,
    pub total_pages: usize,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("output name is empty")]
    EmptyOutputName,
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Runs the whole pipeline: validate, scan, partition, write. The run is
/// synchronous and blocking; `on_progress` fires once per written document
/// with cumulative page counts. No state is shared with the caller and
/// nothing is persisted besides the documents themselves.
pub fn perform_convert(
    options: ConvertOptions,
    on_progress: &mut dyn FnMut(&WriteProgress),
) -> Result<ConvertOutcome, ConvertError> {
    let ConvertOptions {
        root,
        output_name,
        policy,
        output_dir,
    } = options;

    if output_name.trim().is_empty() {
        return Err(ConvertError::EmptyOutputName);
    }

    let policy = policy.normalized();
    let sequence = collector::scan_chapters(&root)?;
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

    let documents =
        batcher::write_documents(&sequence, policy, &output_name, &output_dir, on_progress)?;

    let warnings = build_warnings(&sequence.skipped);
    Ok(ConvertOutcome {
        documents,
        total_pages: sequence.pages.len(),
        skipped: sequence.skipped,
        warnings,
    })
}

fn build_warnings(skipped: &[String]) -> Vec<String> {
    if skipped.is_empty() {
        Vec::new()
    } else {
        let preview: Vec<String> = skipped.iter().take(5).cloned().collect();
        let suffix = if skipped.len() > preview.len() {
            format!(" (+{} more)", skipped.len() - preview.len())
        } else {
            String::new()
        };
        vec![format!(
            "Skipped {} unreadable page files: {}{}",
            skipped.len(),
            preview.join(", "),
            suffix
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use lopdf::Document;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_page(dir: &Path, name: &str) {
        let image = RgbImage::new(2, 3);
        image.save(dir.join(name)).expect("write page image");
    }

    fn chapter(root: &Path, name: &str, pages: &[&str]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("chapter dir");
        for page in pages {
            write_page(&dir, page);
        }
    }

    fn options(root: &Path, out: &Path, policy: SplitPolicy) -> ConvertOptions {
        ConvertOptions {
            root: root.to_path_buf(),
            output_name: "volume".to_string(),
            policy,
            output_dir: Some(out.to_path_buf()),
        }
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).expect("reload pdf").get_pages().len()
    }

    #[test]
    fn unsplit_run_produces_one_document_in_chapter_order() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        chapter(source.path(), "c1", &["1.jpg", "2.jpg"]);
        chapter(source.path(), "c2", &["1.jpg", "2.jpg", "3.jpg"]);

        let mut events: Vec<(usize, usize)> = Vec::new();
        let outcome = perform_convert(
            options(source.path(), out.path(), SplitPolicy::NoSplit),
            &mut |progress| events.push((progress.written_pages, progress.total_pages)),
        )
        .expect("convert");

        assert_eq!(outcome.total_pages, 5);
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].path, out.path().join("volume.pdf"));
        assert_eq!(events, vec![(5, 5)]);
        assert_eq!(page_count(&out.path().join("volume.pdf")), 5);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn page_split_partitions_into_exact_parts() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        chapter(source.path(), "c1", &["1.jpg", "2.jpg"]);
        chapter(source.path(), "c2", &["1.jpg", "2.jpg", "3.jpg"]);

        let outcome = perform_convert(
            options(source.path(), out.path(), SplitPolicy::ByPages(3)),
            &mut |_| {},
        )
        .expect("convert");

        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(page_count(&out.path().join("volume_part1.pdf")), 3);
        assert_eq!(page_count(&out.path().join("volume_part2.pdf")), 2);

        let written: usize = outcome
            .documents
            .iter()
            .map(|document| document.page_count)
            .sum();
        assert_eq!(written, outcome.total_pages);
    }

    #[test]
    fn chapter_split_flushes_whole_chapters() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        chapter(source.path(), "c1", &["1.jpg", "2.jpg"]);
        chapter(source.path(), "c2", &["1.jpg", "2.jpg", "3.jpg"]);
        chapter(source.path(), "c3", &["1.jpg"]);

        let outcome = perform_convert(
            options(source.path(), out.path(), SplitPolicy::ByChapters(2)),
            &mut |_| {},
        )
        .expect("convert");

        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(page_count(&out.path().join("volume_part1.pdf")), 5);
        assert_eq!(page_count(&out.path().join("volume_part2.pdf")), 1);
    }

    #[test]
    fn corrupt_pages_are_skipped_without_failing_the_run() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        chapter(source.path(), "c1", &["1.jpg"]);

        let mut file = File::create(source.path().join("c1").join("2.jpg")).expect("create file");
        file.write_all(b"truncated garbage").expect("write file");

        let outcome = perform_convert(
            options(source.path(), out.path(), SplitPolicy::NoSplit),
            &mut |_| {},
        )
        .expect("convert");

        assert_eq!(outcome.total_pages, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Skipped 1"));
        assert_eq!(page_count(&out.path().join("volume.pdf")), 1);
    }

    #[test]
    fn chapters_without_any_matching_extension_report_no_input() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        let dir = source.path().join("c1");
        fs::create_dir_all(&dir).expect("chapter dir");
        fs::write(dir.join("page.webp"), b"ignored").expect("write file");

        let result = perform_convert(
            options(source.path(), out.path(), SplitPolicy::NoSplit),
            &mut |_| {},
        );

        assert!(matches!(
            result,
            Err(ConvertError::Scan(ScanError::NoImages(_)))
        ));
    }

    #[test]
    fn an_empty_output_name_never_reaches_the_scanner() {
        let out = TempDir::new().expect("out dir");

        let result = perform_convert(
            ConvertOptions {
                root: PathBuf::from("does-not-matter"),
                output_name: "   ".to_string(),
                policy: SplitPolicy::NoSplit,
                output_dir: Some(out.path().to_path_buf()),
            },
            &mut |_| {},
        );

        assert!(matches!(result, Err(ConvertError::EmptyOutputName)));
    }

    #[test]
    fn rerunning_an_unchanged_tree_is_idempotent() {
        let source = TempDir::new().expect("source dir");
        let out = TempDir::new().expect("out dir");
        chapter(source.path(), "c1", &["1.jpg", "2.jpg"]);
        chapter(source.path(), "c2", &["1.jpg"]);

        let first = perform_convert(
            options(source.path(), out.path(), SplitPolicy::NoSplit),
            &mut |_| {},
        )
        .expect("first run");
        let second = perform_convert(
            options(source.path(), out.path(), SplitPolicy::NoSplit),
            &mut |_| {},
        )
        .expect("second run");

        assert_eq!(first.documents, second.documents);
        assert_eq!(first.total_pages, second.total_pages);
        assert_eq!(page_count(&out.path().join("volume.pdf")), 3);
    }
}
