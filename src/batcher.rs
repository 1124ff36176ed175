use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::PageSequence;
use crate::pdf::{self, PdfError};

/// How the ordered page sequence is partitioned into output documents.
/// The wire shape is `{"mode": "none" | "pages" | "chapters", "value": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum SplitPolicy {
    #[default]
    #[serde(rename = "none")]
    NoSplit,
    #[serde(rename = "pages")]
    ByPages(u32),
    #[serde(rename = "chapters")]
    ByChapters(u32),
}

impl SplitPolicy {
    /// A zero value in either counted mode means "do not split".
    pub fn normalized(self) -> SplitPolicy {
        match self {
            SplitPolicy::ByPages(0) | SplitPolicy::ByChapters(0) => SplitPolicy::NoSplit,
            other => other,
        }
    }
}

/// Reported once per written document with the cumulative page count, so the
/// caller can render a percentage against `total_pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteProgress {
    pub written_pages: usize,
    pub total_pages: usize,
    pub document: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to write {}: {source}", .document.display())]
    DocumentWrite {
        document: PathBuf,
        source: PdfError,
    },
}

/// Partitions the sequence into contiguous page ranges, one per output
/// document. Chapter grouping counts every discovered chapter, including ones
/// that contributed no surviving pages, but a range that ends up empty is
/// dropped so no zero-page document is ever written.
fn plan_chunks(policy: SplitPolicy, sequence: &PageSequence) -> Vec<Range<usize>> {
    let total = sequence.pages.len();
    let ranges: Vec<Range<usize>> = match policy.normalized() {
        SplitPolicy::NoSplit => vec![0..total],
        SplitPolicy::ByPages(per_document) => {
            let per_document = per_document as usize;
            (0..total)
                .step_by(per_document)
                .map(|start| start..(start + per_document).min(total))
                .collect()
        }
        SplitPolicy::ByChapters(per_document) => sequence
            .chapters
            .chunks(per_document as usize)
            .map(|group| group[0].pages.start..group[group.len() - 1].pages.end)
            .collect(),
    };

    ranges
        .into_iter()
        .filter(|range| !range.is_empty())
        .collect()
}

/// Output naming. An unsplit run is `<base>.pdf`; page splitting always
/// numbers its parts; chapter splitting only introduces part numbers once a
/// second document exists. The total document count is known before the first
/// write because chunks are planned over the fully materialized sequence.
fn document_file_name(
    base_name: &str,
    policy: SplitPolicy,
    index: usize,
    total_documents: usize,
) -> String {
    let part = match policy {
        SplitPolicy::NoSplit => None,
        SplitPolicy::ByPages(_) => Some(index + 1),
        SplitPolicy::ByChapters(_) if total_documents <= 1 => None,
        SplitPolicy::ByChapters(_) => Some(index + 1),
    };

    match part {
        Some(number) => format!("{}_part{}.pdf", base_name, number),
        None => format!("{}.pdf", base_name),
    }
}

/// Writes one PDF per planned chunk into `output_dir`, in sequence order,
/// invoking `on_progress` after each document. A write failure aborts the
/// run; documents already written are left in place.
pub fn write_documents(
    sequence: &PageSequence,
    policy: SplitPolicy,
    base_name: &str,
    output_dir: &Path,
    on_progress: &mut dyn FnMut(&WriteProgress),
) -> Result<Vec<WrittenDocument>, BatchError> {
    let policy = policy.normalized();
    let chunks = plan_chunks(policy, sequence);
    let total_pages = sequence.pages.len();
    let total_documents = chunks.len();

    let mut written: Vec<WrittenDocument> = Vec::with_capacity(total_documents);
    let mut written_pages = 0usize;

    for (index, range) in chunks.into_iter().enumerate() {
        let file_name = document_file_name(base_name, policy, index, total_documents);
        let document = output_dir.join(file_name);
        let pages = &sequence.pages[range];

        pdf::write_document(&document, pages).map_err(|source| BatchError::DocumentWrite {
            document: document.clone(),
            source,
        })?;

        written_pages += pages.len();
        on_progress(&WriteProgress {
            written_pages,
            total_pages,
            document: document.clone(),
        });

        written.push(WrittenDocument {
            path: document,
            page_count: pages.len(),
        });
    }

    Ok(written)
}
