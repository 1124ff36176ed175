//! Collects chapter folders of page scans into ordered, optionally split PDF
//! volumes.
//!
//! Two stages are consumed in order: [`collector::scan_chapters`] derives one
//! deterministic page order from unreliable filesystem names, and
//! [`batcher::write_documents`] partitions that order into PDF documents
//! under a [`SplitPolicy`]. [`perform_convert`] ties the two together behind
//! an options/outcome surface; rendering progress and terminal status is the
//! caller's business.

pub mod batcher;
pub mod collector;
pub mod convert;
pub mod pdf;

pub use batcher::{SplitPolicy, WriteProgress, WrittenDocument};
pub use collector::{ChapterSpan, PageImage, PageSequence, ScanError};
pub use convert::{perform_convert, ConvertError, ConvertOptions, ConvertOutcome};
