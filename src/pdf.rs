use std::io;
use std::path::Path;

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

use crate::collector::PageImage;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("a document must contain at least one page")]
    Empty,
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("pdf assembly failed: {0}")]
    Assemble(#[from] lopdf::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Writes one paginated PDF to `path`, one page per image in order. Each page
/// is embedded as a JPEG image object at one point per pixel; the first image
/// fixes the document container's default page box and every page carries its
/// own.
pub fn write_document(path: &Path, pages: &[PageImage]) -> Result<(), PdfError> {
    let first = pages.first().ok_or(PdfError::Empty)?;
    let (default_width, default_height) = first.image.dimensions();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let (width, height) = page.image.dimensions();

        let mut jpeg: Vec<u8> = Vec::new();
        JpegEncoder::new(&mut jpeg).encode_image(&page.image)?;

        let image_id = doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            )
            .with_compression(false),
        );

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        (width as i64).into(),
                        0.into(),
                        0.into(),
                        (height as i64).into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (width as i64).into(),
                (height as i64).into(),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (default_width as i64).into(),
                (default_height as i64).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(concat!("tankobon ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(format!(
            "D:{}Z",
            Utc::now().format("%Y%m%d%H%M%S")
        )),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.compress();
    doc.save(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn page(width: u32, height: u32) -> PageImage {
        PageImage {
            source: PathBuf::from(format!("{}x{}.jpg", width, height)),
            image: RgbImage::new(width, height),
        }
    }

    #[test]
    fn writes_one_pdf_page_per_image() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("volume.pdf");

        write_document(&target, &[page(2, 3), page(4, 4), page(3, 2)]).expect("write pdf");

        let doc = Document::load(&target).expect("reload pdf");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn refuses_an_empty_document() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("empty.pdf");

        assert!(matches!(
            write_document(&target, &[]),
            Err(PdfError::Empty)
        ));
        assert!(!target.exists());
    }
}
