//! Shared fixtures: lopdf-built PDFs and stub recognizers/rasterizers
#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use explain_my_bill::{ExtractError, PageRasterizer, Recognizer};

/// Reports the width of each image it is given; narrower pages take longer,
/// so later (wider) pages finish first
pub struct WidthRecognizer;

impl Recognizer for WidthRecognizer {
    fn name(&self) -> &'static str {
        "width"
    }

    fn description(&self) -> &'static str {
        "reports image width"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, ExtractError> {
        let delay = 2000u64.saturating_sub(image.width() as u64) / 20;
        thread::sleep(Duration::from_millis(delay));
        Ok(vec![format!("Page width {}", image.width()), "----".to_string()])
    }
}

/// Rasterizer that must never be reached
#[derive(Default)]
pub struct CountingRasterizer {
    pub calls: AtomicUsize,
}

impl PageRasterizer for CountingRasterizer {
    fn rasterize(&self, _path: &Path, _dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExtractError::Rasterization("not expected".to_string()))
    }
}

fn finish(mut doc: PdfDocument, page_ids: Vec<lopdf::ObjectId>) -> Vec<u8> {
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
    });

    for page_id in page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A digitally generated PDF with one line of Helvetica text per page
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let page_ids = pages
        .iter()
        .map(|text| {
            // An empty entry becomes a page with an empty content stream
            let content = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text)
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            })
        })
        .collect();

    finish(doc, page_ids)
}

/// Add a page whose MediaBox matches `image` in points and which draws it full-page
fn scan_page(doc: &mut PdfDocument, image: Stream, width: u32, height: u32) -> lopdf::ObjectId {
    let image_id = doc.add_object(Object::Stream(image));

    let content = format!("q {} 0 0 {} 0 0 cm /Scan Do Q", width, height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Scan" => image_id },
        },
    })
}

/// Pixels of the striped gray scan: 25 px black, 25 px white, repeating
pub fn striped_scan(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        Luma([if x % 50 < 25 { 0 } else { 255 }])
    })
}

fn gray_image_stream(width: u32, height: u32) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        striped_scan(width, height).into_raw(),
    )
}

/// Height of every page built by [`scanned_pdf`] and [`flate_scanned_pdf`]
pub const SCAN_HEIGHT: u32 = 40;

/// An image-only PDF: each page is one uncompressed 8-bit gray scan of the given width.
///
/// The MediaBox matches the scan in points, so rasterizing at 72 DPI gives
/// back images of exactly these widths.
pub fn scanned_pdf(widths: &[u32]) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");

    let page_ids = widths
        .iter()
        .map(|&width| {
            let mut image = gray_image_stream(width, SCAN_HEIGHT);
            image.allows_compression = false;
            scan_page(&mut doc, image, width, SCAN_HEIGHT)
        })
        .collect();

    finish(doc, page_ids)
}

/// Like [`scanned_pdf`], but every scan is stored FlateDecode-compressed
pub fn flate_scanned_pdf(widths: &[u32]) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");

    let page_ids = widths
        .iter()
        .map(|&width| {
            let mut image = gray_image_stream(width, SCAN_HEIGHT);
            image.compress().unwrap();
            assert!(image.dict.get(b"Filter").is_ok(), "scan was not compressed");
            scan_page(&mut doc, image, width, SCAN_HEIGHT)
        })
        .collect();

    finish(doc, page_ids)
}

/// A one-page PDF whose scan is a DCTDecode (JPEG) RGB image: dark left half, light right half
pub fn jpeg_scanned_pdf(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([10, 10, 10])
        } else {
            Rgb([245, 245, 245])
        }
    });
    let mut jpeg = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut jpeg, image::ImageFormat::Jpeg)
        .unwrap();

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.into_inner(),
    );
    image.allows_compression = false;

    let mut doc = PdfDocument::with_version("1.4");
    let page_id = scan_page(&mut doc, image, width, height);
    finish(doc, vec![page_id])
}

/// A one-page PDF whose scan is a 1-bit image: black left half, white right half
pub fn bilevel_scanned_pdf(width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width.div_ceil(8) as usize;
    let mut data = vec![0u8; row_bytes * height as usize];
    for y in 0..height as usize {
        for x in width / 2..width {
            data[y * row_bytes + (x / 8) as usize] |= 0x80 >> (x % 8);
        }
    }

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 1,
        },
        data,
    );
    image.allows_compression = false;

    let mut doc = PdfDocument::with_version("1.4");
    let page_id = scan_page(&mut doc, image, width, height);
    finish(doc, vec![page_id])
}

/// A one-page 200x200 pt PDF with a filled black square and no image or text
pub fn vector_pdf() -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"0 0 0 rg 20 20 160 160 re f".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {},
    });
    finish(doc, vec![page_id])
}

/// A one-page PDF of the given size in points that draws nothing
pub fn blank_pdf(width: u32, height: u32) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.4");
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
        "Contents" => content_id,
        "Resources" => dictionary! {},
    });
    finish(doc, vec![page_id])
}

/// Encode a white image of the given size with a dark stripe as PNG bytes
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |_, y| {
        Luma([if y < height / 2 { 20 } else { 235 }])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Write `bytes` to a temp file with the given extension
pub fn temp_file(bytes: &[u8], extension: &str) -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    std::fs::write(file.path(), bytes).unwrap();
    file
}
