//! Scan-image extraction with lopdf
//!
//! Scanned bills are PDFs whose pages are each one full-page image. A page
//! is rendered by decoding its largest image XObject and resampling it to
//! the page's MediaBox at the requested DPI.

use image::{imageops::FilterType, DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

use super::{points_to_pixels, PageRasterizer};
use crate::error::ExtractError;

/// US Letter, used when a page has no usable MediaBox
const FALLBACK_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Content stream operators that put marks on the page
const PAINTING_OPERATORS: &[&str] = &[
    "f", "F", "f*", "B", "B*", "b", "b*", "S", "s", "sh", "Tj", "TJ", "'", "\"", "Do", "BI",
];

/// Pure Rust rasterizer for image-only (scanned) PDFs, built on lopdf
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfRasterizer;

impl PageRasterizer for LopdfRasterizer {
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        let doc = Document::load(path)
            .map_err(|e| ExtractError::Rasterization(format!("Failed to load PDF: {}", e)))?;

        // get_pages is keyed by 1-based page number, so iteration is in page order
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ExtractError::Rasterization("PDF has no pages".to_string()));
        }

        tracing::info!("Rasterizing {} pages at {} DPI", pages.len(), dpi);

        pages
            .into_iter()
            .map(|(number, page_id)| render_page(&doc, number, page_id, dpi))
            .collect()
    }
}

fn render_page(
    doc: &Document,
    number: u32,
    page_id: ObjectId,
    dpi: u32,
) -> Result<DynamicImage, ExtractError> {
    let page = doc.get_dictionary(page_id).map_err(|e| {
        ExtractError::Rasterization(format!("Page {} is not a dictionary: {}", number, e))
    })?;

    let (width_pt, height_pt) = media_box(doc, page).unwrap_or(FALLBACK_PAGE_SIZE);
    let width = points_to_pixels(width_pt, dpi);
    let height = points_to_pixels(height_pt, dpi);

    let Some(stream) = largest_page_image(doc, page) else {
        if page_has_marks(doc, page_id) {
            return Err(ExtractError::Rasterization(format!(
                "Page {} has vector content but no scan image; rendering it needs PDFium",
                number
            )));
        }
        tracing::debug!("Page {} is empty; rendering it blank", number);
        return Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([255, 255, 255]),
        )));
    };

    let scan = decode_image(doc, stream).map_err(|reason| {
        ExtractError::Rasterization(format!("Page {}: {}", number, reason))
    })?;

    tracing::debug!(
        page = number,
        source_width = scan.width(),
        source_height = scan.height(),
        width,
        height,
        "Rendered page"
    );

    if scan.width() == width && scan.height() == height {
        return Ok(scan);
    }
    Ok(scan.resize_exact(width, height, FilterType::Triangle))
}

/// Whether the page's content stream draws anything; unreadable content counts as drawn
fn page_has_marks(doc: &Document, page_id: ObjectId) -> bool {
    match doc.get_and_decode_page_content(page_id) {
        Ok(content) => content
            .operations
            .iter()
            .any(|op| PAINTING_OPERATORS.contains(&op.operator.as_str())),
        Err(_) => true,
    }
}

/// Follow an indirect reference, if `obj` is one
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a page attribute, walking up the page tree for inherited ones
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    // Bounded so a cyclic /Parent chain cannot spin forever
    for _ in 0..64 {
        if let Ok(obj) = current.get(key) {
            return Some(resolve(doc, obj));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Page size in points from /MediaBox
fn media_box(doc: &Document, page: &Dictionary) -> Option<(f32, f32)> {
    let values: Vec<f32> = inherited(doc, page, b"MediaBox")?
        .as_array()
        .ok()?
        .iter()
        .map(|v| number(resolve(doc, v)))
        .collect::<Option<_>>()?;

    match values.as_slice() {
        [x0, y0, x1, y1] if x1 != x0 && y1 != y0 => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}

fn dict_int(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// The page's largest image XObject by pixel area (the scan, not a logo)
fn largest_page_image<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Stream> {
    let resources = inherited(doc, page, b"Resources")?.as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()?;

    xobjects
        .iter()
        .filter_map(|(_, obj)| resolve(doc, obj).as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false)
        })
        .max_by_key(|stream| {
            let width = dict_int(&stream.dict, b"Width").unwrap_or(0);
            let height = dict_int(&stream.dict, b"Height").unwrap_or(0);
            width.saturating_mul(height)
        })
}

/// Names of the filters applied to a stream, outermost first
fn filter_names(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| f.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// A positive /Width or /Height that fits in `u32`
fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, String> {
    let name = String::from_utf8_lossy(key);
    let value = dict_int(dict, key).ok_or_else(|| format!("Missing image {}", name))?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| format!("Invalid image {}: {}", name, value))
}

/// Bytes needed for `width` x `height` samples of `bytes_per_pixel` each
fn buffer_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize, String> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .ok_or_else(|| format!("Image too large: {}x{}", width, height))
}

/// `data` cut to exactly `len` bytes, or an error if it is shorter
fn exact(mut data: Vec<u8>, len: usize, width: u32, height: u32) -> Result<Vec<u8>, String> {
    if data.len() < len {
        return Err(format!(
            "Image data too short for {}x{}: {} of {} bytes",
            width,
            height,
            data.len(),
            len
        ));
    }
    data.truncate(len);
    Ok(data)
}

/// Decode an image XObject into pixels
fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, String> {
    let filters = filter_names(stream);

    if filters.last().map(|f| f.as_slice()) == Some(&b"DCTDecode"[..]) {
        // The (remaining) stream content is a complete JPEG file
        let jpeg = if filters.len() > 1 {
            stream.decompressed_content().unwrap_or_else(|_| stream.content.clone())
        } else {
            stream.content.clone()
        };
        return image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .map_err(|e| format!("Failed to decode JPEG image: {}", e));
    }

    if let Some(unsupported) = filters
        .iter()
        .find(|f| matches!(f.as_slice(), b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode"))
    {
        return Err(format!(
            "Unsupported image filter: {}",
            String::from_utf8_lossy(unsupported)
        ));
    }

    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;
    let bits_per_component = dict_int(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    let (color_space, components) = color_space(doc, stream);

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("Failed to decompress image: {}", e))?
    };

    match (components, bits_per_component) {
        (1, 8) => {
            let data = exact(data, buffer_len(width, height, 1)?, width, height)?;
            GrayImage::from_raw(width, height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| format!("Invalid grayscale image {}x{}", width, height))
        }
        (1, 1) => unpack_bilevel(&data, width, height).map(DynamicImage::ImageLuma8),
        (3, 8) => {
            let data = exact(data, buffer_len(width, height, 3)?, width, height)?;
            RgbImage::from_raw(width, height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| format!("Invalid RGB image {}x{}", width, height))
        }
        (4, 8) => cmyk_to_rgb(&data, width, height).map(DynamicImage::ImageRgb8),
        _ => Err(format!(
            "Unsupported image format: color space {}, {} bits per component",
            color_space, bits_per_component
        )),
    }
}

/// Color space name and component count for an image stream
fn color_space(doc: &Document, stream: &Stream) -> (String, usize) {
    let cs = match stream.dict.get(b"ColorSpace") {
        Ok(obj) => resolve(doc, obj),
        // Image masks and some minimal writers omit it
        Err(_) => return ("DeviceGray".to_string(), 1),
    };

    let (name, params) = match cs {
        Object::Name(name) => (name.as_slice(), None),
        Object::Array(array) => match array.first().and_then(|o| o.as_name().ok()) {
            Some(name) => (name, array.get(1).map(|p| resolve(doc, p))),
            None => return ("Unknown".to_string(), 0),
        },
        _ => return ("Unknown".to_string(), 0),
    };

    let components = match name {
        b"DeviceGray" | b"CalGray" | b"G" => 1,
        b"DeviceRGB" | b"CalRGB" | b"RGB" => 3,
        b"DeviceCMYK" | b"CMYK" => 4,
        // ICC profiles declare their component count in /N
        b"ICCBased" => params
            .and_then(|p| p.as_stream().ok())
            .and_then(|s| dict_int(&s.dict, b"N"))
            .map(|n| n as usize)
            .unwrap_or(3),
        _ => 0,
    };

    (String::from_utf8_lossy(name).to_string(), components)
}

/// Expand 1-bit rows (each padded to a whole byte) to 8-bit grayscale
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Result<GrayImage, String> {
    let row_bytes = width.div_ceil(8) as usize;
    if data.len() < buffer_len(height, 1, row_bytes)? {
        return Err(format!("Bilevel image data too short for {}x{}", width, height));
    }

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + (x / 8) as usize];
        let bit = (byte >> (7 - (x % 8))) & 1;
        Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

fn cmyk_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, String> {
    let len = buffer_len(width, height, 4)?;
    if data.len() < len {
        return Err(format!("CMYK image data too short for {}x{}", width, height));
    }

    let rgb_data = data[..len]
        .chunks_exact(4)
        .flat_map(|chunk| {
            let c = chunk[0] as f32 / 255.0;
            let m = chunk[1] as f32 / 255.0;
            let y = chunk[2] as f32 / 255.0;
            let k = chunk[3] as f32 / 255.0;
            [
                ((1.0 - c) * (1.0 - k) * 255.0) as u8,
                ((1.0 - m) * (1.0 - k) * 255.0) as u8,
                ((1.0 - y) * (1.0 - k) * 255.0) as u8,
            ]
        })
        .collect();

    RgbImage::from_raw(width, height, rgb_data)
        .ok_or_else(|| "Invalid CMYK->RGB conversion".to_string())
}
