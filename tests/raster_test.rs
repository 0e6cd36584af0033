mod common;

use common::{
    bilevel_scanned_pdf, blank_pdf, flate_scanned_pdf, jpeg_scanned_pdf, striped_scan, temp_file,
    vector_pdf, SCAN_HEIGHT,
};
use explain_my_bill::raster::{LopdfRasterizer, PdfiumRasterizer};
use explain_my_bill::{ExtractError, PageRasterizer};

fn render(bytes: &[u8], dpi: u32) -> Result<Vec<image::DynamicImage>, ExtractError> {
    let file = temp_file(bytes, "pdf");
    LopdfRasterizer.rasterize(file.path(), dpi)
}

#[test]
fn test_jpeg_scan_is_decoded_at_page_size() {
    let pages = render(&jpeg_scanned_pdf(120, 80), 72).unwrap();
    assert_eq!(pages.len(), 1);

    let page = pages[0].to_luma8();
    assert_eq!(page.dimensions(), (120, 80));
    // JPEG is lossy; sample well away from the edge between the halves
    assert!(page.get_pixel(20, 40).0[0] < 64, "left half should be dark");
    assert!(page.get_pixel(100, 40).0[0] > 192, "right half should be light");
}

#[test]
fn test_jpeg_scan_scales_with_dpi() {
    let pages = render(&jpeg_scanned_pdf(120, 80), 144).unwrap();
    assert_eq!(pages[0].width(), 240);
    assert_eq!(pages[0].height(), 160);
}

#[test]
fn test_flate_compressed_scans_decode_losslessly() {
    let widths = [90, 130];
    let pages = render(&flate_scanned_pdf(&widths), 72).unwrap();
    assert_eq!(pages.len(), 2);

    for (page, &width) in pages.iter().zip(&widths) {
        assert_eq!(page.to_luma8(), striped_scan(width, SCAN_HEIGHT));
    }
}

#[test]
fn test_bilevel_scan_expands_to_black_and_white() {
    let pages = render(&bilevel_scanned_pdf(20, 6), 72).unwrap();

    let page = pages[0].to_luma8();
    assert_eq!(page.dimensions(), (20, 6));
    assert_eq!(page.get_pixel(0, 0).0[0], 0);
    assert_eq!(page.get_pixel(9, 5).0[0], 0);
    assert_eq!(page.get_pixel(10, 0).0[0], 255);
    assert_eq!(page.get_pixel(19, 5).0[0], 255);
}

#[test]
fn test_empty_page_renders_blank() {
    let pages = render(&blank_pdf(100, 50), 72).unwrap();

    let page = pages[0].to_luma8();
    assert_eq!(page.dimensions(), (100, 50));
    assert!(page.pixels().all(|p| p.0[0] == 255));
}

#[test]
fn test_vector_page_without_scan_is_an_error() {
    match render(&vector_pdf(), 72) {
        Err(ExtractError::Rasterization(reason)) => {
            assert!(reason.contains("Page 1"), "{}", reason);
            assert!(reason.contains("no scan image"), "{}", reason);
        }
        other => panic!("expected a rasterization error, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn test_pdfium_renders_vector_content() {
    let Ok(rasterizer) = PdfiumRasterizer::new() else {
        eprintln!("PDFium library not available; skipping");
        return;
    };

    let file = temp_file(&vector_pdf(), "pdf");
    let pages = rasterizer.rasterize(file.path(), 72).unwrap();
    assert_eq!(pages.len(), 1);

    let page = pages[0].to_luma8();
    assert_eq!(page.dimensions(), (200, 200));
    assert!(page.get_pixel(100, 100).0[0] < 64, "square should be drawn");
    assert!(page.get_pixel(5, 5).0[0] > 192, "margin should stay white");
}
