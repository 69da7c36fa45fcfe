use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use image::{Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use papercheck::camera_ready::{run_camera_ready, CameraReadyOptions, PaperTypeChoice};
use papercheck::core::geometry::BBox;
use papercheck::core::model::MarginSide;
use papercheck::parser::{LopdfBackend, PdfBackend};
use papercheck::render::Rasterizer;
use papercheck::{Category, CheckConfig, CheckOptions, FormatChecker, PaperType};

fn temp_output_dir(prefix: &str) -> PathBuf {
    let mut out = std::env::temp_dir();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let pid = std::process::id();
    out.push(format!("{prefix}-{pid}-{now}"));
    fs::create_dir_all(&out).unwrap();
    out
}

/// Renders every region in one gray level so tests control visibility.
struct FlatRasterizer {
    region_gray: u8,
}

impl Rasterizer for FlatRasterizer {
    fn render_page(&self, _pdf: &Path, _page: usize, _dpi: u32) -> Result<RgbImage> {
        Ok(RgbImage::from_pixel(120, 170, Rgb([255, 255, 255])))
    }

    fn render_region(&self, _pdf: &Path, _page: usize, _region: &BBox, _dpi: u32) -> Result<RgbImage> {
        let g = self.region_gray;
        Ok(RgbImage::from_pixel(4, 4, Rgb([g, g, g])))
    }
}

const BODY: &str = "BT /F1 10 Tf 100 700 Td (A well formatted paper body) Tj ET\n\
                    BT /F1 10 Tf 100 600 Td (References) Tj ET\n";

const RED_OVERFLOW: &str = "1 0 0 rg BT /F1 10 Tf 560 400 Td (Overflow) Tj ET\n";

/// One-page PDF with a Times font, a references heading and five DOI links.
fn build_pdf(width: i64, height: i64, content: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "NimbusRomNo9L-Regu",
    });
    let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.as_bytes().to_vec()));
    let links: Vec<Object> = (0..5i64)
        .map(|i| {
            Object::from(doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![100.into(), (500 - i * 20).into(), 300.into(), (510 - i * 20).into()],
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(format!("https://doi.org/10.18653/v1/2024.main.{i}")),
                },
            }))
        })
        .collect();

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "Annots" => links,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

fn write_pdf(dir: &Path, name: &str, width: i64, height: i64, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_pdf(width, height, content)).unwrap();
    path
}

fn checker(region_gray: u8) -> FormatChecker {
    FormatChecker::new(CheckConfig::default()).with_rasterizer(FlatRasterizer { region_gray })
}

#[test]
fn extracts_text_fonts_and_links() -> Result<()> {
    let dir = temp_output_dir("papercheck-extract");
    let pdf = write_pdf(&dir, "1_Paper.pdf", 595, 842, BODY);

    let doc = LopdfBackend::new().load(&pdf)?;
    assert_eq!(doc.page_count(), 1);
    let page = &doc.pages[0];
    assert_eq!((page.width, page.height), (595.0, 842.0));

    let content = page.content.as_ref().expect("page parses");
    assert_eq!(content.lines, vec!["A well formatted paper body", "References"]);
    assert_eq!(content.hyperlinks.len(), 5);
    assert!(content.chars.iter().all(|c| c.fontname == "NimbusRomNo9L-Regu"));
    assert!(content.images.is_empty());

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn clean_paper_is_all_clear() -> Result<()> {
    let dir = temp_output_dir("papercheck-clean");
    let pdf = write_pdf(&dir, "31_Paper.pdf", 595, 842, BODY);
    let options = CheckOptions::new(PaperType::Other, dir.clone());

    let outcome = checker(0).check_and_export(&pdf, &options)?;

    assert_eq!(outcome.submission_id, "31");
    assert!(outcome.report.correct);
    assert!(outcome.report.is_empty(), "unexpected findings: {:?}", outcome.report.findings);
    assert_eq!(fs::read_to_string(dir.join("errors-31.json"))?, "{}");

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn letter_page_is_wrong_size_and_excluded() -> Result<()> {
    let dir = temp_output_dir("papercheck-letter");
    let pdf = write_pdf(&dir, "32_Paper.pdf", 612, 792, &format!("{BODY}{RED_OVERFLOW}"));
    let options = CheckOptions::new(PaperType::Other, dir.clone());

    let outcome = checker(0).check(&pdf, &options)?;

    assert!(!outcome.report.correct);
    assert_eq!(outcome.report.messages(Category::Size), ["Page #1 is not A4."]);
    // An excluded page is never scanned for margins or fonts.
    assert!(outcome.violations.is_empty());
    assert!(outcome.report.messages(Category::Margin).is_empty());
    assert_eq!(outcome.report.messages(Category::Font), ["Can't find the main font"]);

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn colored_text_in_right_margin_is_reported_and_drawn() -> Result<()> {
    let dir = temp_output_dir("papercheck-margin");
    let pdf = write_pdf(&dir, "33_Paper.pdf", 595, 842, &format!("{BODY}{RED_OVERFLOW}"));
    let options = CheckOptions::new(PaperType::Other, dir.clone());

    let outcome = checker(0).check(&pdf, &options)?;

    assert_eq!(outcome.violations.len(), 1);
    let violation = &outcome.violations[0];
    assert_eq!(violation.side, MarginSide::Right);
    assert_eq!(violation.glyph.text.as_deref(), Some("Overflow"));
    assert_eq!(violation.region.x1, 595.0);
    assert_eq!(
        outcome.report.messages(Category::Margin),
        ["Text on page 1 bleeds into the right margin."]
    );
    assert!(!outcome.report.correct);
    assert!(dir.join("errors-33-page-1.png").exists());

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn overflow_matching_background_is_ignored() -> Result<()> {
    let dir = temp_output_dir("papercheck-background");
    let pdf = write_pdf(&dir, "34_Paper.pdf", 595, 842, &format!("{BODY}{RED_OVERFLOW}"));
    let options = CheckOptions::new(PaperType::Other, dir.clone());

    let outcome = checker(255).check(&pdf, &options)?;

    assert!(outcome.violations.is_empty());
    assert!(outcome.report.correct);
    assert!(!dir.join("errors-34-page-1.png").exists());

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn camera_ready_batch_writes_tsv() -> Result<()> {
    let dir = temp_output_dir("papercheck-camera-ready");
    write_pdf(&dir, "41.pdf", 595, 842, BODY);
    write_pdf(&dir, "42.pdf", 595, 842, &format!("{BODY}{RED_OVERFLOW}"));
    let manifest = dir.join("papers.yaml");
    fs::write(
        &manifest,
        "- id: 41\n  file: 41.pdf\n  title: Clean\n  authors:\n    - name: Mary Smith\n      emails: mary@example.org\n  attributes:\n    paper_type: long\n\
         - id: 42\n  file: 42.pdf\n  title: Overflowing\n  authors:\n    - name: Li Wei\n      emails: li@example.org\n    - name: Ann Lee\n      emails: ann@example.org\n",
    )?;
    let options = CameraReadyOptions {
        papers_yaml: manifest,
        papers_dir: dir.clone(),
        paper_type: PaperTypeChoice::Auto,
        output_file: dir.join("output.tsv"),
        output_dir: dir.clone(),
    };

    let checker = FormatChecker::new(CheckConfig::camera_ready()).with_rasterizer(FlatRasterizer { region_gray: 0 });
    let summary = run_camera_ready(&checker, &options)?;
    assert_eq!((summary.checked, summary.failed), (2, 1));

    let tsv = fs::read_to_string(dir.join("output.tsv"))?;
    let rows: Vec<&str> = tsv.lines().collect();
    assert_eq!(rows[0], "correct\tid\tfile\ttitle\tauthors\temails\tlogs");
    assert_eq!(rows[1], "True\t41\t41.pdf\tClean\tMary Smith\tmary@example.org\t{}");
    assert!(rows[2].starts_with("False\t42\t42.pdf\tOverflowing\tLi Wei;Ann Lee\tli@example.org;ann@example.org\t"));
    assert!(rows[2].contains("bleeds into the right margin"));

    // Only papers with errors keep a log.
    assert!(!dir.join("errors-41.json").exists());
    assert!(dir.join("errors-42.json").exists());

    let _ = fs::remove_dir_all(dir);
    Ok(())
}
