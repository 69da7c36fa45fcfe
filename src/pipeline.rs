use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{error, info};

use crate::checks::bibliography::{check_references, NameCheck, NameCheckStatus};
use crate::checks::fonts::check_font;
use crate::checks::name_check::{NameCheckConfig, ReferenceNormalizer};
use crate::checks::page_budget::check_page_limit;
use crate::checks::page_geometry::PageGeometryChecker;
use crate::checks::CheckSession;
use crate::core::config::{CheckConfig, PaperType};
use crate::core::model::Violation;
use crate::core::report::CheckReport;
use crate::export::{ConsoleExporter, Exporter, JsonExporter};
use crate::parser::{LopdfBackend, PdfBackend};
use crate::render::{PopplerRasterizer, Rasterizer};

/// Per-run settings that do not change the checking rules.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub paper_type: PaperType,
    pub output_dir: PathBuf,
    pub print_only_errors: bool,
    pub name_check: Option<NameCheckConfig>,
}

impl CheckOptions {
    pub fn new(paper_type: PaperType, output_dir: PathBuf) -> Self {
        Self {
            paper_type,
            output_dir,
            print_only_errors: false,
            name_check: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub submission_id: String,
    pub report: CheckReport,
    pub violations: Vec<Violation>,
    pub name_check: NameCheckStatus,
}

pub struct FormatChecker {
    config: CheckConfig,
    backend: Box<dyn PdfBackend>,
    rasterizer: Box<dyn Rasterizer>,
    normalizer: Option<Box<dyn ReferenceNormalizer>>,
}

impl FormatChecker {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            config,
            backend: Box::new(LopdfBackend::new()),
            rasterizer: Box::new(PopplerRasterizer::new()),
            normalizer: None,
        }
    }

    pub fn with_backend(mut self, backend: impl PdfBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl ReferenceNormalizer + 'static) -> Self {
        self.normalizer = Some(Box::new(normalizer));
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Runs every check on one PDF: size, margins, page limit, font, references.
    pub fn check(&self, pdf_path: &Path, options: &CheckOptions) -> Result<CheckOutcome> {
        info!(pdf = %pdf_path.display(), "checking submission");
        let doc = self
            .backend
            .load(pdf_path)
            .with_context(|| format!("failed to load {}", pdf_path.display()))?;

        fs::create_dir_all(&options.output_dir)
            .with_context(|| format!("failed to create {}", options.output_dir.display()))?;
        let mut session = CheckSession::new(pdf_path, &options.output_dir);

        let geometry = PageGeometryChecker::new(&self.config, self.rasterizer.as_ref());
        let violations = geometry.run(&doc, &mut session);
        check_page_limit(&doc, options.paper_type, &mut session);
        check_font(&doc, &self.config, &mut session);

        let name_check = match options.name_check {
            None => NameCheck::Disabled,
            Some(config) => NameCheck::Enabled {
                normalizer: self.normalizer.as_deref(),
                config,
            },
        };
        let name_check = check_references(&doc, &self.config, &name_check, &mut session);

        let submission_id = session.submission_id.clone();
        let report = session.into_report();
        info!(
            submission = %submission_id,
            errors = report.errors,
            warnings = report.warnings,
            "check finished"
        );
        Ok(CheckOutcome {
            submission_id,
            report,
            violations,
            name_check,
        })
    }

    /// Checks one PDF, writes its JSON log and prints the summary.
    pub fn check_and_export(&self, pdf_path: &Path, options: &CheckOptions) -> Result<CheckOutcome> {
        let outcome = self.check(pdf_path, options)?;
        JsonExporter::new(options.output_dir.clone(), options.print_only_errors)
            .export(&outcome.submission_id, &outcome.report)?;
        ConsoleExporter {
            name_check: outcome.name_check,
        }
        .export(&outcome.submission_id, &outcome.report)?;
        Ok(outcome)
    }

    /// Checks documents in parallel on `num_workers` threads. Results come
    /// back in input order.
    pub fn check_batch(
        &self,
        pdfs: &[PathBuf],
        options: &CheckOptions,
        num_workers: usize,
    ) -> Result<Vec<(PathBuf, Result<CheckOutcome>)>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_workers.max(1))
            .build()
            .context("failed to build worker pool")?;

        let results = pool.install(|| {
            pdfs.par_iter()
                .map(|pdf| {
                    let result = self.check_and_export(pdf, options);
                    if let Err(err) = &result {
                        error!(pdf = %pdf.display(), error = %format!("{err:#}"), "check failed");
                    }
                    (pdf.clone(), result)
                })
                .collect()
        });
        Ok(results)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "pdf")
}

/// Expands directories recursively to the `.pdf` files they contain. The
/// result is sorted and free of duplicates.
pub fn collect_pdfs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_pdfs(path, &mut pdfs)?;
        } else if path.is_file() {
            if is_pdf(path) {
                pdfs.push(path.clone());
            }
        } else {
            anyhow::bail!("input does not exist: {}", path.display());
        }
    }
    pdfs.sort();
    pdfs.dedup();
    Ok(pdfs)
}

fn walk_pdfs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk_pdfs(&path, out)?;
        } else if is_pdf(&path) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::{Char, Document, Page, PageContent};
    use crate::core::report::Category;
    use image::{Rgb, RgbImage};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_output_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let pid = std::process::id();
        out.push(format!("{prefix}-{pid}-{now}"));
        out
    }

    /// Serves a prepared document for any path.
    struct StaticBackend(Document);

    impl PdfBackend for StaticBackend {
        fn load(&self, _pdf_path: &Path) -> Result<Document> {
            Ok(self.0.clone())
        }
    }

    struct BlankRasterizer;

    impl Rasterizer for BlankRasterizer {
        fn render_page(&self, _pdf: &Path, _page: usize, _dpi: u32) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])))
        }

        fn render_region(&self, _pdf: &Path, _page: usize, _region: &BBox, _dpi: u32) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(2, 2, Rgb([255, 255, 255])))
        }
    }

    fn clean_page(width: f64) -> Page {
        let chars = (0..20)
            .map(|i| Char {
                text: "a".into(),
                bbox: BBox::new(100.0 + i as f64 * 5.0, 100.0, 105.0 + i as f64 * 5.0, 110.0),
                fontname: "NimbusRomNo9L-Regu".into(),
                size: 10.0,
                fill: None,
                stroke: None,
            })
            .collect();
        Page {
            number: 1,
            width,
            height: 842.0,
            content: Ok(PageContent {
                chars,
                lines: vec!["References".into()],
                hyperlinks: (0..5).map(|i| format!("https://doi.org/10.1/{i}")).collect(),
                ..Default::default()
            }),
        }
    }

    fn checker(page: Page) -> FormatChecker {
        let doc = Document {
            path: "11_Paper.pdf".into(),
            pages: vec![page],
        };
        FormatChecker::new(CheckConfig::default())
            .with_backend(StaticBackend(doc))
            .with_rasterizer(BlankRasterizer)
    }

    #[test]
    fn clean_document_is_correct() -> Result<()> {
        let output = temp_output_dir("papercheck-pipeline");
        let options = CheckOptions::new(PaperType::Other, output.clone());
        let outcome = checker(clean_page(595.0)).check(Path::new("11_Paper.pdf"), &options)?;

        assert_eq!(outcome.submission_id, "11");
        assert!(outcome.report.correct);
        assert!(outcome.report.is_empty());
        assert_eq!(outcome.name_check, NameCheckStatus::NotRequested);
        let _ = fs::remove_dir_all(output);
        Ok(())
    }

    #[test]
    fn wrong_size_page_is_excluded_everywhere() -> Result<()> {
        let output = temp_output_dir("papercheck-pipeline-size");
        let options = CheckOptions::new(PaperType::Other, output.clone());
        let outcome = checker(clean_page(612.0)).check(Path::new("11_Paper.pdf"), &options)?;

        assert!(!outcome.report.correct);
        assert_eq!(outcome.report.messages(Category::Size), ["Page #1 is not A4."]);
        // The only page is excluded, so no font was seen at all.
        assert_eq!(outcome.report.messages(Category::Font), ["Can't find the main font"]);
        let _ = fs::remove_dir_all(output);
        Ok(())
    }

    #[test]
    fn name_check_without_normalizer_is_skipped() -> Result<()> {
        let output = temp_output_dir("papercheck-pipeline-names");
        let mut options = CheckOptions::new(PaperType::Other, output.clone());
        options.name_check = Some(NameCheckConfig::default());
        let outcome = checker(clean_page(595.0)).check(Path::new("11_Paper.pdf"), &options)?;
        assert_eq!(outcome.name_check, NameCheckStatus::Skipped);
        assert!(outcome.report.correct);
        let _ = fs::remove_dir_all(output);
        Ok(())
    }

    #[test]
    fn batch_writes_one_log_per_document() -> Result<()> {
        let output = temp_output_dir("papercheck-batch");
        let options = CheckOptions::new(PaperType::Other, output.clone());
        let pdfs = vec![PathBuf::from("21_Paper.pdf"), PathBuf::from("22_Paper.pdf")];
        let results = checker(clean_page(595.0)).check_batch(&pdfs, &options, 2)?;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, pdfs[0]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(output.join("errors-21.json").exists());
        assert!(output.join("errors-22.json").exists());
        let _ = fs::remove_dir_all(output);
        Ok(())
    }

    #[test]
    fn collects_pdfs_recursively() -> Result<()> {
        let root = temp_output_dir("papercheck-collect");
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("1_Paper.pdf"), b"%PDF")?;
        fs::write(root.join("notes.txt"), b"x")?;
        fs::write(root.join("nested").join("2_Paper.pdf"), b"%PDF")?;

        let found = collect_pdfs(&[root.clone(), root.join("1_Paper.pdf"), root.join("notes.txt")])?;
        assert_eq!(found, vec![root.join("1_Paper.pdf"), root.join("nested").join("2_Paper.pdf")]);
        assert!(collect_pdfs(&[root.join("missing.pdf")]).is_err());
        let _ = fs::remove_dir_all(root);
        Ok(())
    }
}
