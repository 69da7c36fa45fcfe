use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use papercheck::camera_ready::{run_camera_ready, CameraReadyOptions, PaperTypeChoice};
use papercheck::checks::name_check::NameCheckConfig;
use papercheck::metadata::{check_metadata, read_submissions, write_signatures};
use papercheck::parser::{LopdfBackend, PdfReader};
use papercheck::pipeline::collect_pdfs;
use papercheck::{CheckConfig, CheckOptions, FormatChecker, PaperType};

#[derive(Parser, Debug)]
#[command(name = "papercheck")]
#[command(version, about = "Format checker for conference paper PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check page size, margins, page limit, fonts and references
    Check {
        /// PDF files or directories to search recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long = "paper_type", value_enum, default_value_t = PaperTypeArg::Long)]
        paper_type: PaperTypeArg,

        /// Number of documents checked in parallel
        #[arg(long = "num_workers", default_value_t = 1)]
        num_workers: usize,

        /// Directory for JSON logs and annotated pages
        #[arg(long = "output_dir", default_value = ".")]
        output_dir: PathBuf,

        /// Only write logs for papers with errors
        #[arg(long = "print_only_errors")]
        print_only_errors: bool,

        /// Compare cited author names against a normalization service
        #[arg(long = "name_check")]
        name_check: bool,

        /// Include expected and cited names in name-check warnings
        #[arg(long = "show_names", requires = "name_check")]
        show_names: bool,
    },

    /// Cross-check submission metadata against the first page of each PDF
    Metadata {
        #[arg(long, default_value = "Submission_Information.csv")]
        submissions: PathBuf,

        /// Directory holding `{id}_Paper.pdf` files
        #[arg(long, default_value = "final")]
        pdfs: PathBuf,
    },

    /// Write all copyright signatures to one text file
    Signatures {
        #[arg(long, default_value = "Submission_Information.csv")]
        submissions: PathBuf,

        #[arg(long, default_value = "copyright-signatures.txt")]
        output: PathBuf,
    },

    /// Check every paper of a proceedings papers.yaml and write a TSV summary
    CameraReady {
        #[arg(long = "papers_dir", default_value = ".")]
        papers_dir: PathBuf,

        #[arg(long = "paper_type", value_enum, default_value_t = CameraReadyTypeArg::Long)]
        paper_type: CameraReadyTypeArg,

        #[arg(long = "papers_yaml_path", default_value = "papers.yaml")]
        papers_yaml_path: PathBuf,

        #[arg(long = "output_file", default_value = "output.tsv")]
        output_file: PathBuf,

        #[arg(long = "output_dir", default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show information about a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum PaperTypeArg {
    Short,
    Long,
    Other,
}

impl From<PaperTypeArg> for PaperType {
    fn from(arg: PaperTypeArg) -> Self {
        match arg {
            PaperTypeArg::Short => PaperType::Short,
            PaperTypeArg::Long => PaperType::Long,
            PaperTypeArg::Other => PaperType::Other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum CameraReadyTypeArg {
    Short,
    Long,
    Other,
    /// Use each paper's declared type
    Auto,
}

impl From<CameraReadyTypeArg> for PaperTypeChoice {
    fn from(arg: CameraReadyTypeArg) -> Self {
        match arg {
            CameraReadyTypeArg::Short => PaperTypeChoice::Fixed(PaperType::Short),
            CameraReadyTypeArg::Long => PaperTypeChoice::Fixed(PaperType::Long),
            CameraReadyTypeArg::Other => PaperTypeChoice::Fixed(PaperType::Other),
            CameraReadyTypeArg::Auto => PaperTypeChoice::Auto,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("papercheck=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            paths,
            paper_type,
            num_workers,
            output_dir,
            print_only_errors,
            name_check,
            show_names,
        } => {
            let mut options = CheckOptions::new(paper_type.into(), output_dir);
            options.print_only_errors = print_only_errors;
            options.name_check = name_check.then(|| NameCheckConfig {
                show_names,
                ..Default::default()
            });
            check_papers(paths, &options, num_workers)
        }
        Commands::Metadata { submissions, pdfs } => check_submission_metadata(submissions, pdfs),
        Commands::Signatures { submissions, output } => export_signatures(submissions, output),
        Commands::CameraReady {
            papers_dir,
            paper_type,
            papers_yaml_path,
            output_file,
            output_dir,
        } => check_camera_ready(CameraReadyOptions {
            papers_yaml: papers_yaml_path,
            papers_dir,
            paper_type: paper_type.into(),
            output_file,
            output_dir,
        }),
        Commands::Info { input } => show_info(input),
    }
}

fn check_papers(paths: Vec<PathBuf>, options: &CheckOptions, num_workers: usize) -> Result<()> {
    let pdfs = collect_pdfs(&paths)?;
    if pdfs.is_empty() {
        println!("No PDF files found in {paths:?}");
        return Ok(());
    }

    println!("[*] Checking {} file(s) as {} papers", pdfs.len(), options.paper_type);
    println!("[*] Output: {}\n", options.output_dir.display());

    let checker = FormatChecker::new(CheckConfig::default());
    let results = checker.check_batch(&pdfs, options, num_workers)?;

    let mut failed = 0;
    for (pdf, result) in &results {
        if let Err(e) = result {
            eprintln!("  [✗] {}: {e:#}", pdf.display());
            failed += 1;
        }
    }

    println!("\n[*] Summary: {} checked, {} failed", results.len() - failed, failed);
    if failed > 0 {
        anyhow::bail!("{} file(s) could not be checked", failed);
    }
    Ok(())
}

fn check_submission_metadata(submissions: PathBuf, pdfs: PathBuf) -> Result<()> {
    let records = read_submissions(&submissions)?;
    let report = check_metadata(&records, &pdfs, &LopdfBackend::new())?;
    print!("{}", report.render());
    Ok(())
}

fn export_signatures(submissions: PathBuf, output: PathBuf) -> Result<()> {
    let records = read_submissions(&submissions)?;
    write_signatures(&records, &output)?;
    println!("[✓] Wrote {} signature(s) to {}", records.len(), output.display());
    Ok(())
}

fn check_camera_ready(options: CameraReadyOptions) -> Result<()> {
    let checker = FormatChecker::new(CheckConfig::camera_ready());
    let summary = run_camera_ready(&checker, &options)?;
    println!(
        "\n[*] Summary: {} paper(s) checked, {} with errors. See {}",
        summary.checked,
        summary.failed,
        options.output_file.display()
    );
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let reader = PdfReader::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", reader.page_count());
    for page_idx in 0..reader.page_count() {
        match reader.page_frame(page_idx) {
            Ok(frame) => println!("  Page {}: {:.1} x {:.1} pt", page_idx + 1, frame.width, frame.height),
            Err(e) => println!("  Page {}: {e}", page_idx + 1),
        }
    }

    Ok(())
}
