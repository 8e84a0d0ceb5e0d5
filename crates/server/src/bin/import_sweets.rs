//! Import sweet profiles and photos from a folder-per-location source tree.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use db::DBService;
use services::services::sweet_import::{
    ImportOptions, SweetImporter,
    ocr::{DEFAULT_OCR_LANGUAGES, ImageTextReader, TesseractCli},
};
use tracing::info;
use utils::logging::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "import-sweets", about = "Import sweet profiles into the database")]
struct Args {
    /// Directory with one subdirectory per location
    #[arg(long)]
    source_dir: PathBuf,

    /// Where matched photos are copied
    #[arg(long, default_value = "public/sweets")]
    public_dir: PathBuf,

    /// Parse and report without writing rows or copying files
    #[arg(long)]
    dry_run: bool,

    /// Fall back to OCR when a photo's file name does not identify it
    #[arg(long)]
    ocr: bool,

    /// Tesseract languages used with --ocr
    #[arg(long, default_value = DEFAULT_OCR_LANGUAGES)]
    ocr_languages: String,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://nightdesk.db")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");
    let args = Args::parse();

    let db = DBService::new(&args.database_url)
        .await
        .with_context(|| format!("failed to open {}", args.database_url))?;
    let tesseract = if args.ocr {
        TesseractCli::detect("tesseract", args.ocr_languages.clone()).await
    } else {
        None
    };
    let ocr = tesseract.as_ref().map(|t| t as &dyn ImageTextReader);

    let options = ImportOptions {
        source_dir: args.source_dir,
        public_dir: args.public_dir,
        dry_run: args.dry_run,
    };
    let report = SweetImporter::new(&db.pool, ocr).run(&options).await?;

    info!(
        imported = report.imported.len(),
        unmatched = report.unmatched.len(),
        dry_run = options.dry_run,
        "Import finished"
    );
    println!("Imported {} profiles:", report.imported.len());
    for name in &report.imported {
        println!("  {name}");
    }
    if !report.unmatched.is_empty() {
        println!("Without photo ({}):", report.unmatched.len());
        for name in &report.unmatched {
            println!("  {name}");
        }
    }
    if !report.skipped_locations.is_empty() {
        println!("Skipped locations: {}", report.skipped_locations.join(", "));
    }
    Ok(())
}
