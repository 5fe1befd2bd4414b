use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bulk_exif::config::EditSet;
use bulk_exif::exif::{self, EditOutcome, TagDictionary};
use bulk_exif::pipeline::{self, EditOptions, EditReport};

#[derive(Parser, Debug)]
#[command(
    name = "bulk-exif",
    version,
    about = "Bulk read and edit EXIF metadata of JPEG, TIFF, and WebP images"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of images processed in parallel (default: number of CPUs)
    #[arg(short, long, global = true, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the EXIF data of every image under a directory
    Read {
        /// Directory to scan recursively
        images_dir: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply the fields of an edit file to every image under a directory
    Edit {
        /// Directory to scan recursively
        images_dir: PathBuf,

        /// YAML file with an `exif:` mapping of field names to values
        #[arg(short = 'E', long = "exif-data", value_name = "FILE")]
        exif_data: PathBuf,

        /// Preview changes without writing to files
        #[arg(long)]
        dry_run: bool,

        /// Keep a `.bak` copy of each image before rewriting it
        #[arg(long)]
        backup: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let jobs = cli.jobs.unwrap_or_else(default_jobs);

    match cli.command {
        Command::Read { images_dir, json } => read(&images_dir, jobs, json).await,
        Command::Edit {
            images_dir,
            exif_data,
            dry_run,
            backup,
        } => {
            let options = EditOptions { dry_run, backup };
            edit(&images_dir, &exif_data, jobs, options).await
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Collect images, refusing anything that is not a directory.
fn images_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let images = pipeline::collect_images(dir);
    log::info!("Found {} image(s) under {}", images.len(), dir.display());
    Ok(images)
}

async fn read(dir: &Path, jobs: usize, json: bool) -> Result<()> {
    let images = images_in(dir)?;
    let dict = TagDictionary::standard();

    let mut json_results = Vec::new();
    pipeline::run_batch(images, jobs, pipeline::read_image, |path, block| {
        if json {
            json_results.push(serde_json::json!({
                "path": path.display().to_string(),
                "exif": exif::render_json(&block, &dict),
            }));
        } else {
            print!("{}", exif::render_report(path, &block, &dict));
        }
    })
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }
    Ok(())
}

async fn edit(dir: &Path, exif_data: &Path, jobs: usize, options: EditOptions) -> Result<()> {
    let images = images_in(dir)?;
    let edits = Arc::new(EditSet::load(exif_data)?);
    let dict = Arc::new(TagDictionary::standard());

    if edits.is_empty() {
        log::warn!("{} has no fields to apply", exif_data.display());
    }
    if options.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    pipeline::run_batch(
        images,
        jobs,
        move |path: &Path| pipeline::edit_image(path, &edits, &dict, options),
        |_, report| {
            if options.dry_run {
                print_preview(&report);
            }
        },
    )
    .await;

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print what a dry run would change in one image.
fn print_preview(report: &EditReport) {
    println!("{BOLD}{}{RESET}", report.path.display());
    for outcome in &report.outcomes {
        let tag_col = format!("{:<22}", outcome.name());
        match outcome {
            EditOutcome::Applied { ifd, tag, .. } => {
                println!("  {GREEN}{tag_col} : {ifd} 0x{tag:04x} *{RESET}");
            }
            other => {
                let reason = other.error().map(|e| e.to_string()).unwrap_or_default();
                println!("  {DIM}{tag_col} : skipped, {reason}{RESET}");
            }
        }
    }
    println!();
}
