use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process;

use scad_docsgen_config::{MDIMGGEN_RC_FILE, MdImgGenSettings, expand_patterns};
use scad_docsgen_engine::{BuildPipeline, MarkdownImageGen, OpenScadRenderer};

/// Render the OpenSCAD scripts in markdown files and insert the images.
#[derive(Debug, Parser)]
#[command(name = "scad-mdimggen", version)]
struct Cli {
    /// The directory to put the converted markdown files in.
    #[arg(short = 'D', long)]
    docs_dir: Option<PathBuf>,

    /// Prefix added to each output file name.
    #[arg(short = 'P', long)]
    file_prefix: Option<String>,

    /// Don't generate images, but do try executing the scripts.
    #[arg(short = 'T', long)]
    test_only: bool,

    /// The directory to put images in, relative to the docs directory.
    #[arg(short = 'I', long)]
    image_root: Option<String>,

    /// Force regeneration of images.
    #[arg(short, long)]
    force: bool,

    /// Write animations as animated PNGs instead of GIFs.
    #[arg(short = 'a', long)]
    png_animation: bool,

    /// Suppress printing of progress data.
    #[arg(short, long)]
    quiet: bool,

    /// Log debugging detail.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Markdown files or glob patterns. Defaults to `source_files` in the rc file.
    srcfiles: Vec<String>,
}

impl Cli {
    fn apply(&self, settings: &mut MdImgGenSettings) {
        if let Some(dir) = &self.docs_dir {
            settings.docs_dir = dir.clone();
        }
        if let Some(prefix) = &self.file_prefix {
            settings.file_prefix = prefix.clone();
        }
        if let Some(root) = &self.image_root {
            settings.image_root = root.clone();
        }
        settings.test_only |= self.test_only;
        settings.force |= self.force;
        settings.png_animation |= self.png_animation;
    }

    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    /// Files named on the command line, else those the rc file lists.
    fn source_files(&self, settings: &MdImgGenSettings) -> Result<Vec<PathBuf>> {
        let patterns = if self.srcfiles.is_empty() {
            settings.source_patterns()
        } else {
            self.srcfiles.clone()
        };
        Ok(expand_patterns(&patterns)?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut settings = MdImgGenSettings::load(Path::new(MDIMGGEN_RC_FILE))
        .with_context(|| format!("Failed to read {MDIMGGEN_RC_FILE}"))?;
    cli.apply(&mut settings);

    let files = cli.source_files(&settings)?;
    if files.is_empty() {
        eprintln!("No files to parse.  Aborting.");
        process::exit(1);
    }

    let renderer = OpenScadRenderer::locate().context("Rendering markdown images needs OpenSCAD")?;
    let mut pipeline = BuildPipeline::new(Box::new(renderer));
    let mut generator = MarkdownImageGen::new(settings);
    let summary = generator.process_files(&files, Some(&mut pipeline))?;
    log::info!(
        "{} files written; images: {} new, {} replaced, {} unchanged, {} failed",
        summary.pages.len(),
        summary.new,
        summary.replaced,
        summary.skipped,
        summary.failed
    );

    if generator.has_errors() {
        eprintln!("WARNING: Errors encountered.");
        process::exit(1);
    }
    Ok(())
}
