use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::{fs, process};

use scad_docsgen_config::{Settings, expand_patterns};
use scad_docsgen_engine::{BuildPipeline, DocsGen, OpenScadRenderer, RC_FILE, RunSummary, TargetRegistry};

/// Generate documentation pages and example images from OpenSCAD source comments.
#[derive(Debug, Parser)]
#[command(name = "scad-docsgen", version)]
struct Cli {
    /// The directory to put generated documentation in.
    #[arg(short = 'D', long)]
    docs_dir: Option<PathBuf>,

    /// Don't generate images, but do try executing the scripts.
    #[arg(short = 'T', long)]
    test_only: bool,

    /// Suppress printing of progress data.
    #[arg(short, long)]
    quiet: bool,

    /// Require File/LibFile and Section headers.
    #[arg(short = 'S', long)]
    strict: bool,

    /// Force regeneration of images.
    #[arg(short, long)]
    force: bool,

    /// Skip image generation.
    #[arg(short, long)]
    no_images: bool,

    /// Generate documents for each source file.
    #[arg(short = 'm', long)]
    gen_files: bool,

    /// Generate the table of contents page.
    #[arg(short = 't', long)]
    gen_toc: bool,

    /// Generate the alphabetical index page.
    #[arg(short = 'i', long)]
    gen_index: bool,

    /// Generate the topics index page.
    #[arg(short = 'I', long)]
    gen_topics: bool,

    /// Generate the cheat sheet page with all Usage lines.
    #[arg(short = 'c', long)]
    gen_cheat: bool,

    /// Generate the _Sidebar file index page.
    #[arg(short = 's', long)]
    gen_sidebar: bool,

    /// Write animations as animated PNGs instead of GIFs.
    #[arg(short = 'a', long)]
    png_animation: bool,

    /// The name of the project to be shown in titles.
    #[arg(short = 'P', long)]
    project_name: Option<String>,

    /// Write all warnings and errors to docsgen_report.json.
    #[arg(short, long)]
    report: bool,

    /// Dump the documentation tree for debugging.
    #[arg(short, long)]
    dump_tree: bool,

    /// Dump the documentation tree as JSON.
    #[arg(long)]
    dump_json: bool,

    /// The output target profile.
    #[arg(short = 'p', long, value_parser = known_profile)]
    target_profile: Option<String>,

    /// Log debugging detail.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Input source files or glob patterns. Defaults to `*.scad`.
    srcfiles: Vec<String>,
}

fn known_profile(name: &str) -> Result<String, String> {
    let registry = TargetRegistry::with_defaults();
    if registry.contains(name) {
        Ok(name.to_string())
    } else {
        Err(format!("expected one of: {}", registry.names().join(", ")))
    }
}

impl Cli {
    /// Applies the flags on top of the user-level settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.docs_dir {
            settings.set_docs_dir(dir.clone());
        }
        if let Some(name) = &self.project_name {
            settings.project_name = Some(name.clone());
        }
        if let Some(profile) = &self.target_profile {
            settings.target_profile = profile.clone();
        }
        settings.quiet |= self.quiet;
        settings.strict |= self.strict;
        settings.force |= self.force;
        settings.test_only |= self.test_only;
        settings.report |= self.report;
        settings.png_animation |= self.png_animation;
        if self.no_images {
            settings.gen_images = false;
        }
        settings.generate.files |= self.gen_files;
        settings.generate.toc |= self.gen_toc;
        settings.generate.index |= self.gen_index;
        settings.generate.topics |= self.gen_topics;
        settings.generate.cheat |= self.gen_cheat;
        settings.generate.sidebar |= self.gen_sidebar;
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
}

/// Problems that make a source unusable, one message per file.
fn check_sources(files: &[PathBuf]) -> Vec<String> {
    let mut problems = Vec::new();
    for file in files {
        match fs::metadata(file) {
            Err(_) => problems.push(format!("{} does not exist.", file.display())),
            Ok(meta) if !meta.is_file() => problems.push(format!("{} is not a file.", file.display())),
            Ok(_) => {
                if fs::File::open(file).is_err() {
                    problems.push(format!("{} is not readable.", file.display()));
                }
            }
        }
    }
    problems
}

fn print_summary(summary: &RunSummary) {
    log::info!(
        "{} pages written; images: {} new, {} replaced, {} unchanged, {} failed",
        summary.pages.len(),
        summary.new,
        summary.replaced,
        summary.skipped,
        summary.failed
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut settings = Settings::load().with_context(|| {
        format!(
            "Failed to load config file at {}",
            Settings::config_path().display()
        )
    })?;
    cli.apply(&mut settings);

    let mut docs = DocsGen::new(settings);
    docs.load_rc(Path::new(RC_FILE))
        .with_context(|| format!("Failed to read {RC_FILE}"))?;

    let patterns: Vec<&str> = if cli.srcfiles.is_empty() {
        vec!["*.scad"]
    } else {
        cli.srcfiles.iter().map(String::as_str).collect()
    };
    let mut files = expand_patterns(&patterns)?;
    // Literal names that matched nothing are kept so the checks report them.
    for pattern in &patterns {
        let path = PathBuf::from(pattern);
        if !pattern.contains(['*', '?', '[']) && !files.contains(&path) {
            files.push(path);
        }
    }
    let problems = check_sources(&files);
    if !problems.is_empty() {
        for problem in problems {
            eprintln!("{problem}");
        }
        process::exit(1);
    }

    docs.parse_files(&files);

    if cli.dump_tree {
        for line in docs.dump_tree() {
            println!("{line}");
        }
    }
    if cli.dump_json {
        println!("{}", docs.dump_json()?);
    }

    let settings = docs.settings().clone();
    let wants_renderer =
        settings.test_only || (settings.generate.files && settings.gen_images);
    let mut pipeline = if wants_renderer {
        let renderer = OpenScadRenderer::locate()
            .context("Image generation needs OpenSCAD; pass --no-images to skip it")?;
        Some(BuildPipeline::new(Box::new(renderer)))
    } else {
        None
    };

    let summary = docs.generate(pipeline.as_mut())?;
    print_summary(&summary);

    if docs.has_errors() {
        eprintln!("WARNING: Errors encountered.");
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "scad-docsgen",
            "-D",
            "wiki/",
            "-p",
            "mkdocs",
            "-n",
            "-m",
            "-t",
            "shapes.scad",
        ]);
        let mut settings = Settings::default();

        cli.apply(&mut settings);

        assert_eq!(settings.docs_dir, PathBuf::from("wiki"));
        assert_eq!(settings.target_profile, "mkdocs");
        assert!(!settings.gen_images);
        assert!(settings.generate.files && settings.generate.toc);
        assert!(!settings.generate.index);
        assert_eq!(cli.srcfiles, vec!["shapes.scad"]);
    }

    #[test]
    fn page_and_animation_flags() {
        let cli = Cli::parse_from(["scad-docsgen", "-c", "-s", "-a"]);
        let mut settings = Settings::default();

        cli.apply(&mut settings);

        assert!(settings.generate.cheat && settings.generate.sidebar);
        assert!(settings.png_animation);
        assert!(!settings.generate.files);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::parse_from(["scad-docsgen"]);
        let mut settings = Settings {
            project_name: Some("BOSL2".to_string()),
            strict: true,
            ..Settings::default()
        };

        cli.apply(&mut settings);

        assert_eq!(settings.project_name.as_deref(), Some("BOSL2"));
        assert!(settings.strict);
        assert!(settings.gen_images);
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["scad-docsgen", "-q", "-v"]).is_err());
        let cli = Cli::parse_from(["scad-docsgen", "-q"]);
        assert_eq!(cli.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = Cli::try_parse_from(["scad-docsgen", "-p", "nope"]).unwrap_err();

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("githubwiki"), "{err}");
        let cli = Cli::parse_from(["scad-docsgen", "--target-profile", "githubwiki"]);
        assert_eq!(cli.target_profile.as_deref(), Some("githubwiki"));
    }

    #[test]
    fn source_checks() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.scad");
        fs::write(&good, "// LibFile: good.scad\n").unwrap();
        let missing = dir.path().join("missing.scad");

        let problems = check_sources(&[good, missing.clone(), dir.path().to_path_buf()]);

        assert_eq!(
            problems,
            vec![
                format!("{} does not exist.", missing.display()),
                format!("{} is not a file.", dir.path().display()),
            ]
        );
    }
}
