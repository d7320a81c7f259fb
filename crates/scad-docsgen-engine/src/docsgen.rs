//! # Run Orchestration
//!
//! [`DocsGen`] owns everything that lives for a whole run: the parser (and
//! with it the document arena and cross-reference registry), the error log
//! and the target registry. A run is:
//!
//! 1. read the rc file, which may change settings and define block types;
//! 2. parse every source file, so all names are known before rendering;
//! 3. write one page per file, flushing or purging each file's render
//!    requests depending on whether the file changed since the last run;
//! 4. write the requested index pages and the optional JSON report.

use std::path::{Path, PathBuf};

use serde::Serialize;
use scad_docsgen_config::Settings;

use crate::build::{BuildPipeline, RenderReport, RenderRequest, RequestStatus};
use crate::cache::{FileHashes, HASH_FILE};
use crate::error::DocsGenError;
use crate::model::{Document, NodeId, dump_tree};
use crate::pages::PageWriter;
use crate::parsing::DocsParser;
use crate::report::{ErrorLog, REPORT_FILE};
use crate::target::{IndexPage, Target, TargetRegistry};

const DUMP_DEPTH: usize = 6;

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages: Vec<PathBuf>,
    pub new: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub(crate) fn tally(&mut self, reports: &[RenderReport]) {
        for report in reports {
            match report.status {
                RequestStatus::New => self.new += 1,
                RequestStatus::Replaced => self.replaced += 1,
                RequestStatus::Skipped => self.skipped += 1,
                RequestStatus::Failed => self.failed += 1,
                RequestStatus::Queued | RequestStatus::Running => {}
            }
        }
    }

    /// Images written to the docs directory.
    pub fn artifacts_written(&self) -> usize {
        self.new + self.replaced
    }
}

pub struct DocsGen {
    parser: DocsParser,
    log: ErrorLog,
    targets: TargetRegistry,
}

impl DocsGen {
    pub fn new(settings: Settings) -> Self {
        let mut log = ErrorLog::new();
        let parser = DocsParser::new(settings, &mut log);
        Self {
            parser,
            log,
            targets: TargetRegistry::with_defaults(),
        }
    }

    /// Reads the rc file at `path`, if there is one.
    pub fn load_rc(&mut self, path: &Path) -> Result<bool, DocsGenError> {
        self.parser.load_rc_file(path, &mut self.log)
    }

    pub fn parse_files(&mut self, paths: &[PathBuf]) {
        self.parser.parse_files(paths, &mut self.log);
    }

    pub fn parse_lines<S: AsRef<str>>(&mut self, lines: &[S], src_file: &str) {
        self.parser.parse_lines(lines, src_file, &mut self.log);
    }

    /// Settings as adjusted by the rc file.
    pub fn settings(&self) -> &Settings {
        self.parser.settings()
    }

    pub fn parser(&self) -> &DocsParser {
        &self.parser
    }

    pub fn document(&self) -> &Document {
        self.parser.document()
    }

    pub fn log(&self) -> &ErrorLog {
        &self.log
    }

    pub fn has_errors(&self) -> bool {
        self.log.has_errors()
    }

    pub fn target(&self) -> Result<&dyn Target, DocsGenError> {
        self.targets.get(&self.settings().target_profile)
    }

    /// Runs every generator the settings ask for. Images are only produced
    /// when a pipeline is given.
    pub fn generate(&mut self, mut pipeline: Option<&mut BuildPipeline>) -> Result<RunSummary, DocsGenError> {
        let settings = self.settings().clone();
        let mut summary = RunSummary::default();
        if settings.generate.files || settings.test_only {
            summary = self.write_docs_files(pipeline.as_deref_mut())?;
        }
        let pages = [
            (settings.generate.toc, IndexPage::Toc),
            (settings.generate.index, IndexPage::AlphaIndex),
            (settings.generate.topics, IndexPage::Topics),
            (settings.generate.cheat, IndexPage::CheatSheet),
            (settings.generate.sidebar, IndexPage::Sidebar),
        ];
        for (_, page) in pages.into_iter().filter(|(wanted, _)| *wanted) {
            summary.pages.push(self.write_index_page(page)?);
        }
        if settings.report {
            self.write_report()?;
        }
        Ok(summary)
    }

    /// Writes each file's page and settles its render requests.
    ///
    /// Files go in subtitle order. A file whose source is unchanged since
    /// the last committed run has its requests purged unless forced; a file
    /// that logged any error loses its cache entry so the next run retries it.
    pub fn write_docs_files(&mut self, mut pipeline: Option<&mut BuildPipeline>) -> Result<RunSummary, DocsGenError> {
        let settings = self.settings().clone();
        let Self { parser, log, targets } = self;
        let target = targets.get(&settings.target_profile)?;
        let doc = parser.document();
        let writer = PageWriter::new(doc, parser.xrefs(), target);
        let mut summary = RunSummary::default();

        let mut files: Vec<NodeId> = doc.files().to_vec();
        files.sort_by(|a, b| doc.node(*a).subtitle.trim().cmp(doc.node(*b).subtitle.trim()));

        if settings.test_only {
            for file in files {
                writer.file_page(file, log);
                if let Some(pipe) = pipeline.as_deref_mut() {
                    pipe.set_test_only(true);
                    file_requests(doc, file).into_iter().for_each(|r| pipe.enqueue(r));
                    summary.tally(&pipe.flush(log));
                }
            }
            return Ok(summary);
        }

        std::fs::create_dir_all(&settings.docs_dir)?;
        let mut hashes = FileHashes::load(settings.docs_dir.join(HASH_FILE), log);
        for file in files {
            let source = doc.node(file).origin.file.clone();
            let outfile = settings
                .docs_dir
                .join(format!("{source}{}", target.suffix()));
            log::info!("Writing {}...", outfile.display());
            write_lines(&outfile, &writer.file_page(file, log))?;
            summary.pages.push(outfile);

            let Some(pipe) = pipeline.as_deref_mut().filter(|_| settings.gen_images) else {
                continue;
            };
            file_requests(doc, file).into_iter().for_each(|r| pipe.enqueue(r));
            let stale = hashes.is_stale(&source);
            let reports = if settings.force || stale {
                pipe.flush(log)
            } else {
                pipe.purge()
            };
            summary.tally(&reports);
            if log.file_has_errors(&source) {
                hashes.invalidate(&source);
            }
            hashes.commit()?;
        }
        Ok(summary)
    }

    /// Writes one index page and returns its path.
    pub fn write_index_page(&mut self, page: IndexPage) -> Result<PathBuf, DocsGenError> {
        let settings = self.settings().clone();
        let Self { parser, log, targets } = self;
        let target = targets.get(&settings.target_profile)?;
        let writer = PageWriter::new(parser.document(), parser.xrefs(), target);
        let lines = match page {
            IndexPage::Toc => writer.toc_page(&parser.files_prioritized(), log),
            IndexPage::Topics => writer.topics_page(),
            IndexPage::AlphaIndex => writer.alpha_index_page(),
            IndexPage::CheatSheet => {
                writer.cheat_sheet_page(&parser.files_prioritized(), settings.project_name.as_deref())
            }
            IndexPage::Sidebar => writer.sidebar_page(&parser.files_prioritized(), log),
        };
        std::fs::create_dir_all(&settings.docs_dir)?;
        let outfile = settings.docs_dir.join(target.page_file(page));
        log::info!("Writing {}...", outfile.display());
        write_lines(&outfile, &lines)?;
        Ok(outfile)
    }

    pub fn write_report(&self) -> Result<(), DocsGenError> {
        self.log.write_report(Path::new(REPORT_FILE))
    }

    /// Indented outline of every parsed file.
    pub fn dump_tree(&self) -> Vec<String> {
        let doc = self.document();
        dump_tree(doc, doc.files(), DUMP_DEPTH)
    }

    pub fn dump_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.document().data())
    }
}

/// Render requests of every image under `file`, in document order.
fn file_requests(doc: &Document, file: NodeId) -> Vec<RenderRequest> {
    let mut out = Vec::new();
    let mut stack = vec![file];
    while let Some(id) = stack.pop() {
        if let Some(req) = doc.node(id).as_image().and_then(|i| i.request.as_ref()) {
            out.push(req.clone());
        }
        stack.extend(doc.children(id).iter().rev());
    }
    out
}

pub(crate) fn write_lines(path: &Path, lines: &[String]) -> Result<(), DocsGenError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SOURCE: &str = "\
// LibFile: widgets.scad
// Section: Widgets
// Function: widget()
// Topics: Parts
// Example:
//   widget();
function widget() = 1;
";

    fn docsgen_with(dir: &Path, profile: &str) -> DocsGen {
        let mut settings = Settings::default();
        settings.docs_dir = dir.to_path_buf();
        settings.target_profile = profile.to_string();
        let mut docs = DocsGen::new(settings);
        let lines: Vec<&str> = SOURCE.lines().collect();
        docs.parse_lines(&lines, "widgets.scad");
        docs
    }

    fn docsgen(dir: &Path) -> DocsGen {
        docsgen_with(dir, "wiki")
    }

    #[test]
    fn pages_land_under_the_docs_dir() {
        let dir = TempDir::new().unwrap();
        let mut docs = docsgen(dir.path());

        let summary = docs.write_docs_files(None).unwrap();

        let page = dir.path().join("widgets.scad.md");
        assert_eq!(summary.pages, vec![page.clone()]);
        let text = std::fs::read_to_string(page).unwrap();
        assert!(text.starts_with("# LibFile: widgets.scad\n"));
        assert!(!docs.has_errors());
    }

    #[test]
    fn index_pages_use_target_names() {
        let dir = TempDir::new().unwrap();
        let mut docs = docsgen(dir.path());

        let toc = docs.write_index_page(IndexPage::Toc).unwrap();
        let topics = docs.write_index_page(IndexPage::Topics).unwrap();

        assert_eq!(toc, dir.path().join("TOC.md"));
        let text = std::fs::read_to_string(topics).unwrap();
        assert!(text.contains("### Parts\n"));
    }

    #[test]
    fn unknown_profile_fails_page_writing() {
        let dir = TempDir::new().unwrap();
        let mut docs = docsgen_with(dir.path(), "nope");

        assert!(matches!(
            docs.write_index_page(IndexPage::Toc),
            Err(DocsGenError::UnknownTarget(_))
        ));
    }

    #[test]
    fn function_examples_are_not_rendered() {
        let dir = TempDir::new().unwrap();
        let docs = docsgen(dir.path());
        let file = docs.document().files()[0];

        assert!(file_requests(docs.document(), file).is_empty());
    }

    #[test]
    fn dumps_name_every_node() {
        let dir = TempDir::new().unwrap();
        let docs = docsgen(dir.path());

        let tree = docs.dump_tree();
        assert_eq!(tree[0], "LibFile: widgets.scad");
        assert!(tree.contains(&"    Function: widget()".to_string()));
        let json: serde_json::Value = serde_json::from_str(&docs.dump_json().unwrap()).unwrap();
        assert_eq!(json[0]["name"], "LibFile");
    }
}
