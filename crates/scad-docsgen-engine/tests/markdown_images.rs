//! Markdown image runs against a fake renderer.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use image::{Rgb, RgbImage};
use pretty_assertions::assert_eq;
use scad_docsgen_config::MdImgGenSettings;
use scad_docsgen_engine::build::RenderInvocation;
use scad_docsgen_engine::{BuildPipeline, DocsGenError, MarkdownImageGen, RenderOutput, Renderer};
use tempfile::TempDir;

const TUTORIAL: &str = "\
# Getting Started

Make a cube:

```openscad-3D
cube(10);
```
";

#[derive(Clone)]
struct FakeRenderer {
    exit_code: Rc<Cell<i32>>,
    calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl FakeRenderer {
    fn new() -> Self {
        Self {
            exit_code: Rc::new(Cell::new(0)),
            calls: Rc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, inv: &RenderInvocation<'_>) -> Result<RenderOutput, DocsGenError> {
        self.calls.borrow_mut().push(inv.output_file.to_path_buf());
        let code = self.exit_code.get();
        if code == 0 && !inv.test_only {
            RgbImage::from_pixel(8, 8, Rgb([60, 60, 60]))
                .save_with_format(inv.output_file, image::ImageFormat::Png)
                .map_err(|e| DocsGenError::Render(e.to_string()))?;
        }
        let stderr = if code == 0 { "" } else { "ERROR: Parser error in line 1" };
        Ok(RenderOutput::from_streams(
            vec!["fake-openscad".to_string()],
            Some(code),
            "",
            stderr,
        ))
    }
}

struct Workspace {
    dir: TempDir,
    source: PathBuf,
    renderer: FakeRenderer,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Getting_Started.md");
        std::fs::write(&source, TUTORIAL).unwrap();
        Self {
            dir,
            source,
            renderer: FakeRenderer::new(),
        }
    }

    fn settings(&self) -> MdImgGenSettings {
        MdImgGenSettings {
            docs_dir: self.dir.path().join("docs"),
            file_prefix: "Tutorial-".to_string(),
            ..MdImgGenSettings::default()
        }
    }

    fn run(&self, settings: MdImgGenSettings) -> (MarkdownImageGen, scad_docsgen_engine::RunSummary) {
        let mut generator = MarkdownImageGen::new(settings);
        let mut pipeline = BuildPipeline::new(Box::new(self.renderer.clone())).with_work_dir(self.dir.path());
        let summary = generator
            .process_files(std::slice::from_ref(&self.source), Some(&mut pipeline))
            .unwrap();
        (generator, summary)
    }
}

#[test]
fn first_run_writes_page_and_image() {
    let ws = Workspace::new();

    let (generator, summary) = ws.run(ws.settings());

    assert!(!generator.has_errors(), "{:?}", generator.log().entries());
    let page_file = ws.dir.path().join("docs/Tutorial-Getting_Started.md");
    assert_eq!(summary.pages, vec![page_file.clone()]);
    assert_eq!(summary.new, 1);
    assert!(ws.dir.path().join("docs/images/Getting_Started_1.png").exists());
    let page = std::fs::read_to_string(page_file).unwrap();
    assert!(page.ends_with("```\n![Figure 1](images/Getting_Started_1.png)\n"), "{page}");
}

#[test]
fn unchanged_source_is_not_rendered_again() {
    let ws = Workspace::new();
    ws.run(ws.settings());

    let (_, summary) = ws.run(ws.settings());

    assert_eq!(ws.renderer.calls(), 1);
    assert_eq!(summary.artifacts_written(), 0);
}

#[test]
fn failed_script_is_retried_next_run() {
    let ws = Workspace::new();
    ws.renderer.exit_code.set(1);

    let (generator, summary) = ws.run(ws.settings());

    assert_eq!(summary.failed, 1);
    let entry = &generator.log().entries()[0];
    assert_eq!(entry.line, 5);
    assert!(entry.message.starts_with("Failed OpenSCAD script:"));

    ws.renderer.exit_code.set(0);
    let (generator, summary) = ws.run(ws.settings());

    assert_eq!(ws.renderer.calls(), 2);
    assert_eq!(summary.new, 1);
    assert!(!generator.has_errors());
}

#[test]
fn test_only_run_writes_nothing() {
    let ws = Workspace::new();
    let settings = MdImgGenSettings {
        test_only: true,
        ..ws.settings()
    };

    let (_, summary) = ws.run(settings);

    assert!(summary.pages.is_empty());
    assert_eq!(ws.renderer.calls(), 1);
    assert!(!ws.dir.path().join("docs").exists());
}
