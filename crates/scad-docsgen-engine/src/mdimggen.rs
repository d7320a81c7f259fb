//! # Markdown Image Generation
//!
//! Renders the fenced ` ```openscad ` blocks of plain markdown documents,
//! such as tutorials, and writes a copy of each document with an image after
//! every block. A fence may carry image metadata after a dash, as in
//! ` ```openscad-3D;Big `; `ImgOnly` in the metadata drops the script from
//! the output and keeps only the image.
//!
//! Images go through the same [`BuildPipeline`] and source hash cache as the
//! documentation run.

use std::path::{Path, PathBuf};

use relative_path::RelativePathBuf;
use scad_docsgen_config::MdImgGenSettings;

use crate::build::{BuildPipeline, RenderRequest, image_extension};
use crate::cache::{FileHashes, HASH_FILE};
use crate::docsgen::{RunSummary, write_lines};
use crate::error::DocsGenError;
use crate::model::Origin;
use crate::report::{ErrorLog, Severity};

const FENCE_OPEN: &str = "```openscad";
const FENCE_CLOSE: &str = "```";

/// One markdown document with its scripts swapped for image references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedPage {
    pub lines: Vec<String>,
    pub requests: Vec<RenderRequest>,
}

struct OpenBlock {
    line: usize,
    meta: String,
    script: Vec<String>,
}

pub struct MarkdownImageGen {
    settings: MdImgGenSettings,
    log: ErrorLog,
}

impl MarkdownImageGen {
    pub fn new(settings: MdImgGenSettings) -> Self {
        Self {
            settings,
            log: ErrorLog::new(),
        }
    }

    pub fn settings(&self) -> &MdImgGenSettings {
        &self.settings
    }

    pub fn log(&self) -> &ErrorLog {
        &self.log
    }

    pub fn has_errors(&self) -> bool {
        self.log.has_errors()
    }

    /// Where the converted copy of `src_file` is written.
    pub fn output_file(&self, src_file: &Path) -> PathBuf {
        let stem = src_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.settings
            .docs_dir
            .join(format!("{}{stem}.md", self.settings.file_prefix))
    }

    /// Rewrites one document. Images are numbered from 1 in document order
    /// and named after the source file's stem.
    pub fn convert<S: AsRef<str>>(&mut self, lines: &[S], src_file: &str) -> ConvertedPage {
        let stem = Path::new(src_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut page = ConvertedPage::default();
        let mut open: Option<OpenBlock> = None;
        let mut image_num = 0;

        for (idx, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            match open.take() {
                Some(block) if line == FENCE_CLOSE => {
                    self.close_block(block, &stem, src_file, image_num, &mut page);
                }
                Some(mut block) => {
                    block.script.push(line.to_string());
                    open = Some(block);
                }
                None if line.starts_with(FENCE_OPEN) => {
                    image_num += 1;
                    let meta = line
                        .split_once('-')
                        .map(|(_, meta)| meta.to_string())
                        .unwrap_or_default();
                    open = Some(OpenBlock {
                        line: idx + 1,
                        meta,
                        script: Vec::new(),
                    });
                }
                None => page.lines.push(line.to_string()),
            }
        }
        if let Some(block) = open {
            self.log.add_entry(
                src_file,
                block.line,
                "Unterminated openscad block, dropped",
                Severity::Warning,
            );
        }
        page
    }

    fn close_block(
        &mut self,
        block: OpenBlock,
        stem: &str,
        src_file: &str,
        image_num: usize,
        page: &mut ConvertedPage,
    ) {
        let ext = image_extension(&block.meta, self.settings.png_animation);
        let rel_url = RelativePathBuf::from(self.settings.image_root.as_str())
            .join(format!("{stem}_{image_num}.{ext}"));
        let image_file = self.settings.docs_dir.join(rel_url.as_str());

        let origin = Origin::new(src_file, block.line);
        match RenderRequest::new(origin.clone(), image_file, block.script.clone(), &block.meta) {
            Ok(req) => page.requests.push(req),
            Err(err) => self.log.record(&origin, &err),
        }
        if !block.meta.contains("ImgOnly") {
            page.lines.push(FENCE_OPEN.to_string());
            page.lines.extend(block.script);
            page.lines.push(FENCE_CLOSE.to_string());
        }
        page.lines.push(format!("![Figure {image_num}]({rel_url})"));
    }

    /// Converts and writes every file, then settles its images. A file is
    /// rendered when forced, when testing, or when it changed since the last
    /// committed run; a file that logged an error is retried next time.
    pub fn process_files(
        &mut self,
        files: &[PathBuf],
        mut pipeline: Option<&mut BuildPipeline>,
    ) -> Result<RunSummary, DocsGenError> {
        let settings = self.settings.clone();
        let mut summary = RunSummary::default();
        let mut hashes = (!settings.test_only)
            .then(|| FileHashes::load(settings.docs_dir.join(HASH_FILE), &mut self.log));

        for file in files {
            let source = file.display().to_string();
            let text = std::fs::read_to_string(file)?;
            let lines: Vec<&str> = text.lines().collect();
            let page = self.convert(&lines, &source);

            if !settings.test_only {
                let outfile = self.output_file(file);
                log::info!("Writing {}...", outfile.display());
                write_lines(&outfile, &page.lines)?;
                summary.pages.push(outfile);
            }

            let stale = hashes.as_mut().is_none_or(|h| h.is_stale(&source));
            if let Some(pipe) = pipeline.as_deref_mut() {
                pipe.set_test_only(settings.test_only);
                page.requests.into_iter().for_each(|r| pipe.enqueue(r));
                let reports = if settings.force || settings.test_only || stale {
                    pipe.flush(&mut self.log)
                } else {
                    pipe.purge()
                };
                summary.tally(&reports);
            }

            if let Some(hashes) = hashes.as_mut() {
                if self.log.file_has_errors(&source) {
                    hashes.invalidate(&source);
                }
                hashes.commit()?;
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TUTORIAL: &str = "\
# Cubes

```openscad-3D
cube(10);
```

```openscad-Spin;ImgOnly
sphere(5);
```
Done.
";

    fn converted(png_animation: bool) -> (ConvertedPage, ErrorLog) {
        let settings = MdImgGenSettings {
            png_animation,
            ..MdImgGenSettings::default()
        };
        let mut generator = MarkdownImageGen::new(settings);
        let lines: Vec<&str> = TUTORIAL.lines().collect();
        let page = generator.convert(&lines, "tutorials/Cubes.md");
        (page, generator.log)
    }

    #[test]
    fn fenced_scripts_gain_images() {
        let (page, log) = converted(false);

        assert_eq!(
            page.lines,
            vec![
                "# Cubes",
                "",
                "```openscad",
                "cube(10);",
                "```",
                "![Figure 1](images/Cubes_1.png)",
                "",
                "![Figure 2](images/Cubes_2.gif)",
                "Done.",
            ]
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    fn requests_carry_meta_and_fence_line() {
        let (page, _) = converted(false);

        let files: Vec<&Path> = page.requests.iter().map(|r| r.image_file.as_path()).collect();
        assert_eq!(files, vec![Path::new("docs/images/Cubes_1.png"), Path::new("docs/images/Cubes_2.gif")]);
        assert_eq!(page.requests[0].origin, Origin::new("tutorials/Cubes.md", 3));
        assert!(page.requests[1].options.is_animated());
        assert_eq!(page.requests[1].script_lines.last().map(String::as_str), Some("sphere(5);"));
    }

    #[test]
    fn png_animation_keeps_png_names() {
        let (page, _) = converted(true);
        assert_eq!(page.requests[1].image_file, PathBuf::from("docs/images/Cubes_2.png"));
    }

    #[test]
    fn unterminated_block_is_dropped_with_a_warning() {
        let mut generator = MarkdownImageGen::new(MdImgGenSettings::default());

        let page = generator.convert(&["intro", "```openscad", "cube();"], "a.md");

        assert_eq!(page.lines, vec!["intro"]);
        assert!(page.requests.is_empty());
        assert_eq!(generator.log().entries()[0].line, 2);
        assert!(!generator.has_errors());
    }

    #[test]
    fn output_name_uses_prefix_and_stem() {
        let settings = MdImgGenSettings {
            docs_dir: PathBuf::from("wiki"),
            file_prefix: "Tutorial-".to_string(),
            ..MdImgGenSettings::default()
        };
        let generator = MarkdownImageGen::new(settings);

        assert_eq!(
            generator.output_file(Path::new("src/Cubes.md")),
            PathBuf::from("wiki/Tutorial-Cubes.md")
        );
    }
}
