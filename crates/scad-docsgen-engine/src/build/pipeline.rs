use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::DocsGenError;
use crate::model::Origin;
use crate::report::{ErrorLog, Severity};

use super::compare::{MAX_RMS, artifacts_match};
use super::renderer::{RenderInvocation, RenderOutput, Renderer};
use super::request::RenderRequest;

const VIEWALL_NOTICE: &str = "Viewall and autocenter disabled";
const REPORT_PREFIX: &str = "     ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Queued,
    Running,
    New,
    Replaced,
    Skipped,
    Failed,
}

impl RequestStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::New | Self::Replaced | Self::Skipped)
    }

    /// True when the committed artifact was written.
    pub fn wrote_artifact(self) -> bool {
        matches!(self, Self::New | Self::Replaced)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::New => "NEW",
            Self::Replaced => "REPLACE",
            Self::Skipped => "SKIP",
            Self::Failed => "FAIL",
        })
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub origin: Origin,
    pub image_file: PathBuf,
    pub status: RequestStatus,
    pub output: Option<RenderOutput>,
}

/// Queue of render requests, executed one at a time.
pub struct BuildPipeline {
    renderer: Box<dyn Renderer>,
    queue: Vec<RenderRequest>,
    work_dir: PathBuf,
    max_rms: f64,
    test_only: bool,
}

impl BuildPipeline {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            renderer,
            queue: Vec::new(),
            work_dir: PathBuf::from("."),
            max_rms: MAX_RMS,
            test_only: false,
        }
    }

    /// Directory the temporary scripts are written to. Relative `include`s in
    /// snippets resolve against it.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_max_rms(mut self, max_rms: f64) -> Self {
        self.max_rms = max_rms;
        self
    }

    pub fn set_test_only(&mut self, test_only: bool) {
        self.test_only = test_only;
    }

    pub fn enqueue(&mut self, request: RenderRequest) {
        log::debug!("Queued {}", request.image_file.display());
        self.queue.push(request);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drops every queued request unrun.
    pub fn purge(&mut self) -> Vec<RenderReport> {
        self.queue
            .drain(..)
            .map(|req| RenderReport {
                origin: req.origin,
                image_file: req.image_file,
                status: RequestStatus::Skipped,
                output: None,
            })
            .collect()
    }

    /// Runs every queued request in order.
    pub fn flush(&mut self, log: &mut ErrorLog) -> Vec<RenderReport> {
        let queue = std::mem::take(&mut self.queue);
        queue.iter().map(|req| self.process(req, log)).collect()
    }

    fn process(&self, req: &RenderRequest, log: &mut ErrorLog) -> RenderReport {
        log::debug!("{} {}", RequestStatus::Running, req.image_name());
        let (status, output) = match self.execute(req) {
            Ok(done) => done,
            Err((err, output)) => {
                let report = failure_report(req, output.as_ref(), Some(&err));
                log.add_entry(&req.origin.file, req.origin.line, &report, Severity::Error);
                (RequestStatus::Failed, output)
            }
        };
        if status != RequestStatus::Skipped {
            log::info!("  {}... {}", req.image_name(), status);
        }
        RenderReport {
            origin: req.origin.clone(),
            image_file: req.image_file.clone(),
            status,
            output,
        }
    }

    fn execute(
        &self,
        req: &RenderRequest,
    ) -> Result<(RequestStatus, Option<RenderOutput>), (DocsGenError, Option<RenderOutput>)> {
        let fail = |err: DocsGenError| (err, None);

        let mut script = tempfile::Builder::new()
            .prefix("tmp_")
            .suffix(".scad")
            .tempfile_in(&self.work_dir)
            .map_err(|e| fail(e.into()))?;
        for line in &req.script_lines {
            writeln!(script, "{line}").map_err(|e| fail(e.into()))?;
        }
        script.flush().map_err(|e| fail(e.into()))?;

        let candidate = self.candidate_file(req).map_err(fail)?;
        let no_vp = !req.sets_viewport();
        let invocation = RenderInvocation {
            script_file: script.path(),
            output_file: candidate.path(),
            options: &req.options,
            auto_center: no_vp,
            view_all: no_vp,
            hard_warnings: no_vp,
            test_only: self.test_only,
        };

        let mut output = self.renderer.render(&invocation).map_err(fail)?;
        output.warnings.retain(|w| !w.contains(VIEWALL_NOTICE));
        if !output.good() || !output.warnings.is_empty() || !output.errors.is_empty() {
            output.success = false;
            return Err((
                DocsGenError::Render("Renderer reported failure".to_string()),
                Some(output),
            ));
        }
        if self.test_only {
            return Ok((RequestStatus::Skipped, Some(output)));
        }
        let produced = candidate.as_file().metadata().map(|m| m.len()).unwrap_or(0);
        if produced == 0 {
            return Err((
                DocsGenError::Render("Renderer produced no image".to_string()),
                Some(output),
            ));
        }

        let status = if !req.image_file.exists() {
            RequestStatus::New
        } else {
            match artifacts_match(&req.image_file, candidate.path(), self.max_rms) {
                Ok(true) => return Ok((RequestStatus::Skipped, Some(output))),
                Ok(false) => RequestStatus::Replaced,
                Err(err) => return Err((err, Some(output))),
            }
        };
        if let Err(err) = candidate.persist(&req.image_file) {
            return Err((err.error.into(), Some(output)));
        }
        Ok((status, Some(output)))
    }

    /// Temporary output file beside the final artifact, so committing it is a rename.
    fn candidate_file(&self, req: &RenderRequest) -> Result<NamedTempFile, DocsGenError> {
        if self.test_only {
            return Ok(tempfile::Builder::new()
                .prefix("tmp_")
                .suffix(".echo")
                .tempfile_in(&self.work_dir)?);
        }
        let dir = req
            .image_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        Ok(tempfile::Builder::new()
            .prefix("tmp_")
            .suffix(&format!(".{}", req.extension()))
            .tempfile_in(dir)?)
    }
}

/// Multi-line failure description: command, output streams, then the script.
pub fn failure_report(
    req: &RenderRequest,
    output: Option<&RenderOutput>,
    err: Option<&DocsGenError>,
) -> String {
    let mut lines = vec!["Failed OpenSCAD script:".to_string()];
    let mut push = |line: String| lines.push(format!("{REPORT_PREFIX}{line}"));
    push(format!("Image: {}", req.image_name()));
    match output {
        Some(out) => {
            push(format!("cmd-line = {}", out.cmdline.join(" ")));
            out.stdout.iter().chain(&out.stderr).for_each(|l| push(l.clone()));
            push(format!(
                "Return code = {}",
                out.return_code.map_or_else(|| "None".to_string(), |c| c.to_string())
            ));
        }
        None => {
            if let Some(err) = err {
                push(err.to_string());
            }
        }
    }
    push(format!("{}-", "-=".repeat(32)));
    req.script_lines.iter().for_each(|l| push(l.clone()));
    push(format!("{}=", "=-".repeat(32)));
    lines.join("\n")
}
