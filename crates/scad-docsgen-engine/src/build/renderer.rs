//! Boundary to the external renderer process.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};

use crate::error::DocsGenError;

use super::options::{RenderMode, RenderOptions};
use super::request::is_gif;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const CANDIDATES: [&str; 2] = ["openscad", "openscad-nightly"];
const MACOS_APP: &str = "/Applications/OpenSCAD.app/Contents/MacOS/OpenSCAD";

/// One call into the renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderInvocation<'a> {
    pub script_file: &'a Path,
    pub output_file: &'a Path,
    pub options: &'a RenderOptions,
    pub auto_center: bool,
    pub view_all: bool,
    pub hard_warnings: bool,
    pub test_only: bool,
}

/// What the renderer said, split into the lines the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub success: bool,
    pub return_code: Option<i32>,
    pub cmdline: Vec<String>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub echos: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RenderOutput {
    pub fn from_streams(
        cmdline: Vec<String>,
        return_code: Option<i32>,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        let stdout: Vec<String> = stdout.lines().map(str::to_string).collect();
        let stderr: Vec<String> = stderr.lines().map(str::to_string).collect();
        let mut out = Self {
            success: return_code == Some(0),
            return_code,
            cmdline,
            ..Self::default()
        };
        for line in stdout.iter().chain(&stderr) {
            if line.starts_with("ECHO:") {
                out.echos.push(line.clone());
            } else if line.starts_with("WARNING:") {
                out.warnings.push(line.clone());
            } else if line.starts_with("ERROR:") {
                out.errors.push(line.clone());
            }
        }
        out.stdout = stdout;
        out.stderr = stderr;
        out
    }

    /// Ran to completion with a zero exit status.
    pub fn good(&self) -> bool {
        self.success && self.return_code == Some(0)
    }
}

pub trait Renderer {
    /// Produces `invocation.output_file`.
    ///
    /// A renderer that ran but failed returns `Ok` with an unsuccessful
    /// output; `Err` is for failures to run at all.
    fn render(&self, invocation: &RenderInvocation<'_>) -> Result<RenderOutput, DocsGenError>;
}

/// Runs the `openscad` command line.
#[derive(Debug, Clone)]
pub struct OpenScadRenderer {
    binary: PathBuf,
    timeout: Duration,
}

impl OpenScadRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Finds the binary on `PATH`, falling back to the macOS app bundle.
    pub fn locate() -> Result<Self, DocsGenError> {
        for candidate in CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                return Ok(Self::new(path));
            }
        }
        let app = Path::new(MACOS_APP);
        if app.is_file() {
            return Ok(Self::new(app));
        }
        Err(DocsGenError::Render(format!(
            "No OpenSCAD binary found. Tried: {CANDIDATES:?}"
        )))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn command_args(
        &self,
        inv: &RenderInvocation<'_>,
        output: &Path,
        animate: Option<u32>,
    ) -> Vec<String> {
        let opts = inv.options;
        let mut args = vec!["-o".to_string(), output.display().to_string()];
        let mode = if inv.test_only { RenderMode::TestOnly } else { opts.mode };

        if mode != RenderMode::TestOnly {
            args.push(format!("--imgsize={},{}", opts.image_size.0, opts.image_size.1));
            if let Some(camera) = opts.camera {
                let parts: Vec<String> = camera.iter().map(|v| v.to_string()).collect();
                args.push(format!("--camera={}", parts.join(",")));
            }
            if inv.auto_center {
                args.push("--autocenter".to_string());
            }
            if inv.view_all {
                args.push("--viewall".to_string());
            }
            args.push(format!(
                "--projection={}",
                if opts.orthographic { "o" } else { "p" }
            ));
            args.push(format!("--colorscheme={}", opts.color_scheme));
            let views: Vec<&str> = [
                (opts.show_axes, "axes"),
                (opts.show_scales, "scales"),
                (opts.show_edges, "edges"),
            ]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
            if !views.is_empty() {
                args.push(format!("--view={}", views.join(",")));
            }
            match mode {
                RenderMode::Render => args.push("--render".to_string()),
                RenderMode::ThrownTogether => args.push("--preview=throwntogether".to_string()),
                RenderMode::Preview => args.push("--preview".to_string()),
                RenderMode::TestOnly => {}
            }
            if let Some(frames) = animate {
                args.push(format!("--animate={frames}"));
            }
        }
        if inv.hard_warnings {
            args.push("--hardwarnings".to_string());
        }
        args.push(inv.script_file.display().to_string());
        args
    }

    fn run(&self, args: Vec<String>) -> Result<RenderOutput, DocsGenError> {
        let mut cmdline = vec![self.binary.display().to_string()];
        cmdline.extend(args.iter().cloned());
        log::debug!("Running {}", cmdline.join(" "));

        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()
            .map_err(|e| {
                DocsGenError::Render(format!("Could not run {}: {e}", self.binary.display()))
            })?;

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if start.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let out_text = read_back(&mut stdout)?;
        let mut err_text = read_back(&mut stderr)?;
        let code = match status {
            Some(status) => status.code(),
            None => {
                err_text.push_str(&format!(
                    "\nERROR: Timed out after {} seconds",
                    self.timeout.as_secs_f32()
                ));
                None
            }
        };
        Ok(RenderOutput::from_streams(cmdline, code, &out_text, &err_text))
    }

    fn render_animation(
        &self,
        inv: &RenderInvocation<'_>,
        frames: u32,
    ) -> Result<RenderOutput, DocsGenError> {
        let frame_dir = tempfile::TempDir::new()?;
        let args = self.command_args(inv, &frame_dir.path().join("frame.png"), Some(frames));
        let mut output = self.run(args)?;
        if !output.good() {
            return Ok(output);
        }

        let mut frame_files: Vec<PathBuf> = std::fs::read_dir(frame_dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        frame_files.sort();
        if frame_files.is_empty() {
            output.success = false;
            output.errors.push("ERROR: No animation frames were produced".to_string());
            return Ok(output);
        }
        if is_gif(inv.output_file) {
            assemble_gif(&frame_files, inv.output_file, inv.options.frame_ms)?;
        } else {
            assemble_apng(&frame_files, inv.output_file, inv.options.frame_ms)?;
        }
        Ok(output)
    }
}

impl Renderer for OpenScadRenderer {
    fn render(&self, inv: &RenderInvocation<'_>) -> Result<RenderOutput, DocsGenError> {
        match inv.options.animation_frames.filter(|_| !inv.test_only) {
            Some(frames) => self.render_animation(inv, frames),
            None => self.run(self.command_args(inv, inv.output_file, None)),
        }
    }
}

fn read_back(file: &mut File) -> std::io::Result<String> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Joins still frames into a looping GIF, `frame_ms` per frame.
pub fn assemble_gif(frames: &[PathBuf], output: &Path, frame_ms: u32) -> Result<(), DocsGenError> {
    let gif_err = |e: image::ImageError| {
        DocsGenError::Render(format!("Could not assemble {}: {e}", output.display()))
    };
    let delay = Delay::from_numer_denom_ms(frame_ms, 1);
    let mut decoded = Vec::with_capacity(frames.len());
    for path in frames {
        let img = image::open(path).map_err(gif_err)?.to_rgba8();
        decoded.push(Frame::from_parts(img, 0, 0, delay));
    }
    let mut encoder = GifEncoder::new(File::create(output)?);
    encoder.set_repeat(Repeat::Infinite).map_err(gif_err)?;
    encoder.encode_frames(decoded).map_err(gif_err)?;
    Ok(())
}

/// Joins still frames into a looping animated PNG, `frame_ms` per frame.
/// Every frame must have the size of the first.
pub fn assemble_apng(frames: &[PathBuf], output: &Path, frame_ms: u32) -> Result<(), DocsGenError> {
    let fail = |msg: String| DocsGenError::Render(format!("Could not assemble {}: {msg}", output.display()));
    let mut decoded = Vec::with_capacity(frames.len());
    for path in frames {
        let img = image::open(path).map_err(|e| fail(e.to_string()))?.to_rgba8();
        decoded.push(img);
    }
    let Some((width, height)) = decoded.first().map(|f| f.dimensions()) else {
        return Err(fail("no frames".to_string()));
    };

    let png_err = |e: png::EncodingError| fail(e.to_string());
    let mut encoder = png::Encoder::new(BufWriter::new(File::create(output)?), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let count = u32::try_from(decoded.len()).map_err(|e| fail(e.to_string()))?;
    encoder.set_animated(count, 0).map_err(png_err)?;
    encoder
        .set_frame_delay(u16::try_from(frame_ms).unwrap_or(u16::MAX), 1000)
        .map_err(png_err)?;
    let mut writer = encoder.write_header().map_err(png_err)?;
    for frame in &decoded {
        if frame.dimensions() != (width, height) {
            return Err(fail(format!(
                "frame is {}x{}, expected {width}x{height}",
                frame.width(),
                frame.height()
            )));
        }
        writer.write_image_data(frame.as_raw()).map_err(png_err)?;
    }
    writer.finish().map_err(png_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn invocation<'a>(opts: &'a RenderOptions) -> RenderInvocation<'a> {
        RenderInvocation {
            script_file: Path::new("tmp_foo.scad"),
            output_file: Path::new("out.png"),
            options: opts,
            auto_center: true,
            view_all: true,
            hard_warnings: true,
            test_only: false,
        }
    }

    #[test]
    fn classifies_output_lines() {
        let out = RenderOutput::from_streams(
            vec!["openscad".into()],
            Some(0),
            "ECHO: 42\nplain\n",
            "WARNING: Viewall and autocenter disabled\nERROR: Parser error\n",
        );

        assert_eq!(out.echos, vec!["ECHO: 42"]);
        assert_eq!(out.warnings, vec!["WARNING: Viewall and autocenter disabled"]);
        assert_eq!(out.errors, vec!["ERROR: Parser error"]);
        assert_eq!(out.stdout.len(), 2);
        assert!(out.good());
    }

    #[test]
    fn nonzero_exit_is_not_good() {
        let out = RenderOutput::from_streams(vec![], Some(1), "", "");
        assert!(!out.good());
    }

    #[test]
    fn still_image_arguments() {
        let (opts, _) = RenderOptions::from_meta("3D;Render;Edges;NoScales");
        let renderer = OpenScadRenderer::new("openscad");

        let args = renderer.command_args(&invocation(&opts), Path::new("out.png"), None);

        assert_eq!(
            args,
            vec![
                "-o",
                "out.png",
                "--imgsize=320,240",
                "--camera=0,0,0,55,0,25,444",
                "--autocenter",
                "--viewall",
                "--projection=o",
                "--colorscheme=Cornfield",
                "--view=axes,edges",
                "--render",
                "--hardwarnings",
                "tmp_foo.scad",
            ]
        );
    }

    #[test]
    fn test_only_arguments_skip_imaging() {
        let opts = RenderOptions::default();
        let mut inv = invocation(&opts);
        inv.test_only = true;
        inv.hard_warnings = false;

        let args = OpenScadRenderer::new("openscad").command_args(&inv, Path::new("out.echo"), None);

        assert_eq!(args, vec!["-o", "out.echo", "tmp_foo.scad"]);
    }

    #[test]
    fn animation_arguments() {
        let (opts, _) = RenderOptions::from_meta("Spin;Perspective");
        let args = OpenScadRenderer::new("openscad").command_args(
            &invocation(&opts),
            Path::new("frame.png"),
            opts.animation_frames,
        );
        assert!(args.contains(&"--animate=36".to_string()));
        assert!(args.contains(&"--projection=p".to_string()));
    }

    #[test]
    fn missing_binary_is_an_error() {
        let opts = RenderOptions::default();
        let renderer = OpenScadRenderer::new("/nonexistent/openscad-for-tests");
        let err = renderer.render(&invocation(&opts)).unwrap_err();
        assert!(matches!(err, DocsGenError::Render(_)));
    }

    #[cfg(unix)]
    #[test]
    fn captures_streams_and_exit_code() {
        let renderer = OpenScadRenderer::new("sh");

        let out = renderer
            .run(vec![
                "-c".into(),
                "echo 'ECHO: hi'; echo 'ERROR: boom' >&2; exit 3".into(),
            ])
            .unwrap();

        assert_eq!(out.return_code, Some(3));
        assert_eq!(out.echos, vec!["ECHO: hi"]);
        assert_eq!(out.errors, vec!["ERROR: boom"]);
        assert_eq!(out.cmdline[0], "sh");
        assert!(!out.good());
    }

    #[cfg(unix)]
    #[test]
    fn timeout_counts_as_failure() {
        let renderer = OpenScadRenderer::new("sleep").with_timeout(Duration::from_millis(100));

        let out = renderer.run(vec!["5".into()]).unwrap();

        assert!(!out.good());
        assert_eq!(out.return_code, None);
        assert!(out.errors[0].starts_with("ERROR: Timed out"));
    }

    fn write_frames(dir: &Path, sizes: &[u32]) -> Vec<PathBuf> {
        sizes
            .iter()
            .enumerate()
            .map(|(n, size)| {
                let path = dir.join(format!("frame{n:05}.png"));
                image::RgbaImage::from_pixel(*size, *size, image::Rgba([n as u8 * 80, 0, 0, 255]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn assembles_gif_from_frames() {
        let dir = tempfile::TempDir::new().unwrap();
        let frames = write_frames(dir.path(), &[4, 4, 4]);
        let out = dir.path().join("anim.gif");

        assemble_gif(&frames, &out, 100).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
    }

    #[test]
    fn assembles_apng_from_frames() {
        let dir = tempfile::TempDir::new().unwrap();
        let frames = write_frames(dir.path(), &[4, 4, 4]);
        let out = dir.path().join("anim.png");

        assemble_apng(&frames, &out, 100).unwrap();

        let file = std::io::BufReader::new(File::open(&out).unwrap());
        let reader = png::Decoder::new(file).read_info().unwrap();
        let control = reader.info().animation_control.unwrap();
        assert_eq!((control.num_frames, control.num_plays), (3, 0));
        assert_eq!(reader.info().size(), (4, 4));
    }

    #[test]
    fn apng_frames_must_share_a_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let frames = write_frames(dir.path(), &[4, 5]);

        let err = assemble_apng(&frames, &dir.path().join("anim.png"), 100).unwrap_err();

        assert!(err.to_string().contains("expected 4x4"), "{err}");
    }
}
