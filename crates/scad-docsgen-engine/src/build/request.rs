use std::path::{Path, PathBuf};

use crate::error::DocsGenError;
use crate::model::Origin;

use super::options::RenderOptions;

/// Widest page column, in pixels, shared by an image and its script.
const PAGE_WIDTH: f64 = 880.0;
/// Rough pixel width of one code character.
const CHAR_WIDTH: f64 = 9.0;

/// Everything needed to produce one image, decided before any rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub origin: Origin,
    pub image_file: PathBuf,
    pub script_lines: Vec<String>,
    pub meta: String,
    pub options: RenderOptions,
    /// Show the script below the image instead of beside it.
    pub script_under: bool,
}

impl RenderRequest {
    pub fn new(
        origin: Origin,
        image_file: impl Into<PathBuf>,
        script_lines: Vec<String>,
        meta: &str,
    ) -> Result<Self, DocsGenError> {
        if meta.contains("NORENDER") {
            return Err(DocsGenError::Render(
                "Cannot render scripts marked NORENDER".to_string(),
            ));
        }
        let (options, mut lines) = RenderOptions::from_meta(meta);
        lines.extend(script_lines);

        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let max_len = (PAGE_WIDTH - options.image_size.0 as f64) / CHAR_WIDTH;
        let script_under = longest as f64 > max_len || meta.contains("ScriptUnder");

        Ok(Self {
            origin,
            image_file: image_file.into(),
            script_lines: lines,
            meta: meta.to_string(),
            options,
            script_under,
        })
    }

    /// True when the script positions the camera itself.
    pub fn sets_viewport(&self) -> bool {
        self.script_lines.iter().any(|l| l.contains("$vp"))
    }

    pub fn image_name(&self) -> String {
        self.image_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> &str {
        self.image_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
    }
}

/// Lines handed to the renderer: includes, common code, then the body with
/// `--` render-only lines unwrapped.
pub fn merge_script(includes: &[String], common_code: &[String], body: &[String]) -> Vec<String> {
    includes
        .iter()
        .chain(common_code)
        .cloned()
        .chain(body.iter().map(|line| {
            let trimmed = line.trim();
            match trimmed.strip_prefix("--") {
                Some(rest) => rest.to_string(),
                None => line.clone(),
            }
        }))
        .collect()
}

/// Lines shown on the page: includes plus the body without render-only lines.
pub fn display_code(includes: &[String], body: &[String]) -> Vec<String> {
    includes
        .iter()
        .chain(body.iter().filter(|line| !line.trim().starts_with("--")))
        .cloned()
        .collect()
}

/// Whether an image block produces a picture at all.
pub fn wants_render(meta: &str, parent_title: &str) -> bool {
    !meta.contains("NORENDER")
        && (["2D", "3D", "Spin", "Anim"].iter().any(|tag| meta.contains(tag))
            || ["File", "LibFile", "Module", "Function&Module"].contains(&parent_title))
}

/// Image extension chosen from the metadata. Animations are GIFs unless
/// `png_animation` asks for animated PNGs.
pub fn image_extension(meta: &str, png_animation: bool) -> &'static str {
    if !png_animation && (meta.contains("Spin") || meta.contains("Anim")) {
        "gif"
    } else {
        "png"
    }
}

pub fn is_gif(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}
