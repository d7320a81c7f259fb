use std::sync::LazyLock;

use regex::Regex;

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Size *= *([0-9]+) *x *([0-9]+)").expect("Invalid Size option regex"));
static FRAMES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Frames *= *([0-9]+)").expect("Invalid Frames option regex"));
static FRAME_MS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FrameMS *= *([0-9]+)").expect("Invalid FrameMS option regex"));
static FPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FPS *= *([0-9]+)").expect("Invalid FPS option regex"));
static VPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VPT *= *\[([^\]]+)\]").expect("Invalid VPT option regex"));
static VPR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VPR *= *\[([^\]]+)\]").expect("Invalid VPR option regex"));
static VPD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VPD *= *([0-9]+)").expect("Invalid VPD option regex"));
static COLOR_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ColorScheme *= *([a-zA-Z0-9 ]+)").expect("Invalid ColorScheme option regex"));

pub const DEFAULT_IMAGE_SIZE: (u32, u32) = (320, 240);
pub const DEFAULT_FRAME_MS: u32 = 250;
pub const DEFAULT_ANIMATION_FRAMES: u32 = 36;
pub const DEFAULT_COLOR_SCHEME: &str = "Cornfield";

const CAMERA_3D: [i32; 7] = [0, 0, 0, 55, 0, 25, 444];
const CAMERA_2D: [i32; 7] = [0, 0, 0, 0, 0, 0, 444];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Preview,
    ThrownTogether,
    Render,
    /// Evaluate the script without producing an image.
    TestOnly,
}

/// Renderer settings decoded from an image block's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub mode: RenderMode,
    pub image_size: (u32, u32),
    pub camera: Option<[i32; 7]>,
    pub animation_frames: Option<u32>,
    pub frame_ms: u32,
    pub show_edges: bool,
    pub show_axes: bool,
    pub show_scales: bool,
    pub orthographic: bool,
    pub color_scheme: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Preview,
            image_size: DEFAULT_IMAGE_SIZE,
            camera: None,
            animation_frames: None,
            frame_ms: DEFAULT_FRAME_MS,
            show_edges: false,
            show_axes: true,
            show_scales: true,
            orthographic: true,
            color_scheme: DEFAULT_COLOR_SCHEME.to_string(),
        }
    }
}

impl RenderOptions {
    /// Decodes `meta`, returning the options plus the `$vp*` assignments that
    /// must run before the script.
    ///
    /// Keywords are matched as substrings, so `FlatSpin` also counts as `Spin`.
    pub fn from_meta(meta: &str) -> (Self, Vec<String>) {
        let mut opts = Self {
            show_edges: meta.contains("Edges"),
            show_axes: !meta.contains("NoAxes"),
            show_scales: !meta.contains("NoScales"),
            orthographic: !meta.contains("Perspective"),
            ..Self::default()
        };

        if meta.contains("ThrownTogether") {
            opts.mode = RenderMode::ThrownTogether;
        } else if meta.contains("Render") {
            opts.mode = RenderMode::Render;
        }

        opts.image_size = match SIZE_RE.captures(meta) {
            Some(caps) => (
                caps[1].parse().unwrap_or(DEFAULT_IMAGE_SIZE.0),
                caps[2].parse().unwrap_or(DEFAULT_IMAGE_SIZE.1),
            ),
            None => {
                let scale = if meta.contains("Small") {
                    0.75
                } else if meta.contains("Med") {
                    1.5
                } else if meta.contains("Big") {
                    2.0
                } else if meta.contains("Huge") {
                    2.5
                } else {
                    1.0
                };
                let (w, h) = DEFAULT_IMAGE_SIZE;
                ((w as f64 * scale) as u32, (h as f64 * scale) as u32)
            }
        };

        // Assignments are listed in the order they end up in the script.
        let mut prelude = Vec::new();
        let vpr = VPR_RE.captures(meta).map(|c| c[1].to_string());
        if meta.contains("FlatSpin") {
            prelude.push("$vpr = [55, 0, 360*$t];".to_string());
        } else if meta.contains("Spin") && vpr.is_none() {
            prelude.push("$vpr = [90-45*cos(360*$t), 0, 360*$t];".to_string());
        } else if meta.contains("3D") {
            opts.camera = Some(CAMERA_3D);
        } else if meta.contains("2D") {
            opts.camera = Some(CAMERA_2D);
        }
        if let Some(caps) = VPD_RE.captures(meta) {
            prelude.push(format!("$vpd = {};", &caps[1]));
        }
        if let Some(caps) = VPT_RE.captures(meta) {
            prelude.push(format!("$vpt = [{}];", &caps[1]));
        }
        if let Some(vpr) = vpr {
            prelude.push(format!("$vpr = [{vpr}];"));
        }
        if !prelude.is_empty() {
            opts.camera = None;
        }

        if let Some(fps) = FPS_RE
            .captures(meta)
            .and_then(|c| c[1].parse::<u32>().ok())
            .filter(|fps| *fps > 0)
        {
            opts.frame_ms = 1000 / fps;
        }
        if let Some(ms) = FRAME_MS_RE.captures(meta).and_then(|c| c[1].parse().ok()) {
            opts.frame_ms = ms;
        }

        if meta.contains("Spin") || meta.contains("Anim") {
            opts.animation_frames = Some(DEFAULT_ANIMATION_FRAMES);
        }
        if let Some(frames) = FRAMES_RE.captures(meta).and_then(|c| c[1].parse().ok()) {
            opts.animation_frames = Some(frames);
        }

        if let Some(caps) = COLOR_SCHEME_RE.captures(meta) {
            opts.color_scheme = caps[1].trim().to_string();
        }

        (opts, prelude)
    }

    pub fn is_animated(&self) -> bool {
        self.animation_frames.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn defaults_for_empty_meta() {
        let (opts, prelude) = RenderOptions::from_meta("");
        assert_eq!(opts, RenderOptions::default());
        assert!(prelude.is_empty());
    }

    #[rstest]
    #[case("Small", (240, 180))]
    #[case("Med", (480, 360))]
    #[case("Big", (640, 480))]
    #[case("Huge", (800, 600))]
    #[case("Size=100x50", (100, 50))]
    #[case("Size = 100 x 50;Big", (100, 50))]
    fn image_sizes(#[case] meta: &str, #[case] size: (u32, u32)) {
        assert_eq!(RenderOptions::from_meta(meta).0.image_size, size);
    }

    #[test]
    fn camera_presets() {
        assert_eq!(RenderOptions::from_meta("3D").0.camera, Some(CAMERA_3D));
        assert_eq!(RenderOptions::from_meta("2D").0.camera, Some(CAMERA_2D));
    }

    #[test]
    fn viewport_assignments_replace_the_camera() {
        let (opts, prelude) = RenderOptions::from_meta("3D;VPD=300;VPT=[1,2,3]");

        assert_eq!(opts.camera, None);
        assert_eq!(prelude, vec!["$vpd = 300;", "$vpt = [1,2,3];"]);
    }

    #[test]
    fn spin_animates_and_rotates() {
        let (opts, prelude) = RenderOptions::from_meta("Spin;FPS=10");

        assert_eq!(opts.animation_frames, Some(36));
        assert_eq!(opts.frame_ms, 100);
        assert_eq!(prelude, vec!["$vpr = [90-45*cos(360*$t), 0, 360*$t];"]);
        assert!(opts.is_animated());
    }

    #[test]
    fn spin_with_explicit_rotation() {
        let (_, prelude) = RenderOptions::from_meta("Spin;VPR=[10,20,30]");
        assert_eq!(prelude, vec!["$vpr = [10,20,30];"]);
    }

    #[test]
    fn flat_spin_and_frames() {
        let (opts, prelude) = RenderOptions::from_meta("FlatSpin;Frames=12;FrameMS=40");

        assert_eq!(prelude, vec!["$vpr = [55, 0, 360*$t];"]);
        assert_eq!(opts.animation_frames, Some(12));
        assert_eq!(opts.frame_ms, 40);
    }

    #[test]
    fn display_flags_and_modes() {
        let (opts, _) =
            RenderOptions::from_meta("Render;Edges;NoAxes;NoScales;Perspective;ColorScheme=Tomorrow Night");

        assert_eq!(opts.mode, RenderMode::Render);
        assert!(opts.show_edges);
        assert!(!opts.show_axes);
        assert!(!opts.show_scales);
        assert!(!opts.orthographic);
        assert_eq!(opts.color_scheme, "Tomorrow Night");
    }

    #[test]
    fn thrown_together_wins_over_render() {
        let (opts, _) = RenderOptions::from_meta("ThrownTogether");
        assert_eq!(opts.mode, RenderMode::ThrownTogether);
    }

    #[test]
    fn option_patterns_compile() {
        for re in [
            &SIZE_RE,
            &FRAMES_RE,
            &FRAME_MS_RE,
            &FPS_RE,
            &VPT_RE,
            &VPR_RE,
            &VPD_RE,
            &COLOR_SCHEME_RE,
        ] {
            assert!(!re.as_str().is_empty());
        }
    }
}
