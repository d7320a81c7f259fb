//! # Image Builds
//!
//! Image and example blocks are turned into [`RenderRequest`]s while parsing.
//! Nothing is run then: a [`BuildPipeline`] executes queued requests through a
//! [`Renderer`] and commits only artifacts that visibly changed.

mod compare;
mod options;
mod pipeline;
mod renderer;
mod request;

pub use compare::{MAX_RMS, artifacts_match, is_animated_png, rms_difference};
pub use options::{RenderMode, RenderOptions};
pub use pipeline::{BuildPipeline, RenderReport, RequestStatus, failure_report};
pub use renderer::{OpenScadRenderer, RenderInvocation, RenderOutput, Renderer, assemble_apng, assemble_gif};
pub use request::{RenderRequest, display_code, image_extension, is_gif, merge_script, wants_render};
