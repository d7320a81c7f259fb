pub mod build;
pub mod cache;
pub mod docsgen;
pub mod error;
pub mod mdimggen;
pub mod model;
pub mod pages;
pub mod parsing;
pub mod report;
pub mod target;
pub mod xref;

// Re-export key types for easier usage
pub use build::{BuildPipeline, OpenScadRenderer, RenderOutput, RenderReport, RenderRequest, Renderer, RequestStatus};
pub use cache::FileHashes;
pub use docsgen::{DocsGen, RunSummary};
pub use error::DocsGenError;
pub use mdimggen::{ConvertedPage, MarkdownImageGen};
pub use model::{Document, Node, NodeId, NodeKind, Origin};
pub use pages::PageWriter;
pub use parsing::{DocsParser, RC_FILE};
pub use report::{ErrorLog, REPORT_FILE, Severity};
pub use target::{IndexPage, Target, TargetRegistry};
pub use xref::CrossRefs;
