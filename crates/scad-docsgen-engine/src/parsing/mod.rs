//! # Block Parsing
//!
//! Turns documentation comments into the [`Document`](crate::model::Document) tree.
//!
//! ## Parsing Phases
//!
//! 1. **Line Classification** (`classify`): each line is a block header
//!    (`// Title(meta): subtitle`), a comment, or something else. Bodies are
//!    read and de-dented against their first line.
//!
//! 2. **Tree Construction** (`builder`): a `DocsParser` dispatches each header
//!    through the rc directives, the structural blocks, the `BlockRegistry`
//!    and finally the item declarations, placing nodes at the `ParseCursor`.
//!
//! ## Modules
//!
//! - **`classify`**: `CommentLineClassifier`, `BlockHeader`, body reading
//! - **`registry`**: `BlockRegistry` of string-keyed `BlockRule`s, extended by `DefineHeader`
//! - **`cursor`**: `ParseCursor`, the open file/section/subsection/item
//! - **`builder`**: `DocsParser`
//!
//! ## Key Invariants
//!
//! - A malformed block is logged and skipped; parsing resumes at the next header
//! - Item names are unique across every parsed file, aliases included
//! - Image blocks only describe their render request; nothing runs while parsing

pub mod builder;
pub mod classify;
pub mod cursor;
pub mod registry;

pub use builder::{DocsParser, RC_FILE};
pub use classify::{BlockHeader, CommentLineClassifier, LineClass};
pub use cursor::ParseCursor;
pub use registry::{BlockCallback, BlockContext, BlockRegistry, BlockRule, BlockShape, ParentRule};
