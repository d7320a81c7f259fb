use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use relative_path::RelativePathBuf;

use crate::build::RenderRequest;

use super::{NodeId, Origin};

/// Block titles that declare a documented item.
pub const ITEM_TITLES: [&str; 4] = ["Constant", "Function", "Module", "Function&Module"];

static ARGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("Invalid argument list regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    pub mark: String,
    pub note: String,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInfo {
    /// Prepended to every snippet rendered from this file.
    pub includes: Vec<String>,
    /// Appended after the includes, never shown.
    pub common_code: Vec<String>,
    pub summary: String,
    pub group: String,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInfo {
    pub aliases: Vec<String>,
    pub topics: Vec<String>,
    pub see_also: Vec<String>,
    pub deprecated: bool,
    pub synopsis: String,
    pub syntags: IndexMap<String, String>,
    pub example_num: usize,
}

impl ItemInfo {
    /// Short kind label used in index lines.
    pub fn kind_label(title: &str) -> &str {
        match title {
            "Function" => "Func",
            "Module" => "Mod",
            "Function&Module" => "Func/Mod",
            "Constant" => "Const",
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub header_sets: Vec<Vec<String>>,
    /// One entry per `---`-separated table, each a list of rows of raw cells.
    pub tables: Vec<Vec<Vec<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Figure,
    Example,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub number: usize,
    pub meta: String,
    /// Lines handed to the renderer.
    pub script: Vec<String>,
    /// Lines shown on the page.
    pub code: Vec<String>,
    /// `images/<file-stem>/<name>`, relative to the page.
    pub rel_url: RelativePathBuf,
    /// `rel_url` joined onto the source file's directory, relative to the docs dir.
    pub url: RelativePathBuf,
    pub render: bool,
    pub request: Option<RenderRequest>,
}

impl ImageInfo {
    pub fn is_hidden(&self) -> bool {
        self.meta.contains("Hide")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    File(FileInfo),
    Section,
    Subsection,
    Item(ItemInfo),
    Generic,
    Label,
    Text,
    Headerless,
    BulletList,
    NumberedList,
    Table(TableInfo),
    Image(ImageInfo),
    Includes,
    Synopsis,
    SynTags,
    Topics,
    SeeAlso,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub title: String,
    pub subtitle: String,
    pub body: Vec<String>,
    pub origin: Origin,
    pub figure_num: usize,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
}

impl Node {
    pub fn new(
        kind: NodeKind,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        body: Vec<String>,
        origin: Origin,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            subtitle: subtitle.into(),
            body,
            origin,
            figure_num: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, NodeKind::Item(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    /// Human-facing `Title: subtitle` string.
    ///
    /// `&` in titles reads as `/`, and item argument lists collapse to `()`.
    /// Lookups always use the raw subtitle.
    pub fn display_name(&self) -> String {
        let title = self.title.replace('&', "/");
        if self.is_item() {
            format!("{}: {}", title, ARGS_RE.replace_all(&self.subtitle, "()"))
        } else {
            format!("{}: {}", title, self.subtitle)
        }
    }

    pub fn as_file(&self) -> Option<&FileInfo> {
        match &self.kind {
            NodeKind::File(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileInfo> {
        match &mut self.kind {
            NodeKind::File(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemInfo> {
        match &self.kind {
            NodeKind::Item(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut ItemInfo> {
        match &mut self.kind {
            NodeKind::Item(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageInfo> {
        match &self.kind {
            NodeKind::Image(info) => Some(info),
            _ => None,
        }
    }
}
