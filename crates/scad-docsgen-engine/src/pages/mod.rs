//! # Page Rendering
//!
//! Turns the parsed document tree into markdown lines. Every source file gets
//! its own page; the index pages (table of contents, topic index and
//! alphabetical index) are built from all files at once in [`index`].
//!
//! Rendering happens after every file is parsed, so `{{name}}` links can
//! point at items declared anywhere. Unresolved links are logged against the
//! block that contains them and rendered as plain text.

mod index;

use crate::model::{Document, ImageKind, ItemInfo, NodeId, NodeKind, Origin};
use crate::report::ErrorLog;
use crate::target::{
    FILE_LEVEL, ITEM_LEVEL, ImageEmbed, IndexPage, SECTION_LEVEL, SUBSECTION_LEVEL, Target,
};
use crate::xref::CrossRefs;

const ITEM_FRONT: [&[&str]; 6] = [
    &["Status"],
    &["Alias"],
    &["Synopsis"],
    &["Topics"],
    &["See Also"],
    &["Usage"],
];
const ITEM_BACK: [&[&str]; 1] = [&["Example"]];
const SYNTAG_WRAP: &str = "[<abbr>{}</abbr>]";
const INCLUDES_NOTE: &str = "To use, add the following lines to the beginning of your file:";

/// Renders pages of one parsed document through a target dialect.
pub struct PageWriter<'a> {
    doc: &'a Document,
    xrefs: &'a CrossRefs,
    target: &'a dyn Target,
}

impl<'a> PageWriter<'a> {
    pub fn new(doc: &'a Document, xrefs: &'a CrossRefs, target: &'a dyn Target) -> Self {
        Self { doc, xrefs, target }
    }

    pub fn target(&self) -> &dyn Target {
        self.target
    }

    /// The full page for one source file, postprocessed by the target.
    pub fn file_page(&self, file: NodeId, log: &mut ErrorLog) -> Vec<String> {
        self.target.postprocess(self.node_lines(file, log))
    }

    fn node_lines(&self, id: NodeId, log: &mut ErrorLog) -> Vec<String> {
        let node = self.doc.node(id);
        let t = self.target;
        match &node.kind {
            NodeKind::File(_) => self.file_lines(id, log),
            NodeKind::Section => self.section_lines(id, SECTION_LEVEL, log),
            NodeKind::Subsection => self.section_lines(id, SUBSECTION_LEVEL, log),
            NodeKind::Item(_) => {
                let mut out = t.header(&node.display_name(), ITEM_LEVEL, true);
                for child in self.doc.sorted_children(id, &ITEM_FRONT, &ITEM_BACK) {
                    out.extend(self.node_lines(child, log));
                }
                out.extend(t.horizontal_rule());
                out
            }
            NodeKind::Generic | NodeKind::Label | NodeKind::Text => {
                let sub = self.escaped_links(&node.subtitle, &node.origin, log);
                let mut out = t.block_header(&node.title, &sub, false);
                out.extend(self.markdown_body(id, log));
                out.push(String::new());
                out
            }
            NodeKind::Headerless => {
                let mut out = vec![String::new()];
                out.extend(self.markdown_body(id, log));
                out.push(String::new());
                out
            }
            NodeKind::BulletList | NodeKind::NumberedList => {
                let sub = self.escaped_links(&node.subtitle, &node.origin, log);
                let mut out = t.block_header(&node.title, &sub, false);
                if matches!(node.kind, NodeKind::BulletList) {
                    out.extend(t.bullet_list(&node.body));
                } else {
                    out.extend(t.numbered_list(&node.body));
                }
                out
            }
            NodeKind::Table(table) => {
                let sub = self.escaped_links(&node.subtitle, &node.origin, log);
                let mut out = t.block_header(&node.title, &sub, false);
                for (headers, rows) in table.header_sets.iter().zip(&table.tables) {
                    if rows.is_empty() {
                        continue;
                    }
                    let rows: Vec<Vec<String>> = rows
                        .iter()
                        .map(|row| {
                            row.iter()
                                .map(|cell| self.links(cell, &node.origin, log))
                                .collect()
                        })
                        .collect();
                    out.extend(t.table(headers, &rows));
                }
                out
            }
            NodeKind::Includes => {
                if node.body.is_empty() {
                    return Vec::new();
                }
                let mut out = t.markdown_block(&[INCLUDES_NOTE.to_string()]);
                out.extend(t.markdown_block(&t.indent_lines(&node.body)));
                out
            }
            NodeKind::Synopsis => {
                let tags = self
                    .doc
                    .parent(id)
                    .and_then(|p| self.doc.node(p).as_item())
                    .map(|info| t.mouseover_tags(&info.syntags, None, "sup", SYNTAG_WRAP))
                    .unwrap_or_default();
                let sub = self.escaped_links(&node.subtitle, &node.origin, log);
                t.block_header(&node.title, &format!("{sub}{tags}"), false)
            }
            NodeKind::SynTags => Vec::new(),
            NodeKind::Topics => {
                let page = t.page_link(IndexPage::Topics);
                let links: Vec<String> = node
                    .subtitle
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|topic| t.get_link(topic, &t.header_link(topic), &page, false))
                    .collect();
                t.block_header(&node.title, &links.join(", "), false)
            }
            NodeKind::SeeAlso => {
                let owner = self.doc.parent(id).unwrap_or(id);
                let names = self
                    .doc
                    .node(owner)
                    .as_item()
                    .map(|info| info.see_also.clone())
                    .unwrap_or_default();
                let links: Vec<String> = self
                    .xrefs
                    .resolve_see_also(&names, owner, &node.origin, log)
                    .into_iter()
                    .map(|item| self.item_link(item, Some(&node.origin.file), None, false))
                    .collect();
                t.block_header(&node.title, &links.join(", "), false)
            }
            NodeKind::Image(_) => self.image_lines(id, log),
        }
    }

    fn file_lines(&self, id: NodeId, log: &mut ErrorLog) -> Vec<String> {
        let t = self.target;
        let node = self.doc.node(id);
        let mut out = t.header(&node.display_name(), FILE_LEVEL, true);
        out.extend(t.markdown_block(&self.markdown_body(id, log)));
        let (sections, others): (Vec<NodeId>, Vec<NodeId>) = self
            .doc
            .children(id)
            .iter()
            .copied()
            .partition(|c| matches!(self.doc.node(*c).kind, NodeKind::Section));
        for child in others {
            out.extend(self.node_lines(child, log));
        }
        out.extend(t.header("File Contents", SECTION_LEVEL, true));
        for (n, section) in sections.iter().enumerate() {
            out.extend(self.toc_lines(*section, n + 1, &node.origin.file));
        }
        out.push(String::new());
        for section in sections {
            out.extend(self.node_lines(section, log));
        }
        out
    }

    fn section_lines(&self, id: NodeId, level: usize, log: &mut ErrorLog) -> Vec<String> {
        let t = self.target;
        let node = self.doc.node(id);
        let mut out = Vec::new();
        if !node.subtitle.is_empty() {
            out.extend(t.header(&node.display_name(), level, true));
            out.extend(t.markdown_block(&self.markdown_body(id, log)));
        }
        for child in self.doc.children(id) {
            out.extend(self.node_lines(*child, log));
        }
        out
    }

    fn image_lines(&self, id: NodeId, log: &mut ErrorLog) -> Vec<String> {
        let node = self.doc.node(id);
        let Some(info) = node.as_image() else {
            return Vec::new();
        };
        if info.is_hidden() {
            return Vec::new();
        }
        let item = self
            .doc
            .parent(id)
            .map(|p| self.doc.node(p).subtitle.as_str())
            .unwrap_or_default();
        let subtitle = self.escaped_links(&node.subtitle, &node.origin, log);
        let (code_below, size) = match &info.request {
            Some(req) => (req.script_under, Some(req.options.image_size)),
            None => (false, None),
        };
        let no_code: &[String] = &[];
        let (code, rel_url) = match info.kind {
            ImageKind::Figure => (no_code, Some(info.rel_url.as_str())),
            _ if !info.render => (info.code.as_slice(), None),
            _ => (info.code.as_slice(), Some(info.rel_url.as_str())),
        };
        self.target.image_block(&ImageEmbed {
            item,
            title: &node.title,
            subtitle: &subtitle,
            code,
            code_below,
            rel_url,
            width: size.map(|s| s.0),
            height: size.map(|s| s.1),
        })
    }

    /// Body lines with links expanded. Fenced and indented code is verbatim
    /// and a lone `.` is a blank line.
    fn markdown_body(&self, id: NodeId, log: &mut ErrorLog) -> Vec<String> {
        let node = self.doc.node(id);
        let mut in_block = false;
        let mut out = Vec::with_capacity(node.body.len());
        for line in &node.body {
            if line.starts_with("```") {
                in_block = !in_block;
            }
            if in_block || line.starts_with("    ") {
                out.push(line.clone());
            } else if line == "." {
                out.push(String::new());
            } else {
                out.push(self.links(line, &node.origin, log));
            }
        }
        out
    }

    /// Expands `{{name}}` links relative to the page of `origin`.
    fn links(&self, text: &str, origin: &Origin, log: &mut ErrorLog) -> String {
        self.xrefs.expand_links(text, origin, log, |item| {
            self.item_link(item, Some(&origin.file), None, true)
        })
    }

    /// Like `links`, escaping everything but the generated links.
    fn escaped_links(&self, text: &str, origin: &Origin, log: &mut ErrorLog) -> String {
        self.xrefs.expand_links_escaped(
            text,
            origin,
            log,
            |plain| self.target.escape_entities(plain),
            |item| self.item_link(item, Some(&origin.file), None, true),
        )
    }

    /// The page a link must name: empty when linking within `current`.
    fn link_file<'b>(&self, origin: &'b Origin, current: Option<&str>) -> &'b str {
        match current {
            Some(current) if current != origin.file => &origin.file,
            _ => "",
        }
    }

    pub fn item_link(&self, id: NodeId, current: Option<&str>, label: Option<&str>, literalize: bool) -> String {
        let node = self.doc.node(id);
        let anchor = self
            .target
            .header_link(&format!("{}: {}", node.title, node.subtitle));
        self.target.get_link(
            label.unwrap_or(&node.subtitle),
            &anchor,
            self.link_file(&node.origin, current),
            literalize,
        )
    }

    fn section_link(&self, id: NodeId, current: Option<&str>, label: Option<&str>) -> String {
        let node = self.doc.node(id);
        let name = node.display_name();
        self.target.get_link(
            label.unwrap_or(&name),
            &self.target.header_link(&name),
            self.link_file(&node.origin, current),
            false,
        )
    }

    fn file_link(&self, id: NodeId, current: Option<&str>, label: &str) -> String {
        let node = self.doc.node(id);
        self.target
            .get_link(label, "", self.link_file(&node.origin, current), false)
    }

    /// ` – synopsis` plus syntag abbreviations, or nothing. Bad links were
    /// already logged when the Synopsis block rendered.
    fn synopsis(&self, id: NodeId) -> String {
        let node = self.doc.node(id);
        let Some(info) = node.as_item() else {
            return String::new();
        };
        let dash = if info.synopsis.is_empty() && info.syntags.is_empty() {
            ""
        } else {
            " – "
        };
        format!(
            "{dash}{}{}",
            self.xrefs.render_links_escaped(
                &info.synopsis,
                |plain| self.target.escape_entities(plain),
                |item| self.item_link(item, Some(&node.origin.file), None, true),
            ),
            self.target
                .mouseover_tags(&info.syntags, None, "sup", SYNTAG_WRAP)
        )
    }

    /// `link Kind – synopsis`, as listed in the index pages.
    pub fn index_line(&self, id: NodeId, current: &str) -> String {
        let title = &self.doc.node(id).title;
        format!(
            "{} {}{}",
            self.item_link(id, Some(current), None, true),
            ItemInfo::kind_label(title),
            self.synopsis(id)
        )
    }

    fn items_of(&self, id: NodeId) -> Vec<NodeId> {
        self.doc
            .children(id)
            .iter()
            .copied()
            .filter(|c| self.doc.node(*c).is_item())
            .collect()
    }

    fn subsections_of(&self, id: NodeId) -> Vec<NodeId> {
        self.doc
            .children(id)
            .iter()
            .copied()
            .filter(|c| matches!(self.doc.node(*c).kind, NodeKind::Subsection))
            .collect()
    }

    /// In-page contents entry for a section or subsection.
    fn toc_lines(&self, id: NodeId, n: usize, current: &str) -> Vec<String> {
        let t = self.target;
        let mut lines = Vec::new();
        let subsections = self.subsections_of(id);
        if !subsections.is_empty() {
            for (num, sub) in subsections.iter().enumerate() {
                lines.extend(self.toc_lines(*sub, num + 1, current));
            }
            lines.push(String::new());
        }
        for item in self.items_of(id) {
            let entry = format!(
                "{}{}",
                self.item_link(item, Some(current), None, true),
                self.synopsis(item)
            );
            lines.push(t.bullet_list_item(&entry));
        }
        let node = self.doc.node(id);
        let mut out = Vec::new();
        if !node.subtitle.is_empty() {
            out.push(t.numbered_list_item(n, &self.section_link(id, Some(current), None)));
            if !lines.is_empty() {
                out.extend(t.indent_lines(&lines));
                out.push(String::new());
            }
        } else if !lines.is_empty() {
            out.extend(lines);
            out.push(String::new());
        }
        out
    }

    /// Entry for one file on the table of contents page.
    fn tocfile_lines(&self, file: NodeId, n: usize, current: &str) -> Vec<String> {
        let t = self.target;
        let node = self.doc.node(file);
        let link = self.file_link(file, Some(current), &node.subtitle);
        let mut out = t.header(&format!("{n}. {link}"), SECTION_LEVEL, false);
        if let Some(info) = node.as_file() {
            if !info.summary.is_empty() {
                out.push(t.line_with_break(&info.summary));
            }
            for footnote in &info.footnotes {
                out.push(t.line_with_break(&t.italics(&footnote.note)));
            }
        }
        for section in self.doc.children(file) {
            if matches!(self.doc.node(*section).kind, NodeKind::Section) {
                out.extend(self.section_tocfile_lines(*section, current));
            }
        }
        out.push(String::new());
        out
    }

    fn section_tocfile_lines(&self, id: NodeId, current: &str) -> Vec<String> {
        let t = self.target;
        let node = self.doc.node(id);
        let mut out = Vec::new();
        let subsections = self.subsections_of(id);
        if !node.subtitle.is_empty() {
            let link = self.section_link(id, Some(current), Some(&node.subtitle));
            out.push(t.line_with_break(&t.bullet_list_item(&link)));
            if !subsections.is_empty() {
                for sub in &subsections {
                    let lines = self.subsection_tocfile_lines(*sub, current);
                    out.extend(t.indent_lines(&lines));
                }
                out.push(String::new());
            }
        } else {
            for sub in &subsections {
                out.extend(self.subsection_tocfile_lines(*sub, current));
            }
        }
        let index: Vec<String> = self
            .items_of(id)
            .into_iter()
            .map(|item| self.index_line(item, current))
            .collect();
        out.extend(t.indent_lines(&t.bullet_list(&index)));
        out
    }

    fn subsection_tocfile_lines(&self, id: NodeId, current: &str) -> Vec<String> {
        let t = self.target;
        let node = self.doc.node(id);
        let link = self.section_link(id, Some(current), Some(&node.subtitle));
        let mut out = vec![t.bullet_list_item(&link)];
        let index: Vec<String> = self
            .items_of(id)
            .into_iter()
            .map(|item| self.index_line(item, current))
            .collect();
        if !index.is_empty() {
            out.extend(t.indent_lines(&t.bullet_list(&index)));
        }
        out
    }
}
