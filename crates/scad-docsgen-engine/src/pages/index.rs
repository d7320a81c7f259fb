//! Pages spanning every parsed file.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::DocsGenError;
use crate::model::NodeId;
use crate::report::ErrorLog;
use crate::target::{FILE_LEVEL, ITEM_LEVEL, IndexPage, SECTION_LEVEL, SUBSECTION_LEVEL};

use super::PageWriter;

const FOOTNOTES_ANCHOR: &str = "#file-footnotes";
const SIDEBAR_FOOTNOTES_ANCHOR: &str = "#footnotes";
const UNGROUPED: &str = "Miscellaneous";
const CHEAT_LINE_WIDTH: usize = 80;
const CHEAT_PART_WIDTH: usize = 40;
const CHEAT_SEPARATOR: &str = "&nbsp; &nbsp; ";

/// Index bucket for a name: its uppercased first letter, or `0`.
fn index_letter(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => c.to_uppercase().collect(),
        _ => "0".to_string(),
    }
}

impl PageWriter<'_> {
    /// Group names in display order: named groups as first seen, then the
    /// ungrouped files under the empty name.
    fn file_groups(&self, files: &[NodeId]) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for named in [true, false] {
            for file in files {
                let group = self
                    .doc
                    .node(*file)
                    .as_file()
                    .map(|f| f.group.as_str())
                    .unwrap_or_default();
                if group.is_empty() != named && !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// Adds the footnotes of `file` to `seen`. A mark that comes back with a
    /// different note keeps its first note and is logged.
    fn gather_footnotes(&self, file: NodeId, seen: &mut IndexMap<String, String>, log: &mut ErrorLog) {
        let Some(info) = self.doc.node(file).as_file() else {
            return;
        };
        for footnote in &info.footnotes {
            match seen.get(&footnote.mark) {
                None => {
                    seen.insert(footnote.mark.clone(), footnote.note.clone());
                }
                Some(prev) if *prev != footnote.note => log.record(
                    &footnote.origin,
                    &DocsGenError::structural(
                        "FileFootnotes",
                        format!(
                            "Footnote \"{}\" conflicts with previous definition \"{prev}\", while declaring block:",
                            footnote.note
                        ),
                    ),
                ),
                Some(_) => {}
            }
        }
    }

    /// Every item name and alias with its item, sorted case-insensitively.
    fn indexed_names(&self) -> Vec<(String, NodeId)> {
        let mut names: Vec<(String, NodeId)> = Vec::new();
        for item in self.doc.items() {
            let node = self.doc.node(item);
            names.push((node.subtitle.clone(), item));
            if let Some(info) = node.as_item() {
                names.extend(info.aliases.iter().map(|a| (a.clone(), item)));
            }
        }
        names.sort_by_key(|(name, _)| name.to_lowercase());
        names
    }

    /// The table of contents: files by group with their footnotes, then
    /// every file's sections and items. `files` is in display order.
    pub fn toc_page(&self, files: &[NodeId], log: &mut ErrorLog) -> Vec<String> {
        let t = self.target;
        let current = t.page_file(IndexPage::Toc);

        let mut footnotes: IndexMap<String, String> = IndexMap::new();
        let mut out = t.header("Table of Contents", FILE_LEVEL, true);
        out.extend(t.header("List of Files", SECTION_LEVEL, true));
        for group in self.file_groups(files) {
            let title = if group.is_empty() { UNGROUPED } else { group };
            out.extend(t.block_header(title, "", true));
            for (fnum, file) in files.iter().enumerate() {
                let node = self.doc.node(*file);
                let Some(info) = node.as_file() else {
                    continue;
                };
                if info.group != group {
                    continue;
                }
                let name = &node.subtitle;
                let anchor = t.header_link(&format!("{}. {name}", fnum + 1));
                let link = t.get_link(name, &anchor, "", false);
                let docs = t.get_link("docs", "", name, false);
                let tags: IndexMap<String, String> = info
                    .footnotes
                    .iter()
                    .map(|f| (f.mark.clone(), f.note.clone()))
                    .collect();
                let marks = t.mouseover_tags(&tags, Some(FOOTNOTES_ANCHOR), "sup", "{}");
                out.push(t.bullet_list_item(&format!("{link} ({docs}){marks}")));
                out.push(info.summary.clone());
                self.gather_footnotes(*file, &mut footnotes, log);
            }
            out.push(String::new());
        }

        if !footnotes.is_empty() {
            out.push(String::new());
            out.extend(t.header("File Footnotes:", SUBSECTION_LEVEL, true));
            for (mark, note) in &footnotes {
                out.push(format!("{mark} = {note}  "));
            }
            out.push(String::new());
        }

        for (fnum, file) in files.iter().enumerate() {
            out.extend(self.tocfile_lines(*file, fnum + 1, &current));
        }
        t.postprocess(out)
    }

    /// Topics in alphabetical buckets, each listing the items tagged with it.
    pub fn topics_page(&self) -> Vec<String> {
        let t = self.target;
        let current = t.page_file(IndexPage::Topics);

        let mut by_letter: BTreeMap<String, BTreeMap<String, Vec<(String, NodeId)>>> = BTreeMap::new();
        for item in self.doc.items() {
            let node = self.doc.node(item);
            let Some(info) = node.as_item() else {
                continue;
            };
            let names = std::iter::once(&node.subtitle).chain(&info.aliases);
            for topic in &info.topics {
                let entries = by_letter
                    .entry(index_letter(topic))
                    .or_default()
                    .entry(topic.clone())
                    .or_default();
                entries.extend(names.clone().map(|n| (n.clone(), item)));
            }
        }

        let mut out = t.header("Topic Index", FILE_LEVEL, true);
        out.extend(t.markdown_block(&[
            "An index of topics, with related functions, modules, and constants.".to_string(),
        ]));
        for (letter, topics) in &by_letter {
            let links: Vec<String> = topics
                .keys()
                .map(|topic| t.get_link(topic, &t.header_link(topic), "", false))
                .collect();
            out.extend(t.markdown_block(&[format!("{}: {}", t.bold(letter), links.join(", "))]));
        }
        for topics in by_letter.values() {
            for (topic, entries) in topics {
                let mut entries = entries.clone();
                entries.sort_by_key(|(name, _)| name.to_lowercase());
                out.extend(t.header(topic, ITEM_LEVEL, true));
                let lines: Vec<String> = entries
                    .iter()
                    .map(|(_, item)| self.index_line(*item, &current))
                    .collect();
                out.extend(t.bullet_list(&lines));
            }
        }
        t.postprocess(out)
    }

    /// Every item name and alias, bucketed by first letter.
    pub fn alpha_index_page(&self) -> Vec<String> {
        let t = self.target;
        let current = t.page_file(IndexPage::AlphaIndex);

        let mut by_letter: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for (name, item) in self.indexed_names() {
            by_letter.entry(index_letter(&name)).or_default().push(item);
        }

        let mut out = t.header("Alphabetical Index", FILE_LEVEL, true);
        out.extend(t.markdown_block(&[
            "An index of Functions, Modules, and Constants by name.".to_string(),
        ]));
        let letters: Vec<String> = by_letter
            .keys()
            .map(|l| t.get_link(l, l, "", false))
            .collect();
        out.extend(t.markdown_block(&[letters.join("  ")]));
        for (letter, items) in &by_letter {
            let lines: Vec<String> = items
                .iter()
                .map(|item| self.index_line(*item, &current))
                .collect();
            out.extend(t.header(letter, SUBSECTION_LEVEL, true));
            out.extend(t.bullet_list(&lines));
        }
        t.postprocess(out)
    }

    /// Every Usage line of every item, file by file in `files` order, with
    /// the item name linked.
    pub fn cheat_sheet_page(&self, files: &[NodeId], project: Option<&str>) -> Vec<String> {
        let t = self.target;
        let title = match project {
            Some(name) => format!("{name} Cheat Sheet"),
            None => "Cheat Sheet".to_string(),
        };
        let mut out = t.header(&title, FILE_LEVEL, true);
        for file in files {
            let mut lines = Vec::new();
            for section in self.doc.children_titled(*file, &["Section"]) {
                lines.extend(self.section_cheat_lines(section));
            }
            if !lines.is_empty() {
                let node = self.doc.node(*file);
                out.extend(t.header(&format!("{}: {}", node.title, node.subtitle), SUBSECTION_LEVEL, true));
                out.extend(lines);
            }
        }
        t.postprocess(out)
    }

    fn section_cheat_lines(&self, section: NodeId) -> Vec<String> {
        let t = self.target;
        let current = t.page_file(IndexPage::CheatSheet);
        let mut consts = Vec::new();
        for item in self.doc.children_titled(section, &["Constant"]) {
            consts.push(self.item_link(item, Some(&current), None, true));
            if let Some(info) = self.doc.node(item).as_item() {
                for alias in &info.aliases {
                    consts.push(self.item_link(item, Some(&current), Some(alias), true));
                }
            }
        }
        let mut items = Vec::new();
        for item in self.doc.children_titled(section, &["Function", "Module", "Function&Module"]) {
            items.extend(self.item_cheat_lines(item, &current));
        }
        if consts.is_empty() && items.is_empty() {
            return Vec::new();
        }
        let node = self.doc.node(section);
        let mut out = t.header(&format!("{}: {}", node.title, node.subtitle), ITEM_LEVEL, true);
        if !consts.is_empty() {
            out.push(format!("Constants: {}", consts.join(" ")));
        }
        out.extend(items);
        out.push(String::new());
        out
    }

    /// Usage lines as quoted code spans, packed up to `CHEAT_LINE_WIDTH`
    /// source characters per quote line. Long usages get a line of their own.
    fn item_cheat_lines(&self, item: NodeId, current: &str) -> Vec<String> {
        let t = self.target;
        let name: String = self
            .doc
            .node(item)
            .subtitle
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$'))
            .collect();
        let link = self.item_link(item, Some(current), Some(&name), false);
        let escaped_name = t.escape_entities(&name);

        let mut out = Vec::new();
        let mut line = String::new();
        let mut line_len = 0;
        for usage in self.doc.children_titled(item, &["Usage"]) {
            for usage_line in &self.doc.node(usage).body {
                let len = usage_line.chars().count();
                let part = t.escape_entities(usage_line).replace(&escaped_name, &link);
                let part = t.line_with_break(&t.code_span(&part));
                if line_len + len > CHEAT_LINE_WIDTH || len > CHEAT_PART_WIDTH {
                    if !line.is_empty() {
                        out.extend(t.quote(&[std::mem::take(&mut line)]));
                    }
                    line = part;
                    line_len = len;
                } else {
                    if !line.is_empty() {
                        line.push_str(CHEAT_SEPARATOR);
                    }
                    line.push_str(&part);
                    line_len += len;
                }
            }
        }
        if !line.is_empty() {
            out.extend(t.quote(&[line]));
            out.push(String::new());
        }
        out
    }

    /// Navigation sidebar: links to the index pages, then every file by
    /// group with its footnote marks.
    pub fn sidebar_page(&self, files: &[NodeId], log: &mut ErrorLog) -> Vec<String> {
        let t = self.target;
        let mut out: Vec<String> = [
            ("Table of Contents", IndexPage::Toc),
            ("Function Index", IndexPage::AlphaIndex),
            ("Topics Index", IndexPage::Topics),
            ("Cheat Sheet", IndexPage::CheatSheet),
        ]
        .iter()
        .map(|(label, page)| t.line_with_break(&t.get_link(label, "", &t.page_link(*page), false)))
        .collect();
        out.push(String::new());
        out.extend(t.header("List of Files:", SUBSECTION_LEVEL, true));

        let mut footnotes: IndexMap<String, String> = IndexMap::new();
        for group in self.file_groups(files) {
            let title = if group.is_empty() { UNGROUPED } else { group };
            out.extend(t.block_header(title, "", true));
            let mut entries = Vec::new();
            for file in files {
                let node = self.doc.node(*file);
                let Some(info) = node.as_file() else {
                    continue;
                };
                if info.group != group {
                    continue;
                }
                self.gather_footnotes(*file, &mut footnotes, log);
                let tags: IndexMap<String, String> = info
                    .footnotes
                    .iter()
                    .map(|f| (f.mark.clone(), f.note.clone()))
                    .collect();
                let marks = t.mouseover_tags(&tags, Some(SIDEBAR_FOOTNOTES_ANCHOR), "sup", "{}");
                let link = t.get_link(&node.subtitle, "", &node.subtitle, false);
                entries.push(format!("{link}{marks}"));
            }
            out.extend(t.bullet_list(&entries));
        }

        if !footnotes.is_empty() {
            out.push(String::new());
            out.extend(t.header("Footnotes:", SUBSECTION_LEVEL, true));
            for (mark, note) in &footnotes {
                out.push(format!("{mark} = {note}  "));
            }
        }
        t.postprocess(out)
    }
}
