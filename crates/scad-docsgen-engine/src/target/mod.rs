//! # Output Targets
//!
//! A [`Target`] knows how one markdown dialect spells headers, links, lists,
//! tables and embedded images. Every method has a default that produces
//! plain wiki markdown; dialects override only what differs. Page renderers
//! never format markdown themselves, they always go through a target.
//!
//! Targets are selected by profile name through a [`TargetRegistry`].

mod markdown;
mod profiles;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::DocsGenError;

pub use markdown::{escape_entities, header_link, indent_lines};
pub use profiles::{GitHubWikiTarget, MkDocsTarget, WikiTarget};

pub const FILE_LEVEL: usize = 1;
pub const SECTION_LEVEL: usize = 2;
pub const SUBSECTION_LEVEL: usize = 2;
pub const ITEM_LEVEL: usize = 3;

/// The index pages generated next to the per-file pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPage {
    Toc,
    Topics,
    AlphaIndex,
    CheatSheet,
    Sidebar,
}

/// An image with its caption and the code shown beside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageEmbed<'a> {
    /// Name of the item or file the image illustrates.
    pub item: &'a str,
    pub title: &'a str,
    /// Already escaped.
    pub subtitle: &'a str,
    pub code: &'a [String],
    pub code_below: bool,
    pub rel_url: Option<&'a str>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A markdown dialect.
pub trait Target {
    /// Profile name, as given to `--target-profile`.
    fn name(&self) -> &str;

    fn suffix(&self) -> &str {
        ".md"
    }

    /// Link name of an index page, without suffix.
    fn page_link(&self, page: IndexPage) -> String {
        match page {
            IndexPage::Toc => "TOC",
            IndexPage::Topics => "Topics",
            IndexPage::AlphaIndex => "AlphaIndex",
            IndexPage::CheatSheet => "CheatSheet",
            IndexPage::Sidebar => "_Sidebar",
        }
        .to_string()
    }

    /// File name an index page is written to.
    fn page_file(&self, page: IndexPage) -> String {
        format!("{}{}", self.page_link(page), self.suffix())
    }

    /// Final rewrite of a page's lines before they are written.
    fn postprocess(&self, lines: Vec<String>) -> Vec<String> {
        lines
    }

    fn escape_entities(&self, text: &str) -> String {
        escape_entities(text)
    }

    fn header_link(&self, name: &str) -> String {
        header_link(name)
    }

    fn bold(&self, text: &str) -> String {
        format!("**{text}**")
    }

    fn italics(&self, text: &str) -> String {
        format!("*{text}*")
    }

    fn line_with_break(&self, line: &str) -> String {
        format!("{line}  ")
    }

    fn quote(&self, lines: &[String]) -> Vec<String> {
        lines.iter().map(|l| format!(">{l}")).collect()
    }

    fn indent_lines(&self, lines: &[String]) -> Vec<String> {
        indent_lines(lines)
    }

    fn code_span(&self, text: &str) -> String {
        format!("<code>{text}</code>")
    }

    /// `[label](file#anchor)`. A literal label is wrapped in backticks,
    /// otherwise it is escaped.
    fn get_link(&self, label: &str, anchor: &str, file: &str, literalize: bool) -> String {
        let label = if literalize {
            format!("`{label}`")
        } else {
            self.escape_entities(label)
        };
        let anchor = if anchor.is_empty() {
            String::new()
        } else {
            format!("#{anchor}")
        };
        format!("[{label}]({file}{anchor})")
    }

    /// Superscript abbreviations with mouseover text. `wrap` holds a `{}`
    /// placeholder for the tag. When `file` is given each tag links there;
    /// a file without `#` gets the tag's header anchor appended.
    fn mouseover_tags(
        &self,
        tags: &IndexMap<String, String>,
        file: Option<&str>,
        htag: &str,
        wrap: &str,
    ) -> String {
        let mut out = String::new();
        for (tag, text) in tags {
            let abbr = wrap.replacen("{}", tag, 1);
            let body = match file {
                None => abbr,
                Some(file) if file.contains('#') => format!("[{abbr}]({file})"),
                Some(file) => format!("[{abbr}]({file}#{})", self.header_link(tag)),
            };
            out.push_str(&format!(" <{htag} title=\"{text}\">{body}</{htag}>"));
        }
        out
    }

    fn horizontal_rule(&self) -> Vec<String> {
        vec!["---".to_string(), String::new()]
    }

    fn header(&self, text: &str, level: usize, escape: bool) -> Vec<String> {
        let text = if escape {
            self.escape_entities(text)
        } else {
            text.to_string()
        };
        vec![format!("{} {text}", "#".repeat(level)), String::new()]
    }

    /// `**Title:** subtitle` line.
    fn block_header(&self, title: &str, subtitle: &str, escape_subtitle: bool) -> Vec<String> {
        let subtitle = if escape_subtitle {
            self.escape_entities(subtitle)
        } else {
            subtitle.to_string()
        };
        vec![
            format!("**{}:** {subtitle}", self.escape_entities(title)),
            String::new(),
        ]
    }

    fn markdown_block(&self, lines: &[String]) -> Vec<String> {
        let mut out = lines.to_vec();
        out.push(String::new());
        out
    }

    fn image(&self, embed: &ImageEmbed<'_>, rel_url: &str) -> Vec<String> {
        let alt = format!(
            "{} {}",
            self.escape_entities(embed.item),
            self.escape_entities(embed.title)
        );
        vec![format!("![{alt}]({rel_url} \"{alt}\")"), String::new()]
    }

    fn code_block(&self, code: &[String]) -> Vec<String> {
        if code.is_empty() {
            return Vec::new();
        }
        let mut out = vec!["``` {.C linenos=True}".to_string()];
        out.extend(code.iter().cloned());
        out.push("```".to_string());
        out.push(String::new());
        out
    }

    fn image_block(&self, embed: &ImageEmbed<'_>) -> Vec<String> {
        let mut out = self.block_header(embed.title, embed.subtitle, false);
        if !embed.code_below {
            out.extend(self.code_block(embed.code));
        }
        if let Some(url) = embed.rel_url {
            out.extend(self.image(embed, url));
        }
        if embed.code_below {
            out.extend(self.code_block(embed.code));
        }
        out
    }

    fn bullet_list_item(&self, item: &str) -> String {
        format!("- {item}")
    }

    fn bullet_list(&self, items: &[String]) -> Vec<String> {
        let mut out: Vec<String> = items.iter().map(|i| self.bullet_list_item(i)).collect();
        out.push(String::new());
        out
    }

    fn numbered_list_item(&self, num: usize, item: &str) -> String {
        format!("{num}. {item}")
    }

    fn numbered_list(&self, items: &[String]) -> Vec<String> {
        let mut out: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(n, i)| self.numbered_list_item(n + 1, i))
            .collect();
        out.push(String::new());
        out
    }

    /// A pipe table. A header starting with `^` marks a column of
    /// `/`-separated names, each shown as a padded code span.
    fn table(&self, headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
        let names: Vec<&str> = headers.iter().map(|h| h.trim_start_matches('^')).collect();
        let mut out = vec![
            names.join(" | "),
            names
                .iter()
                .map(|n| "-".repeat(n.chars().count().min(20)))
                .collect::<Vec<_>>()
                .join(" | "),
        ];
        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    if headers.get(col).is_some_and(|h| h.starts_with('^')) {
                        cell.split('/')
                            .map(|part| format!("{:<20}", format!("`{}`", part.trim())))
                            .collect::<Vec<_>>()
                            .join(" / ")
                    } else {
                        cell.clone()
                    }
                })
                .collect();
            out.push(cells.join(" | "));
        }
        out.push(String::new());
        out
    }
}

/// Registry of markdown dialects, keyed by profile name.
pub struct TargetRegistry {
    targets: HashMap<String, Box<dyn Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Registers `target`, replacing any target with the same name.
    pub fn register<T: Target + 'static>(&mut self, target: T) {
        self.targets
            .insert(target.name().to_string(), Box::new(target));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Target, DocsGenError> {
        self.targets
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| DocsGenError::UnknownTarget(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Registered profile names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.targets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(WikiTarget);
        registry.register(GitHubWikiTarget);
        registry.register(MkDocsTarget);
        registry
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn registry_lists_builtin_profiles() {
        let registry = TargetRegistry::default();
        assert_eq!(registry.names(), vec!["githubwiki", "mkdocs", "wiki"]);
        assert!(registry.contains("mkdocs"));
        assert_eq!(registry.get("wiki").unwrap().name(), "wiki");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let registry = TargetRegistry::new();
        match registry.get("asciidoc") {
            Err(DocsGenError::UnknownTarget(name)) => assert_eq!(name, "asciidoc"),
            _ => panic!("expected UnknownTarget"),
        }
    }

    #[test]
    fn registering_replaces_by_name() {
        let mut registry = TargetRegistry::new();
        registry.register(WikiTarget);
        registry.register(WikiTarget);
        assert_eq!(registry.names(), vec!["wiki"]);
    }

    #[test]
    fn links_literalize_or_escape_label() {
        let t = WikiTarget;
        assert_eq!(t.get_link("foo_bar()", "function-foo_bar", "lib.scad", true), "[`foo_bar()`](lib.scad#function-foo_bar)");
        assert_eq!(t.get_link("a_b", "", "Topics", false), "[a\\_b](Topics)");
    }

    #[test]
    fn mouseover_tags_link_to_header_anchors() {
        let t = WikiTarget;
        let mut tags = IndexMap::new();
        tags.insert("Geom".to_string(), "Returns geometry".to_string());

        assert_eq!(
            t.mouseover_tags(&tags, None, "sup", "[{}]"),
            " <sup title=\"Returns geometry\">[Geom]</sup>"
        );
        assert_eq!(
            t.mouseover_tags(&tags, Some("TOC"), "sup", "{}"),
            " <sup title=\"Returns geometry\">[Geom](TOC#geom)</sup>"
        );
        assert_eq!(
            t.mouseover_tags(&tags, Some("#file-footnotes"), "sup", "{}"),
            " <sup title=\"Returns geometry\">[Geom](#file-footnotes)</sup>"
        );
    }

    #[test]
    fn lists_end_with_blank_line() {
        let t = WikiTarget;
        assert_eq!(t.bullet_list(&lines(&["a", "b"])), lines(&["- a", "- b", ""]));
        assert_eq!(t.numbered_list(&lines(&["a", "b"])), lines(&["1. a", "2. b", ""]));
    }

    #[test]
    fn table_with_name_column() {
        let t = WikiTarget;
        let out = t.table(
            &lines(&["^Name", "Description"]),
            &[lines(&["foo/bar", "Does things"])],
        );
        insta::assert_snapshot!(out.join("\n"), @r"
        Name | Description
        ---- | -----------
        `foo`                / `bar`                | Does things
        ");
    }

    #[test]
    fn header_and_block_header() {
        let t = WikiTarget;
        assert_eq!(t.header("Section: a_b", SECTION_LEVEL, true), lines(&["## Section: a\\_b", ""]));
        assert_eq!(t.block_header("Usage", "a_b", true), lines(&["**Usage:** a\\_b", ""]));
        assert_eq!(t.block_header("Usage", "a_b", false), lines(&["**Usage:** a_b", ""]));
    }
}
