use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use relative_path::RelativePathBuf;
use scad_docsgen_config::{Settings, expand_patterns, parse_flag};

use crate::build::{RenderRequest, display_code, image_extension, merge_script, wants_render};
use crate::error::DocsGenError;
use crate::model::{
    Document, FileInfo, Footnote, ITEM_TITLES, ImageInfo, ImageKind, ItemInfo, Node, NodeId,
    NodeKind, Origin, TableInfo,
};
use crate::report::ErrorLog;
use crate::target::TargetRegistry;
use crate::xref::CrossRefs;

use super::classify::{BlockHeader, CommentLineClassifier};
use super::cursor::ParseCursor;
use super::registry::{BlockContext, BlockRegistry, BlockShape, ParentRule};

pub const RC_FILE: &str = ".openscad_docsgen_rc";
const DEFAULTS_SOURCE: &str = "Defaults";
const DEFAULT_HEADERS: [&str; 3] = [
    "// DefineHeader(Headerless): Continues",
    "// DefineHeader(Text;ItemOnly): Description",
    "// DefineHeader(BulletList;ItemOnly): Usage",
];
const TABLE_SEPARATOR: &str = "---";

/// Where a run of lines came from, which decides what directives it may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Config,
    Code,
}

fn structural(title: &str, message: impl Into<String>) -> DocsGenError {
    DocsGenError::structural(title, message)
}

/// Builds the document tree of every parsed source file.
///
/// One parser serves a whole run: the cross-reference registry and document
/// arena accumulate across files while the cursor and block registry are
/// reset per file.
pub struct DocsParser {
    settings: Settings,
    generators_from_cli: bool,
    document: Document,
    xrefs: CrossRefs,
    base_registry: BlockRegistry,
    registry: BlockRegistry,
    syntags: IndexMap<String, String>,
    ignored_patterns: Vec<String>,
    ignored_files: HashSet<PathBuf>,
    priority_files: Vec<String>,
    cursor: ParseCursor,
}

impl DocsParser {
    /// A parser with the built-in block types and default `DefineHeader`s.
    pub fn new(settings: Settings, log: &mut ErrorLog) -> Self {
        let generators_from_cli = settings.generate.any();
        let mut parser = Self {
            settings,
            generators_from_cli,
            document: Document::new(),
            xrefs: CrossRefs::new(),
            base_registry: BlockRegistry::with_builtins(),
            registry: BlockRegistry::new(),
            syntags: IndexMap::new(),
            ignored_patterns: Vec::new(),
            ignored_files: HashSet::new(),
            priority_files: Vec::new(),
            cursor: ParseCursor::default(),
        };
        parser.parse_config_lines(&DEFAULT_HEADERS, DEFAULTS_SOURCE, log);
        parser
    }

    /// Reads the rc file if present. Each line is treated as if it started with `// `.
    pub fn load_rc_file(&mut self, path: &Path, log: &mut ErrorLog) -> Result<bool, DocsGenError> {
        if !path.exists() {
            return Ok(false);
        }
        let text = std::fs::read_to_string(path)?;
        let lines: Vec<String> = text.lines().map(|l| format!("// {l}")).collect();
        log::debug!("Reading {}", path.display());
        self.parse_config_lines(&lines, RC_FILE, log);
        Ok(true)
    }

    /// Parses configuration directives; block definitions persist for every later file.
    pub fn parse_config_lines<S: AsRef<str>>(&mut self, lines: &[S], src_file: &str, log: &mut ErrorLog) {
        self.registry = self.base_registry.clone();
        self.run(lines, src_file, SourceKind::Config, log);
        self.base_registry = self.registry.clone();
    }

    /// Parses one source file's lines into a new file tree.
    pub fn parse_lines<S: AsRef<str>>(&mut self, lines: &[S], src_file: &str, log: &mut ErrorLog) {
        self.registry = self.base_registry.clone();
        self.run(lines, src_file, SourceKind::Code, log);
    }

    pub fn parse_file(&mut self, path: &Path, log: &mut ErrorLog) -> Result<(), DocsGenError> {
        if self.is_ignored(path) {
            log::debug!("Ignoring {}", path.display());
            return Ok(());
        }
        log::info!(" {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let lines: Vec<&str> = text.lines().collect();
        self.parse_lines(&lines, &path.display().to_string(), log);
        Ok(())
    }

    /// Parses every file, logging unreadable ones and carrying on.
    pub fn parse_files(&mut self, paths: &[PathBuf], log: &mut ErrorLog) {
        log::info!("Parsing...");
        for path in paths {
            if let Err(err) = self.parse_file(path, log) {
                log.record(&Origin::new(path.display().to_string(), 0), &err);
            }
        }
    }

    fn run<S: AsRef<str>>(&mut self, lines: &[S], src_file: &str, kind: SourceKind, log: &mut ErrorLog) {
        self.cursor.reset();
        let mut pos = self.skip_lines(lines, 0);
        while pos < lines.len() {
            pos = self.parse_block(lines, pos, src_file, kind, log);
        }
    }

    /// Advances to the next header, closing the open item at the first
    /// non-comment line.
    fn skip_lines<S: AsRef<str>>(&mut self, lines: &[S], mut pos: usize) -> usize {
        while let Some(line) = lines.get(pos).map(AsRef::as_ref) {
            if self.cursor.item.is_some() && !line.starts_with("//") {
                self.cursor.pop_item(&self.document);
            }
            if CommentLineClassifier::is_header(line) {
                return pos;
            }
            pos += 1;
        }
        self.cursor.pop_item(&self.document);
        pos
    }

    fn parse_block<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        pos: usize,
        src_file: &str,
        kind: SourceKind,
        log: &mut ErrorLog,
    ) -> usize {
        let Some(header) = CommentLineClassifier::header(lines[pos].as_ref()) else {
            return self.skip_lines(lines, pos + 1);
        };
        let origin = Origin::new(src_file, pos + 1);

        let body = match CommentLineClassifier::read_body(lines, pos + 1) {
            Ok(body) => body,
            Err(shallow) => {
                log.record(
                    &origin,
                    &structural(
                        &header.title,
                        "Body line has less indentation than first line, while declaring block:",
                    ),
                );
                return self.skip_lines(lines, shallow.line);
            }
        };

        if let Err(err) = self.dispatch(header, body.lines, &origin, kind) {
            log.record(&origin, &err);
        }

        let continues = lines
            .get(body.end)
            .is_some_and(|l| l.as_ref().starts_with("//"));
        if !continues {
            self.cursor.pop_item(&self.document);
        }
        self.skip_lines(lines, body.end)
    }

    fn dispatch(
        &mut self,
        header: BlockHeader,
        body: Vec<String>,
        origin: &Origin,
        kind: SourceKind,
    ) -> Result<(), DocsGenError> {
        let BlockHeader { title, meta, subtitle } = header;
        let title = title.as_str();

        if is_config_directive(title) {
            if kind != SourceKind::Config {
                return Err(structural(
                    title,
                    format!("Block disallowed outside of {RC_FILE} file:"),
                ));
            }
            return self.config_directive(title, &subtitle, body);
        }

        match title {
            "DefineHeader" => self.registry.define(&subtitle, &meta),
            "File" | "LibFile" => self.open_file(title, subtitle, body, origin),
            _ if self.cursor.file.is_none() && self.settings.strict => Err(structural(
                title,
                "Must declare File or LibFile block before declaring block:",
            )),
            "Section" => {
                let file = self.require_file(title)?;
                let id = self.document.add_child(
                    file,
                    Node::new(NodeKind::Section, title, subtitle, body, origin.clone()),
                );
                self.cursor.open_section(id);
                Ok(())
            }
            "Subsection" => {
                let section = self
                    .cursor
                    .section
                    .ok_or_else(|| structural(title, "Must declare a Section before declaring block:"))?;
                if subtitle.is_empty() {
                    return Err(structural(title, "Must provide a subtitle when declaring block:"));
                }
                let id = self.document.add_child(
                    section,
                    Node::new(NodeKind::Subsection, title, subtitle, body, origin.clone()),
                );
                self.cursor.open_subsection(id);
                Ok(())
            }
            "Includes" => {
                let file = self.require_file(title)?;
                self.file_info_mut(file)?.includes.extend(body.iter().cloned());
                self.document.add_child(
                    file,
                    Node::new(NodeKind::Includes, title, subtitle, body, origin.clone()),
                );
                Ok(())
            }
            "CommonCode" => {
                let file = self.require_file(title)?;
                self.file_info_mut(file)?.common_code.extend(body);
                Ok(())
            }
            "FileSummary" | "FileGroup" | "FileFootnotes" => {
                if subtitle.is_empty() {
                    return Err(structural(title, "Must provide a subtitle when declaring block:"));
                }
                let file = self.require_file(title)?;
                let info = self.file_info_mut(file)?;
                match title {
                    "FileSummary" => info.summary = subtitle.trim().to_string(),
                    "FileGroup" => info.group = subtitle.trim().to_string(),
                    _ => info.footnotes = parse_footnotes(&subtitle, origin),
                }
                Ok(())
            }
            "Figure" | "Figures" => {
                self.require_file(title)?;
                self.add_images(ImageKind::Figure, "Figure", title == "Figures", subtitle, body, &meta, origin)
            }
            "Example" | "Examples" => {
                if self.item_only(title)?.is_none() {
                    return Ok(());
                }
                self.add_images(ImageKind::Example, "Example", title == "Examples", subtitle, body, &meta, origin)
            }
            _ if self.registry.contains(title) => self.registered_block(title, subtitle, body, &meta, origin),
            _ if ITEM_TITLES.contains(&title) => self.open_item(title, subtitle, body, origin),
            "Synopsis" | "SynTags" | "Topics" | "See Also" => {
                let Some(item) = self.item_only(title)? else {
                    return Ok(());
                };
                self.item_label(item, title, subtitle, body, origin)
            }
            _ => Err(structural(title, "Unrecognized block:")),
        }
    }

    fn config_directive(&mut self, title: &str, subtitle: &str, mut body: Vec<String>) -> Result<(), DocsGenError> {
        let no_body = |body: &[String]| {
            if body.is_empty() {
                Ok(())
            } else {
                Err(structural(title, "Body not supported, while declaring block:"))
            }
        };
        match title {
            "IgnoreFiles" => {
                if !subtitle.is_empty() {
                    body.insert(0, subtitle.to_string());
                }
                self.ignored_patterns
                    .extend(body.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));
                self.ignored_files = expand_patterns(&self.ignored_patterns)?.into_iter().collect();
            }
            "PrioritizeFiles" => {
                if !subtitle.is_empty() {
                    body.insert(0, subtitle.to_string());
                }
                self.priority_files = expand_patterns(&body)?
                    .into_iter()
                    .map(|p| p.display().to_string())
                    .collect();
            }
            "DocsDirectory" => {
                no_body(&body)?;
                self.settings.set_docs_dir(subtitle.trim());
            }
            "UsePNGAnimations" => {
                no_body(&body)?;
                self.settings.png_animation = parse_flag(subtitle);
            }
            "ProjectName" => {
                no_body(&body)?;
                self.settings.project_name = Some(subtitle.trim().to_string());
            }
            "TargetProfile" => {
                no_body(&body)?;
                let profile = subtitle.trim();
                if !TargetRegistry::with_defaults().contains(profile) {
                    return Err(structural(
                        title,
                        format!("Unknown target profile \"{profile}\", while declaring block:"),
                    ));
                }
                self.settings.target_profile = profile.to_string();
            }
            "GenerateDocs" => {
                no_body(&body)?;
                if !self.generators_from_cli {
                    for part in subtitle.split(',').filter(|p| !p.trim().is_empty()) {
                        self.settings.generate.enable(part).map_err(|_| {
                            structural(
                                title,
                                format!("Unknown type \"{}\", while declaring block:", part.trim()),
                            )
                        })?;
                    }
                }
            }
            "DefineSynTags" => {
                if !subtitle.is_empty() {
                    return Err(structural(title, "Subtitle not supported, while declaring block:"));
                }
                for line in &body {
                    let (tag, text) = line.split_once('=').ok_or_else(|| {
                        structural(
                            title,
                            format!("Malformed tag definition '{line}' while declaring block:"),
                        )
                    })?;
                    self.syntags.insert(tag.trim().to_string(), text.trim().to_string());
                }
            }
            _ => return Err(structural(title, "Unrecognized block:")),
        }
        Ok(())
    }

    fn open_file(&mut self, title: &str, subtitle: String, body: Vec<String>, origin: &Origin) -> Result<(), DocsGenError> {
        if self.cursor.file.is_some() {
            return Err(structural(
                title,
                "File/Libfile block already specified, while declaring block:",
            ));
        }
        let id = self.document.add_file(Node::new(
            NodeKind::File(FileInfo::default()),
            title,
            subtitle,
            body,
            origin.clone(),
        ));
        self.cursor.open_file(id);
        Ok(())
    }

    fn require_file(&self, title: &str) -> Result<NodeId, DocsGenError> {
        self.cursor.file.ok_or_else(|| {
            structural(title, "Must declare File or LibFile block before declaring block:")
        })
    }

    fn file_info_mut(&mut self, file: NodeId) -> Result<&mut FileInfo, DocsGenError> {
        let node = self.document.node_mut(file);
        let title = node.title.clone();
        node.as_file_mut()
            .ok_or_else(|| structural(&title, "Expected a File or LibFile block:"))
    }

    /// The open item, `None` to silently skip the block, or an error in strict mode.
    fn item_only(&self, title: &str) -> Result<Option<NodeId>, DocsGenError> {
        match self.cursor.item {
            Some(item) => Ok(Some(item)),
            None if self.settings.strict => Err(structural(
                title,
                "Must declare a Constant, Function or Module before declaring block:",
            )),
            None => Ok(None),
        }
    }

    fn open_item(&mut self, title: &str, subtitle: String, body: Vec<String>, origin: &Origin) -> Result<(), DocsGenError> {
        let file = self.require_file(title)?;
        if let Some(prev) = self.xrefs.get(&subtitle) {
            return Err(DocsGenError::DuplicateDeclaration {
                block: title.to_string(),
                name: subtitle,
                previous: self.document.node(prev).origin.clone(),
            });
        }
        if !body.is_empty() {
            return Err(structural(title, "Body not supported, while declaring block:"));
        }
        if self.cursor.section.is_none() {
            let section = self.document.add_child(
                file,
                Node::new(NodeKind::Section, "Section", "", vec![], origin.clone()),
            );
            self.cursor.open_section(section);
        }
        let container = self.cursor.item_container().unwrap_or(file);
        let name = subtitle.clone();
        let id = self.document.add_child(
            container,
            Node::new(NodeKind::Item(ItemInfo::default()), title, subtitle, body, origin.clone()),
        );
        self.xrefs.declare(&self.document, title, &name, id)?;
        self.cursor.open_item(id);
        Ok(())
    }

    fn item_label(
        &mut self,
        item: NodeId,
        title: &str,
        subtitle: String,
        body: Vec<String>,
        origin: &Origin,
    ) -> Result<(), DocsGenError> {
        if !body.is_empty() {
            return Err(structural(title, "Body not supported, while declaring block:"));
        }
        let names = || -> Vec<String> {
            subtitle
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        let kind = match title {
            "Synopsis" => {
                self.item_info_mut(item)?.synopsis = subtitle.clone();
                NodeKind::Synopsis
            }
            "SynTags" => {
                let mut tags = IndexMap::new();
                for tag in names() {
                    let text = self.syntags.get(&tag).ok_or_else(|| {
                        structural(title, format!("Undefined syntag \"{tag}\", while declaring block:"))
                    })?;
                    tags.insert(tag, text.clone());
                }
                self.item_info_mut(item)?.syntags.extend(tags);
                NodeKind::SynTags
            }
            "Topics" => {
                self.item_info_mut(item)?.topics = names();
                NodeKind::Topics
            }
            _ => {
                self.item_info_mut(item)?.see_also = names();
                NodeKind::SeeAlso
            }
        };
        self.document
            .add_child(item, Node::new(kind, title, subtitle, body, origin.clone()));
        Ok(())
    }

    fn item_info_mut(&mut self, item: NodeId) -> Result<&mut ItemInfo, DocsGenError> {
        let node = self.document.node_mut(item);
        let title = node.title.clone();
        node.as_item_mut().ok_or_else(|| {
            structural(&title, "Must declare a Constant, Function or Module before declaring block:")
        })
    }

    fn registered_block(
        &mut self,
        title: &str,
        subtitle: String,
        mut body: Vec<String>,
        meta: &str,
        origin: &Origin,
    ) -> Result<(), DocsGenError> {
        let Some(rule) = self.registry.get(title).cloned() else {
            return Err(structural(title, "Unrecognized block:"));
        };
        if rule.parent == ParentRule::Item && self.item_only(title)?.is_none() {
            return Ok(());
        }
        let parent = match self.cursor.parent {
            Some(parent) => parent,
            None => self.require_file(title)?,
        };

        let mut subtitle = subtitle;
        let kind = match &rule.shape {
            BlockShape::Generic => NodeKind::Generic,
            BlockShape::Label => {
                if !body.is_empty() {
                    return Err(structural(title, "Body not supported, while declaring block:"));
                }
                NodeKind::Label
            }
            BlockShape::Text | BlockShape::Headerless => {
                if !subtitle.is_empty() {
                    body.insert(0, std::mem::take(&mut subtitle));
                }
                if rule.shape == BlockShape::Text {
                    NodeKind::Text
                } else {
                    NodeKind::Headerless
                }
            }
            BlockShape::BulletList => NodeKind::BulletList,
            BlockShape::NumberedList => NodeKind::NumberedList,
            BlockShape::Table { header_sets } => NodeKind::Table(parse_tables(title, header_sets, &body)?),
            BlockShape::Figure => {
                return self.add_images(ImageKind::Figure, title, false, subtitle, body, meta, origin);
            }
            BlockShape::Example => {
                if self.cursor.item.is_none() {
                    return self.item_only(title).map(|_| ());
                }
                return self.add_images(ImageKind::Example, title, false, subtitle, body, meta, origin);
            }
        };

        let callback_subtitle = subtitle.clone();
        self.document
            .add_child(parent, Node::new(kind, title, subtitle, body, origin.clone()));
        if let Some(callback) = rule.callback {
            let mut ctx = BlockContext {
                doc: &mut self.document,
                xrefs: &mut self.xrefs,
                item: self.cursor.item,
                title,
                subtitle: &callback_subtitle,
                origin,
            };
            callback(&mut ctx)?;
        }
        Ok(())
    }

    /// Adds one image block, or one per body line when `fan_out` is set. Only
    /// the first fanned-out image keeps the subtitle.
    #[allow(clippy::too_many_arguments)]
    fn add_images(
        &mut self,
        kind: ImageKind,
        label: &str,
        fan_out: bool,
        subtitle: String,
        body: Vec<String>,
        meta: &str,
        origin: &Origin,
    ) -> Result<(), DocsGenError> {
        let Some(parent) = self.cursor.parent else {
            return Err(structural(label, "Must declare File or LibFile block before declaring block:"));
        };
        if !fan_out {
            self.add_image(parent, kind, label, subtitle, body, meta, origin)?;
            return Ok(());
        }
        let mut subtitle = Some(subtitle);
        for line in body {
            let sub = subtitle.take().unwrap_or_default();
            self.add_image(parent, kind, label, sub, vec![line], meta, origin)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_image(
        &mut self,
        parent: NodeId,
        kind: ImageKind,
        label: &str,
        subtitle: String,
        body: Vec<String>,
        meta: &str,
        origin: &Origin,
    ) -> Result<NodeId, DocsGenError> {
        let file = self.document.file_of(parent);
        let (script, code) = {
            let info = self.document.node(file).as_file().cloned().unwrap_or_default();
            (
                merge_script(&info.includes, &info.common_code, &body),
                display_code(&info.includes, &body),
            )
        };

        let parent_node = self.document.node(parent);
        let parent_title = parent_node.title.clone();
        let san = sanitize_name(&parent_node.subtitle);
        let ext = image_extension(meta, self.settings.png_animation);

        let (number, name) = match kind {
            ImageKind::Figure => {
                let node = self.document.node_mut(parent);
                node.figure_num += 1;
                let n = node.figure_num;
                let name = match parent_title.as_str() {
                    "File" | "LibFile" => format!("figure{n}.{ext}"),
                    "Section" | "Subsection" => {
                        format!("{}-{san}_fig{n}.{ext}", parent_title.to_lowercase())
                    }
                    _ => format!("{san}_fig{n}.{ext}"),
                };
                (n, name)
            }
            ImageKind::Example => {
                let info = self.item_info_mut(parent)?;
                info.example_num += 1;
                let n = info.example_num;
                let suffix = if n > 1 { format!("_{n}") } else { String::new() };
                (n, format!("{san}{suffix}.{ext}"))
            }
        };

        let file_path = Path::new(self.document.node(file).origin.file.trim());
        let stem = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_dir = file_path
            .parent()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rel_url = RelativePathBuf::from("images").join(&stem).join(&name);
        let url = RelativePathBuf::from(file_dir).join(&rel_url);

        let render = wants_render(meta, &parent_title);
        let hidden = meta.contains("Hide");
        let request = if render && !hidden {
            let image_file = self.settings.docs_dir.join(url.as_str());
            Some(RenderRequest::new(origin.clone(), image_file, script.clone(), meta)?)
        } else {
            None
        };

        let info = ImageInfo {
            kind,
            number,
            meta: meta.to_string(),
            script,
            code,
            rel_url,
            url,
            render,
            request,
        };
        Ok(self.document.add_child(
            parent,
            Node::new(NodeKind::Image(info), format!("{label} {number}"), subtitle, body, origin.clone()),
        ))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored_files.contains(path)
            || self
                .ignored_files
                .iter()
                .any(|p| p.components().eq(path.components()))
    }

    /// File roots with `PrioritizeFiles` matches first, in pattern order.
    pub fn files_prioritized(&self) -> Vec<NodeId> {
        let files = self.document.files();
        let mut out: Vec<NodeId> = Vec::with_capacity(files.len());
        for pri in &self.priority_files {
            for &file in files {
                if &self.document.node(file).subtitle == pri && !out.contains(&file) {
                    out.push(file);
                }
            }
        }
        for &file in files {
            if !out.contains(&file) {
                out.push(file);
            }
        }
        out
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn xrefs(&self) -> &CrossRefs {
        &self.xrefs
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.base_registry
    }

    pub fn syntags(&self) -> &IndexMap<String, String> {
        &self.syntags
    }

    pub fn ignored_files(&self) -> impl Iterator<Item = &Path> {
        self.ignored_files.iter().map(PathBuf::as_path)
    }

    pub fn priority_files(&self) -> &[String] {
        &self.priority_files
    }
}

fn is_config_directive(title: &str) -> bool {
    matches!(
        title,
        "IgnoreFiles"
            | "PrioritizeFiles"
            | "DocsDirectory"
            | "UsePNGAnimations"
            | "ProjectName"
            | "TargetProfile"
            | "GenerateDocs"
            | "DefineSynTags"
    )
}

/// `mark=note; mark=note`
fn parse_footnotes(subtitle: &str, origin: &Origin) -> Vec<Footnote> {
    subtitle
        .split(';')
        .map(|part| {
            let (mark, note) = part.split_once('=').unwrap_or((part, ""));
            Footnote {
                mark: mark.trim().to_string(),
                note: note.trim().to_string(),
                origin: origin.clone(),
            }
        })
        .collect()
}

/// Splits `---`-separated tables into rows, cutting each line on at most
/// one `=` fewer than its header set has columns.
fn parse_tables(title: &str, header_sets: &[Vec<String>], body: &[String]) -> Result<TableInfo, DocsGenError> {
    let count = body.iter().filter(|l| *l == TABLE_SEPARATOR).count();
    if count >= header_sets.len() {
        return Err(structural(title, "More tables than header_sets, while declaring block:"));
    }
    let mut tables = Vec::new();
    let mut table = Vec::new();
    let mut tnum = 0;
    for line in body {
        if line == TABLE_SEPARATOR {
            tnum += 1;
            if !table.is_empty() {
                tables.push(std::mem::take(&mut table));
            }
            continue;
        }
        let columns = header_sets[tnum].len().max(1);
        table.push(line.splitn(columns, '=').map(|c| c.trim().to_string()).collect());
    }
    if !table.is_empty() {
        tables.push(table);
    }
    Ok(TableInfo {
        header_sets: header_sets.to_vec(),
        tables,
    })
}

/// Last path segment of `subtitle`, lower-cased, spaces as dashes, other
/// punctuation dropped.
fn sanitize_name(subtitle: &str) -> String {
    let name = subtitle.trim().to_lowercase().replace(' ', "-");
    name.rsplit('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
