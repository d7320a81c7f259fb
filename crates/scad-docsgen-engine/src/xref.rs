//! Name → item registry and `{{name}}` link expansion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DocsGenError;
use crate::model::{Document, NodeId, Origin};
use crate::report::ErrorLog;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_()]+)\}\}").expect("Invalid link regex"));

/// Every declared item name and alias, mapped to its item node.
///
/// Filled while parsing; read while rendering, once every file has been
/// parsed, so links may point forward.
#[derive(Debug, Clone, Default)]
pub struct CrossRefs {
    by_name: BTreeMap<String, NodeId>,
}

impl CrossRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for `id`. The first declaration of a name wins.
    pub fn declare(
        &mut self,
        doc: &Document,
        block: &str,
        name: &str,
        id: NodeId,
    ) -> Result<(), DocsGenError> {
        if let Some(prev) = self.by_name.get(name) {
            return Err(DocsGenError::DuplicateDeclaration {
                block: block.to_string(),
                name: name.to_string(),
                previous: doc.node(*prev).origin.clone(),
            });
        }
        self.by_name.insert(name.to_string(), id);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId, DocsGenError> {
        self.get(name).ok_or_else(|| DocsGenError::Reference {
            link: format!("{{{{{name}}}}}"),
        })
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Replaces each `{{name}}` in `text` with `link(node)`.
    ///
    /// Unknown names are logged against `origin` and left in as plain text.
    pub fn expand_links(
        &self,
        text: &str,
        origin: &Origin,
        log: &mut ErrorLog,
        link: impl FnMut(NodeId) -> String,
    ) -> String {
        self.expand_links_escaped(text, origin, log, str::to_string, link)
    }

    /// Like [`CrossRefs::expand_links`], but passes all text outside the
    /// generated links through `escape`.
    pub fn expand_links_escaped(
        &self,
        text: &str,
        origin: &Origin,
        log: &mut ErrorLog,
        escape: impl Fn(&str) -> String,
        link: impl FnMut(NodeId) -> String,
    ) -> String {
        self.expand_with(text, escape, link, |err| log.record(origin, &err))
    }

    /// Like [`CrossRefs::expand_links_escaped`], leaving unknown names unlogged.
    ///
    /// For text that is rendered again after its own block has reported it.
    pub fn render_links_escaped(
        &self,
        text: &str,
        escape: impl Fn(&str) -> String,
        link: impl FnMut(NodeId) -> String,
    ) -> String {
        self.expand_with(text, escape, link, |_| {})
    }

    fn expand_with(
        &self,
        text: &str,
        escape: impl Fn(&str) -> String,
        mut link: impl FnMut(NodeId) -> String,
        mut unknown: impl FnMut(DocsGenError),
    ) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in LINK_RE.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&escape(&text[last..whole.start()]));
            match self.resolve(name.as_str()) {
                Ok(id) => out.push_str(&link(id)),
                Err(err) => {
                    unknown(err);
                    out.push_str(&escape(name.as_str()));
                }
            }
            last = whole.end();
        }
        out.push_str(&escape(&text[last..]));
        out
    }

    /// Resolves a See Also list, dropping `owner` itself and logging unknown names.
    pub fn resolve_see_also(
        &self,
        names: &[String],
        owner: NodeId,
        origin: &Origin,
        log: &mut ErrorLog,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        for name in names {
            match self.get(name) {
                Some(id) if id == owner => {}
                Some(id) => out.push(id),
                None => log.record(
                    origin,
                    &DocsGenError::Reference {
                        link: format!("'{name}'"),
                    },
                ),
            }
        }
        out
    }
}
