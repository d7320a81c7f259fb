//! Runtime-extensible table of block types.
//!
//! A handful of rules are built in; everything else arrives through
//! `DefineHeader` blocks, so the set of known titles is only fixed once the
//! defaults and the rc file have been read.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::error::DocsGenError;
use crate::model::{Document, NodeId, Origin};
use crate::xref::CrossRefs;

const BY_POSITION: &str = "^<abbr title=\"These args can be used by position or by name.\">By&nbsp;Position</abbr>";
const BY_NAME: &str = "^<abbr title=\"These args must be used by name, ie: name=value\">By&nbsp;Name</abbr>";
const WHAT_IT_DOES: &str = "What it does";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRule {
    Any,
    /// Only legal while an item is open.
    Item,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockShape {
    Generic,
    Label,
    Text,
    Headerless,
    BulletList,
    NumberedList,
    Table { header_sets: Vec<Vec<String>> },
    Figure,
    Example,
}

/// What a callback may touch after its node has been built.
pub struct BlockContext<'a> {
    pub doc: &'a mut Document,
    pub xrefs: &'a mut CrossRefs,
    pub item: Option<NodeId>,
    pub title: &'a str,
    pub subtitle: &'a str,
    pub origin: &'a Origin,
}

pub type BlockCallback = fn(&mut BlockContext<'_>) -> Result<(), DocsGenError>;

#[derive(Clone)]
pub struct BlockRule {
    pub parent: ParentRule,
    pub shape: BlockShape,
    pub callback: Option<BlockCallback>,
}

impl fmt::Debug for BlockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRule")
            .field("parent", &self.parent)
            .field("shape", &self.shape)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl BlockRule {
    pub fn new(parent: ParentRule, shape: BlockShape) -> Self {
        Self {
            parent,
            shape,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: BlockCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Builds a rule from `DefineHeader` metadata such as `Table;ItemOnly;Headers=a|b||c|d`.
    pub fn from_meta(meta: &str) -> Result<Self, DocsGenError> {
        let meta = parse_meta_dict(meta);
        let parent = if meta.contains_key("ItemOnly") {
            ParentRule::Item
        } else {
            ParentRule::Any
        };
        let has = |key: &str| meta.contains_key(key);
        let table_shorthand = meta.keys().find_map(|k| k.strip_prefix("Table:"));

        let shape = if has("NumList") {
            BlockShape::NumberedList
        } else if has("BulletList") {
            BlockShape::BulletList
        } else if has("Table") || table_shorthand.is_some() {
            let headers = meta
                .get("Headers")
                .map(String::as_str)
                .or(table_shorthand)
                .ok_or_else(|| {
                    DocsGenError::structural(
                        "DefineHeader",
                        "Table type is missing Header= option, while declaring block:",
                    )
                })?;
            BlockShape::Table {
                header_sets: parse_header_sets(headers),
            }
        } else if has("Example") {
            BlockShape::Example
        } else if has("Figure") {
            BlockShape::Figure
        } else if has("Label") {
            BlockShape::Label
        } else if has("Headerless") {
            BlockShape::Headerless
        } else if has("Text") {
            BlockShape::Text
        } else if has("Generic") {
            BlockShape::Generic
        } else {
            return Err(DocsGenError::structural(
                "DefineHeader",
                "Could not parse target block type, while declaring block:",
            ));
        };

        Ok(Self::new(parent, shape))
    }
}

/// Splits `key=val;flag` metadata. Bare flags map to an empty value.
pub fn parse_meta_dict(meta: &str) -> IndexMap<String, String> {
    meta.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, val)) => (key.trim().to_string(), val.trim().to_string()),
            None => (part.trim().to_string(), String::new()),
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// `a|b||c|d` becomes `[[a, b], [c, d]]`.
pub fn parse_header_sets(headers: &str) -> Vec<Vec<String>> {
    headers
        .split("||")
        .map(|set| set.split('|').map(|h| h.trim().to_string()).collect())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    rules: HashMap<String, BlockRule>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Status`, `Alias`, `Aliases` and `Arguments`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            "Status",
            BlockRule::new(ParentRule::Item, BlockShape::Label).with_callback(status_callback),
        );
        for title in ["Alias", "Aliases"] {
            registry.register(
                title,
                BlockRule::new(ParentRule::Item, BlockShape::Label).with_callback(alias_callback),
            );
        }
        registry.register(
            "Arguments",
            BlockRule::new(
                ParentRule::Item,
                BlockShape::Table {
                    header_sets: vec![
                        vec![BY_POSITION.to_string(), WHAT_IT_DOES.to_string()],
                        vec![BY_NAME.to_string(), WHAT_IT_DOES.to_string()],
                    ],
                },
            ),
        );
        registry
    }

    pub fn register(&mut self, title: impl Into<String>, rule: BlockRule) -> Option<BlockRule> {
        self.rules.insert(title.into(), rule)
    }

    /// Handles a `DefineHeader(<meta>): <title>` block.
    pub fn define(&mut self, title: &str, meta: &str) -> Result<(), DocsGenError> {
        let rule = BlockRule::from_meta(meta)?;
        log::debug!("Defined block type {:?} as {:?}", title.trim(), rule.shape);
        self.register(title.trim(), rule);
        Ok(())
    }

    pub fn get(&self, title: &str) -> Option<&BlockRule> {
        self.rules.get(title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.rules.contains_key(title)
    }

    pub fn titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        titles.sort_unstable();
        titles
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn status_callback(ctx: &mut BlockContext<'_>) -> Result<(), DocsGenError> {
    if let Some(item) = ctx.item.and_then(|id| ctx.doc.node_mut(id).as_item_mut()) {
        item.deprecated = ctx.subtitle.contains("DEPRECATED");
    }
    Ok(())
}

fn alias_callback(ctx: &mut BlockContext<'_>) -> Result<(), DocsGenError> {
    let Some(item) = ctx.item else {
        return Ok(());
    };
    let mut first_err = None;
    for alias in ctx.subtitle.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        match ctx.xrefs.declare(ctx.doc, ctx.title, alias, item) {
            Ok(()) => {
                if let Some(info) = ctx.doc.node_mut(item).as_item_mut() {
                    info.aliases.push(alias.to_string());
                }
            }
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Generic", ParentRule::Any, BlockShape::Generic)]
    #[case("Text;ItemOnly", ParentRule::Item, BlockShape::Text)]
    #[case("Headerless", ParentRule::Any, BlockShape::Headerless)]
    #[case("BulletList;ItemOnly", ParentRule::Item, BlockShape::BulletList)]
    #[case("NumList", ParentRule::Any, BlockShape::NumberedList)]
    #[case("Label", ParentRule::Any, BlockShape::Label)]
    #[case("Example;ItemOnly", ParentRule::Item, BlockShape::Example)]
    #[case("Figure", ParentRule::Any, BlockShape::Figure)]
    fn define_simple_shapes(#[case] meta: &str, #[case] parent: ParentRule, #[case] shape: BlockShape) {
        let rule = BlockRule::from_meta(meta).unwrap();
        assert_eq!(rule.parent, parent);
        assert_eq!(rule.shape, shape);
        assert!(rule.callback.is_none());
    }

    #[test]
    fn define_table_with_header_sets() {
        let rule = BlockRule::from_meta("Table;ItemOnly;Headers=Anchor Name|Position||Tag|What").unwrap();

        assert_eq!(
            rule.shape,
            BlockShape::Table {
                header_sets: vec![
                    vec!["Anchor Name".to_string(), "Position".to_string()],
                    vec!["Tag".to_string(), "What".to_string()],
                ]
            }
        );
    }

    #[test]
    fn define_table_shorthand() {
        let rule = BlockRule::from_meta("Table:Name|Desc").unwrap();

        assert_eq!(
            rule.shape,
            BlockShape::Table {
                header_sets: vec![vec!["Name".to_string(), "Desc".to_string()]]
            }
        );
    }

    #[test]
    fn define_table_without_headers_fails() {
        let err = BlockRule::from_meta("Table").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table type is missing Header= option, while declaring block: \"DefineHeader\""
        );
    }

    #[test]
    fn define_unknown_kind_fails() {
        let err = BlockRule::from_meta("Sparkly").unwrap_err();
        assert!(matches!(err, DocsGenError::Structural { .. }));
    }

    #[test]
    fn registry_is_extended_at_runtime() {
        let mut registry = BlockRegistry::with_builtins();
        assert!(!registry.contains("Side Effects"));

        registry.define(" Side Effects ", "BulletList;ItemOnly").unwrap();

        let rule = registry.get("Side Effects").unwrap();
        assert_eq!(rule.shape, BlockShape::BulletList);
        assert_eq!(
            registry.titles(),
            vec!["Alias", "Aliases", "Arguments", "Side Effects", "Status"]
        );
    }

    #[test]
    fn builtins_carry_callbacks() {
        let registry = BlockRegistry::with_builtins();
        assert!(registry.get("Status").unwrap().callback.is_some());
        assert!(registry.get("Aliases").unwrap().callback.is_some());
        assert!(registry.get("Arguments").unwrap().callback.is_none());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn meta_dict_splits_flags_and_values() {
        let meta = parse_meta_dict("Spin; VPD=200 ;Size=100x50");
        assert_eq!(meta.get("Spin").map(String::as_str), Some(""));
        assert_eq!(meta.get("VPD").map(String::as_str), Some("200"));
        assert_eq!(meta.get("Size").map(String::as_str), Some("100x50"));
    }
}
