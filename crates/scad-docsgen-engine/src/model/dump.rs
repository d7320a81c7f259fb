use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{Document, NodeId, NodeKind};

const FILE_SKIPPED: [&str; 2] = ["CommonCode", "Includes"];
const ITEM_SKIPPED: [&str; 10] = [
    "Alias",
    "Aliases",
    "Arguments",
    "Description",
    "See Also",
    "Synopsis",
    "SynTags",
    "Status",
    "Topics",
    "Usage",
];

/// Serializable view of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub name: String,
    pub subtitle: String,
    pub body: Vec<String>,
    pub file: String,
    pub line: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn of(doc: &Document, id: NodeId) -> Self {
        let node = doc.node(id);
        let mut extra = Map::new();
        let children = doc.children(id).iter().copied();

        let children: Vec<NodeData> = match &node.kind {
            NodeKind::File(info) => {
                extra.insert("includes".into(), json!(info.includes));
                extra.insert("commoncode".into(), json!(info.common_code));
                extra.insert("group".into(), json!(info.group));
                extra.insert("summary".into(), json!(info.summary));
                let notes: Vec<Value> = info
                    .footnotes
                    .iter()
                    .map(|f| json!({ "mark": f.mark, "note": f.note }))
                    .collect();
                extra.insert("footnotes".into(), Value::Array(notes));
                children
                    .filter(|c| !FILE_SKIPPED.contains(&doc.node(*c).title.as_str()))
                    .map(|c| NodeData::of(doc, c))
                    .collect()
            }
            NodeKind::Item(info) => {
                if info.deprecated {
                    extra.insert("deprecated".into(), json!(true));
                }
                extra.insert("topics".into(), json!(info.topics));
                extra.insert("aliases".into(), json!(info.aliases));
                extra.insert("synopsis".into(), json!(info.synopsis));
                extra.insert("syntags".into(), json!(info.syntags));
                extra.insert("see_also".into(), json!(info.see_also));
                let bodies = |title: &'static str| -> Vec<String> {
                    doc.children_titled(id, &[title])
                        .flat_map(|c| doc.node(c).body.clone())
                        .collect()
                };
                extra.insert("description".into(), json!(bodies("Description")));
                extra.insert("arguments".into(), json!(bodies("Arguments")));
                let usages: Vec<Value> = doc
                    .children_titled(id, &["Usage"])
                    .map(|c| {
                        let usage = doc.node(c);
                        json!({ "subtitle": usage.subtitle, "body": usage.body })
                    })
                    .collect();
                extra.insert("usages".into(), Value::Array(usages));
                let examples: Vec<Value> = doc
                    .children(id)
                    .iter()
                    .map(|c| doc.node(*c))
                    .filter(|c| c.title.starts_with("Example"))
                    .map(|c| json!(c.body))
                    .collect();
                extra.insert("examples".into(), Value::Array(examples));
                children
                    .filter(|c| {
                        let title = doc.node(*c).title.as_str();
                        !ITEM_SKIPPED.contains(&title) && !title.starts_with("Example")
                    })
                    .map(|c| NodeData::of(doc, c))
                    .collect()
            }
            NodeKind::Image(info) => {
                extra.insert("script".into(), json!(info.script));
                extra.insert("imgurl".into(), json!(info.url.as_str()));
                children.map(|c| NodeData::of(doc, c)).collect()
            }
            _ => children.map(|c| NodeData::of(doc, c)).collect(),
        };

        Self {
            name: node.title.clone(),
            subtitle: node.subtitle.clone(),
            body: node.body.clone(),
            file: node.origin.file.clone(),
            line: node.origin.line,
            extra,
            children,
        }
    }
}

/// Indented human-readable outline of the given subtrees.
pub fn dump_tree(doc: &Document, roots: &[NodeId], max_depth: usize) -> Vec<String> {
    let mut out = Vec::new();
    dump_into(doc, roots, "", max_depth, &mut out);
    out
}

fn dump_into(doc: &Document, ids: &[NodeId], prefix: &str, depth: usize, out: &mut Vec<String>) {
    if depth == 0 {
        return;
    }
    for id in ids {
        let node = doc.node(*id);
        out.push(format!("{prefix}{}", node.display_name()));
        for line in &node.body {
            out.push(format!("  {prefix}{line}"));
        }
        dump_into(doc, doc.children(*id), &format!("{prefix}  "), depth - 1, out);
    }
}
