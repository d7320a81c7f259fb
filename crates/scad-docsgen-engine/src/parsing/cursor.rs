use crate::model::{Document, NodeId};

/// Where the next block lands while parsing one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseCursor {
    pub file: Option<NodeId>,
    pub section: Option<NodeId>,
    pub subsection: Option<NodeId>,
    pub item: Option<NodeId>,
    /// Insertion point for ordinary child blocks.
    pub parent: Option<NodeId>,
}

impl ParseCursor {
    /// Forgets everything; called before each new file.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn open_file(&mut self, file: NodeId) {
        *self = Self {
            file: Some(file),
            parent: Some(file),
            ..Self::default()
        };
    }

    pub fn open_section(&mut self, section: NodeId) {
        self.section = Some(section);
        self.subsection = None;
        self.item = None;
        self.parent = Some(section);
    }

    pub fn open_subsection(&mut self, subsection: NodeId) {
        self.subsection = Some(subsection);
        self.item = None;
        self.parent = Some(subsection);
    }

    pub fn open_item(&mut self, item: NodeId) {
        self.item = Some(item);
        self.parent = Some(item);
    }

    /// Where a new item goes. Items hang off the open section even inside
    /// a subsection.
    pub fn item_container(&self) -> Option<NodeId> {
        self.section
    }

    /// Closes the open item, moving the insertion point back to its parent.
    pub fn pop_item(&mut self, doc: &Document) {
        if let Some(item) = self.item.take() {
            self.parent = doc.parent(item);
        }
    }
}
