//! The block forest: the intermediate representation between Markdown and
//! the remote document service.
//!
//! Blocks are stored in an arena keyed by temporary id rather than as nested
//! owned structures, so that the upload phase can look any block up by id
//! while reconciling server-assigned identifiers without re-walking the tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Temporary identifier for a block, unique within one conversion run.
///
/// The `Display` form (32 hex chars) is what travels on the wire as the
/// "temporary block id" until the server assigns a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One styled span of text. Adjacent runs with equal styles are merged
/// during inline resolution, so runs are maximal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledTextRun {
    pub text: String,
    pub style: TextStyle,
}

impl StyledTextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// The placeholder run used where the service rejects empty element
    /// lists but the source had no text.
    pub fn empty() -> Self {
        Self::plain("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub inline_code: bool,
    pub link: Option<String>,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// The kind of a content block plus its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockKind {
    Text {
        runs: Vec<StyledTextRun>,
    },
    Heading {
        level: u8,
        runs: Vec<StyledTextRun>,
    },
    BulletItem {
        runs: Vec<StyledTextRun>,
    },
    OrderedItem {
        runs: Vec<StyledTextRun>,
    },
    Todo {
        done: bool,
        runs: Vec<StyledTextRun>,
    },
    Code {
        language: Option<String>,
        runs: Vec<StyledTextRun>,
    },
    Quote,
    Divider,
    Image,
    Table {
        rows: usize,
        cols: usize,
        col_widths: Vec<u32>,
    },
    TableCell,
}

impl BlockKind {
    /// The styled runs of a text-like block, if this kind carries any.
    pub fn runs(&self) -> Option<&[StyledTextRun]> {
        match self {
            BlockKind::Text { runs }
            | BlockKind::Heading { runs, .. }
            | BlockKind::BulletItem { runs }
            | BlockKind::OrderedItem { runs }
            | BlockKind::Todo { runs, .. }
            | BlockKind::Code { runs, .. } => Some(runs),
            _ => None,
        }
    }
}

/// A node of the output forest. Children are referenced by id; the blocks
/// themselves live in the [`BlockForest`] arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub children: Vec<BlockId>,
}

impl ContentBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            children: Vec::new(),
        }
    }
}

/// Arena of content blocks in walker emission order (pre-order per
/// subtree), plus the ids of the top-level blocks in document order.
///
/// The batch planner depends on the emission order: a subtree's blocks
/// always appear as a contiguous depth-first run after their root.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BlockForest {
    blocks: Vec<ContentBlock>,
    #[serde(skip)]
    index: HashMap<BlockId, usize>,
    roots: Vec<BlockId>,
}

impl BlockForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block to the arena and return its id. The block is not yet
    /// reachable: callers attach it with [`push_root`](Self::push_root) or
    /// [`add_child`](Self::add_child).
    pub fn insert(&mut self, block: ContentBlock) -> BlockId {
        let id = block.id;
        self.index.insert(id, self.blocks.len());
        self.blocks.push(block);
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&ContentBlock> {
        self.index.get(&id).map(|&at| &self.blocks[at])
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut ContentBlock> {
        self.index.get(&id).map(|&at| &mut self.blocks[at])
    }

    pub fn push_root(&mut self, id: BlockId) {
        debug_assert!(self.index.contains_key(&id));
        self.roots.push(id);
    }

    pub fn add_child(&mut self, parent: BlockId, child: BlockId) {
        debug_assert!(self.index.contains_key(&child));
        if let Some(block) = self.get_mut(parent) {
            block.children.push(child);
        }
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    /// Blocks in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
