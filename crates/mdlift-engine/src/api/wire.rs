//! Wire representation of content blocks for creation requests.

use crate::models::{BlockForest, BlockId, BlockKind, ContentBlock, StyledTextRun};
use crate::planning::UploadUnit;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct BlockPayload {
    pub block_id: String,
    pub block_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TablePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPayload {
    pub elements: Vec<TextElementPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextElementPayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StylePayload {
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub inline_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePayload {
    pub row_size: usize,
    pub column_size: usize,
    pub column_width: Vec<u32>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Build the request body pieces for one upload unit: the ordered direct
/// child ids, and the payload of every block travelling in the request.
///
/// A block's `children` field only lists ids present in the same request;
/// children split into later units attach through their own unit's anchor
/// instead.
pub fn unit_payloads(forest: &BlockForest, unit: &UploadUnit) -> (Vec<String>, Vec<BlockPayload>) {
    let present: HashSet<BlockId> = unit
        .children
        .iter()
        .chain(unit.descendants.iter())
        .copied()
        .collect();

    let children_ids = unit.children.iter().map(BlockId::to_string).collect();
    let descendants = unit
        .children
        .iter()
        .chain(unit.descendants.iter())
        .filter_map(|&id| forest.get(id))
        .map(|block| block_payload(block, &present))
        .collect();
    (children_ids, descendants)
}

fn block_payload(block: &ContentBlock, present: &HashSet<BlockId>) -> BlockPayload {
    let mut payload = BlockPayload {
        block_id: block.id.to_string(),
        block_type: block_type(&block.kind),
        text: block.kind.runs().map(text_payload),
        heading_level: None,
        done: None,
        language: None,
        table: None,
        children: block
            .children
            .iter()
            .filter(|id| present.contains(id))
            .map(BlockId::to_string)
            .collect(),
    };
    match &block.kind {
        BlockKind::Heading { level, .. } => payload.heading_level = Some(*level),
        BlockKind::Todo { done, .. } => payload.done = Some(*done),
        BlockKind::Code { language, .. } => payload.language = language.clone(),
        BlockKind::Table {
            rows,
            cols,
            col_widths,
        } => {
            payload.table = Some(TablePayload {
                row_size: *rows,
                column_size: *cols,
                column_width: col_widths.clone(),
            });
        }
        _ => {}
    }
    payload
}

fn block_type(kind: &BlockKind) -> &'static str {
    match kind {
        BlockKind::Text { .. } => "text",
        BlockKind::Heading { .. } => "heading",
        BlockKind::BulletItem { .. } => "bullet",
        BlockKind::OrderedItem { .. } => "ordered",
        BlockKind::Todo { .. } => "todo",
        BlockKind::Code { .. } => "code",
        BlockKind::Quote => "quote",
        BlockKind::Divider => "divider",
        BlockKind::Image => "image",
        BlockKind::Table { .. } => "table",
        BlockKind::TableCell => "table_cell",
    }
}

fn text_payload(runs: &[StyledTextRun]) -> TextPayload {
    TextPayload {
        elements: runs
            .iter()
            .map(|run| TextElementPayload {
                content: run.text.clone(),
                style: if run.style.is_plain() {
                    None
                } else {
                    Some(StylePayload {
                        bold: run.style.bold,
                        italic: run.style.italic,
                        strikethrough: run.style.strikethrough,
                        underline: run.style.underline,
                        inline_code: run.style.inline_code,
                        link: run.style.link.clone(),
                    })
                },
            })
            .collect(),
    }
}
