//! Inline-style resolution: folds nested emphasis/link/code spans into a
//! flat sequence of styled text runs.
//!
//! Nesting never survives into the output. A span extends the ambient style
//! for its subtree; the leaves are emitted as runs carrying the union of
//! every enclosing style.

use crate::models::{StyledTextRun, TextStyle};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters that must not appear raw in a stored link URL.
const LINK_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// One inline phrasing node as collected from the Markdown event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineNode {
    Text(String),
    Code(String),
    LineBreak,
    Span {
        style: SpanStyle,
        children: Vec<InlineNode>,
    },
    Image {
        url: String,
        alt: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanStyle {
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
}

/// Flatten a sequence of inline nodes under an ambient style.
pub fn resolve_runs(nodes: &[InlineNode], ambient: &TextStyle) -> Vec<StyledTextRun> {
    let mut runs = Vec::new();
    flatten_into(nodes, ambient, &mut runs);
    runs
}

/// Like [`resolve_runs`], but guarantees at least one run: blocks that
/// require text get a single empty run when extraction yields nothing.
pub fn resolve_runs_or_placeholder(nodes: &[InlineNode], ambient: &TextStyle) -> Vec<StyledTextRun> {
    let runs = resolve_runs(nodes, ambient);
    if runs.is_empty() {
        vec![StyledTextRun::empty()]
    } else {
        runs
    }
}

fn flatten_into(nodes: &[InlineNode], ambient: &TextStyle, out: &mut Vec<StyledTextRun>) {
    for node in nodes {
        match node {
            InlineNode::Text(text) => push_run(out, text.clone(), ambient.clone()),
            InlineNode::Code(code) => {
                let mut style = ambient.clone();
                style.inline_code = true;
                push_run(out, code.clone(), style);
            }
            InlineNode::LineBreak => push_run(out, "\n".to_string(), ambient.clone()),
            InlineNode::Span { style, children } => {
                flatten_into(children, &extend_style(ambient, style), out);
            }
            InlineNode::Image { alt, .. } => {
                // Inline images never become structural blocks; they degrade
                // to their alt text.
                let text = if alt.is_empty() { "[image]" } else { alt.as_str() };
                push_run(out, text.to_string(), ambient.clone());
            }
        }
    }
}

fn extend_style(ambient: &TextStyle, span: &SpanStyle) -> TextStyle {
    let mut style = ambient.clone();
    match span {
        SpanStyle::Emphasis => style.italic = true,
        SpanStyle::Strong => style.bold = true,
        SpanStyle::Strikethrough => style.strikethrough = true,
        SpanStyle::Link(url) => style.link = Some(encode_link_url(url)),
    }
    style
}

pub fn encode_link_url(url: &str) -> String {
    utf8_percent_encode(url, LINK_ENCODE_SET).to_string()
}

/// The concatenated plain text of a node sequence, styles discarded.
pub fn plain_text(nodes: &[InlineNode]) -> String {
    let mut text = String::new();
    collect_text(nodes, &mut text);
    text
}

fn collect_text(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text(text) | InlineNode::Code(text) => out.push_str(text),
            InlineNode::LineBreak => out.push('\n'),
            InlineNode::Span { children, .. } => collect_text(children, out),
            InlineNode::Image { alt, .. } => out.push_str(alt),
        }
    }
}

fn push_run(out: &mut Vec<StyledTextRun>, text: String, style: TextStyle) {
    if text.is_empty() {
        return;
    }
    // Merge with the previous run when the style is identical, so entity
    // splits in the source don't fragment the output.
    if let Some(last) = out.last_mut()
        && last.style == style
    {
        last.text.push_str(&text);
        return;
    }
    out.push(StyledTextRun { text, style });
}
