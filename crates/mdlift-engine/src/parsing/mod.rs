//! Markdown tree walk: converts the parsed event stream into an ordered
//! forest of content blocks plus a side table of unresolved media.
//!
//! The walker keeps two stacks. `containers` tracks the enclosing quote and
//! list-item blocks so nested structure attaches to the right parent;
//! `InlineCollector` tracks open emphasis/link/image spans so each finished
//! block can hand a small inline tree to the style resolver. Blocks enter
//! the arena in pre-order, which the batch planner relies on.

pub mod inline;
pub mod table;

use crate::diagram::DiagramRenderer;
use crate::media::classify_source;
use crate::models::{
    BlockForest, BlockId, BlockKind, ContentBlock, MediaSource, MediaTable, StyledTextRun,
    TextStyle,
};
use inline::{InlineNode, SpanStyle, plain_text, resolve_runs_or_placeholder};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::path::PathBuf;
use table::TableBuilder;

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Base directory for resolving relative image paths.
    pub image_base_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct WalkOutput {
    pub forest: BlockForest,
    pub media: MediaTable,
}

/// Walk a Markdown document into a block forest.
///
/// `renderer` handles fenced `mermaid` blocks; pass `None` to keep them as
/// code blocks.
pub fn walk_markdown(
    text: &str,
    options: &WalkOptions,
    renderer: Option<&dyn DiagramRenderer>,
) -> WalkOutput {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(text, md_options);

    let mut walker = Walker::new(options, renderer);
    for event in parser {
        walker.process_event(event);
    }
    walker.finish()
}

/// An enclosing block that children attach under.
enum Container {
    Quote(BlockId),
    Item { id: BlockId, text_filled: bool },
}

struct CodeCapture {
    language: Option<String>,
    content: String,
}

struct Walker<'a> {
    forest: BlockForest,
    media: MediaTable,
    options: &'a WalkOptions,
    renderer: Option<&'a dyn DiagramRenderer>,
    containers: Vec<Container>,
    inline: InlineCollector,
    /// Ordered flags of the open lists, innermost last.
    list_stack: Vec<bool>,
    code: Option<CodeCapture>,
    table: Option<TableBuilder>,
}

impl<'a> Walker<'a> {
    fn new(options: &'a WalkOptions, renderer: Option<&'a dyn DiagramRenderer>) -> Self {
        Self {
            forest: BlockForest::new(),
            media: MediaTable::new(),
            options,
            renderer,
            containers: Vec::new(),
            inline: InlineCollector::new(),
            list_stack: Vec::new(),
            code: None,
            table: None,
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if let Some(capture) = &mut self.code {
                    capture.content.push_str(&text);
                } else {
                    self.inline.push_node(InlineNode::Text(text.to_string()));
                }
            }
            Event::Code(code) => self.inline.push_node(InlineNode::Code(code.to_string())),
            Event::SoftBreak => self.inline.push_node(InlineNode::Text(" ".to_string())),
            Event::HardBreak => self.inline.push_node(InlineNode::LineBreak),
            Event::Rule => {
                self.flush_pending_inline();
                let id = self.forest.insert(ContentBlock::new(BlockKind::Divider));
                self.attach(id);
            }
            Event::TaskListMarker(done) => self.mark_current_item_todo(done),
            // Raw HTML has no parsed content to extract; drop it.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph | Tag::Heading { .. } => {}
            Tag::List(first_number) => {
                self.flush_pending_inline();
                self.list_stack.push(first_number.is_some());
            }
            Tag::Item => {
                let ordered = self.list_stack.last().copied().unwrap_or(false);
                let kind = if ordered {
                    BlockKind::OrderedItem { runs: Vec::new() }
                } else {
                    BlockKind::BulletItem { runs: Vec::new() }
                };
                let id = self.forest.insert(ContentBlock::new(kind));
                self.attach(id);
                self.containers.push(Container::Item {
                    id,
                    text_filled: false,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_pending_inline();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|token| !token.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeCapture {
                    language,
                    content: String::new(),
                });
            }
            Tag::BlockQuote(_) => {
                self.flush_pending_inline();
                let id = self.forest.insert(ContentBlock::new(BlockKind::Quote));
                self.attach(id);
                self.containers.push(Container::Quote(id));
            }
            Tag::Table(alignments) => {
                self.flush_pending_inline();
                self.table = Some(TableBuilder::new(alignments.len()));
            }
            Tag::TableHead | Tag::TableRow | Tag::TableCell => {}
            Tag::Emphasis => self.inline.open_span(SpanStyle::Emphasis),
            Tag::Strong => self.inline.open_span(SpanStyle::Strong),
            Tag::Strikethrough => self.inline.open_span(SpanStyle::Strikethrough),
            Tag::Link { dest_url, .. } => {
                self.inline.open_span(SpanStyle::Link(dest_url.to_string()));
            }
            Tag::Image { dest_url, .. } => self.inline.open_image(dest_url.to_string()),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_paragraph(),
            TagEnd::Heading(level) => {
                let nodes = self.inline.take();
                let runs = resolve_runs_or_placeholder(&nodes, &TextStyle::default());
                let level = (level as u8).clamp(1, 9);
                let id = self
                    .forest
                    .insert(ContentBlock::new(BlockKind::Heading { level, runs }));
                self.attach(id);
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
            }
            TagEnd::Item => {
                self.flush_pending_inline();
                let pending = match self.containers.last() {
                    Some(Container::Item { id, text_filled }) => Some((*id, *text_filled)),
                    _ => None,
                };
                if let Some((id, filled)) = pending {
                    if !filled {
                        // The service rejects empty element lists.
                        self.set_item_runs(id, vec![StyledTextRun::empty()]);
                    }
                    self.containers.pop();
                }
            }
            TagEnd::CodeBlock => self.finish_code_block(),
            TagEnd::BlockQuote(_) => {
                if matches!(self.containers.last(), Some(Container::Quote(_))) {
                    self.containers.pop();
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(builder) = &mut self.table {
                    builder.finish_row();
                }
            }
            TagEnd::TableCell => {
                let nodes = self.inline.take();
                let runs = resolve_runs_or_placeholder(&nodes, &TextStyle::default());
                if let Some(builder) = &mut self.table {
                    builder.push_cell(runs);
                }
            }
            TagEnd::Table => {
                if let Some(builder) = self.table.take() {
                    self.emit_tables(builder);
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link
            | TagEnd::Image => self.inline.close_frame(),
            _ => {}
        }
    }

    fn finish(mut self) -> WalkOutput {
        self.flush_pending_inline();
        WalkOutput {
            forest: self.forest,
            media: self.media,
        }
    }

    /// Attach a block under the innermost container, or as a new root.
    fn attach(&mut self, id: BlockId) {
        match self.containers.last() {
            Some(Container::Quote(parent)) => {
                let parent = *parent;
                self.forest.add_child(parent, id);
            }
            Some(Container::Item { id: parent, .. }) => {
                let parent = *parent;
                self.forest.add_child(parent, id);
            }
            None => self.forest.push_root(id),
        }
    }

    fn flush_paragraph(&mut self) {
        let nodes = self.inline.take();
        if nodes.is_empty() {
            return;
        }
        // A paragraph holding exactly one image collapses to the image.
        if let Some((url, _alt)) = sole_image(&nodes) {
            let url = url.to_string();
            self.emit_image(&url);
            return;
        }
        let runs = resolve_runs_or_placeholder(&nodes, &TextStyle::default());
        self.fill_item_or_text(runs);
    }

    /// Flush inline content that arrived without paragraph delimiters
    /// (tight list items) before a block-level construct begins.
    fn flush_pending_inline(&mut self) {
        if !self.inline.is_empty() {
            self.flush_paragraph();
        }
    }

    /// A finished paragraph becomes the text of the innermost list item if
    /// that item has none yet; otherwise it becomes a Text block.
    fn fill_item_or_text(&mut self, runs: Vec<StyledTextRun>) {
        let target = match self.containers.last_mut() {
            Some(Container::Item { id, text_filled }) if !*text_filled => {
                *text_filled = true;
                Some(*id)
            }
            _ => None,
        };
        match target {
            Some(id) => self.set_item_runs(id, runs),
            None => {
                let id = self.forest.insert(ContentBlock::new(BlockKind::Text { runs }));
                self.attach(id);
            }
        }
    }

    fn set_item_runs(&mut self, id: BlockId, new_runs: Vec<StyledTextRun>) {
        if let Some(block) = self.forest.get_mut(id) {
            match &mut block.kind {
                BlockKind::BulletItem { runs }
                | BlockKind::OrderedItem { runs }
                | BlockKind::Todo { runs, .. } => *runs = new_runs,
                _ => {}
            }
        }
    }

    fn mark_current_item_todo(&mut self, done: bool) {
        let item = self.containers.iter().rev().find_map(|container| match container {
            Container::Item { id, .. } => Some(*id),
            _ => None,
        });
        let Some(id) = item else { return };
        let Some(block) = self.forest.get_mut(id) else {
            return;
        };
        let runs = match &mut block.kind {
            BlockKind::BulletItem { runs } | BlockKind::OrderedItem { runs } => {
                std::mem::take(runs)
            }
            _ => return,
        };
        block.kind = BlockKind::Todo { done, runs };
    }

    fn finish_code_block(&mut self) {
        let Some(capture) = self.code.take() else {
            return;
        };
        let content = capture.content.trim_end_matches('\n').to_string();
        let is_mermaid = capture
            .language
            .as_deref()
            .is_some_and(|language| language.trim().eq_ignore_ascii_case("mermaid"));

        if is_mermaid && let Some(renderer) = self.renderer {
            match renderer.render(&content) {
                Ok(bytes) => {
                    let id = self.forest.insert(ContentBlock::new(BlockKind::Image));
                    self.attach(id);
                    self.media.insert(
                        id,
                        MediaSource::Bytes {
                            data: bytes,
                            filename: "diagram.png".to_string(),
                        },
                    );
                    return;
                }
                Err(err) => {
                    log::warn!("mermaid rendering failed, keeping code block: {err}");
                }
            }
        }

        let runs = if content.is_empty() {
            vec![StyledTextRun::empty()]
        } else {
            vec![StyledTextRun::plain(content)]
        };
        let id = self.forest.insert(ContentBlock::new(BlockKind::Code {
            language: capture.language,
            runs,
        }));
        self.attach(id);
    }

    fn emit_image(&mut self, source: &str) {
        let id = self.forest.insert(ContentBlock::new(BlockKind::Image));
        self.attach(id);
        match classify_source(source, self.options.image_base_dir.as_deref()) {
            Some(media) => {
                self.media.insert(id, media);
            }
            None => log::warn!("unsupported image source dropped: {source}"),
        }
    }

    fn emit_tables(&mut self, builder: TableBuilder) {
        let cols = builder.cols();
        if cols == 0 {
            return;
        }
        let rows = builder.into_rows();
        if rows.is_empty() {
            return;
        }
        let widths = table::column_widths(&rows, cols);
        let rows_per_chunk = table::max_rows_per_chunk(cols);

        for chunk in rows.chunks(rows_per_chunk) {
            let table_id = self.forest.insert(ContentBlock::new(BlockKind::Table {
                rows: chunk.len(),
                cols,
                col_widths: widths.clone(),
            }));
            self.attach(table_id);
            for row in chunk {
                for runs in row {
                    let cell_id = self.forest.insert(ContentBlock::new(BlockKind::TableCell));
                    self.forest.add_child(table_id, cell_id);
                    let text_runs = if runs.is_empty() {
                        vec![StyledTextRun::empty()]
                    } else {
                        runs.clone()
                    };
                    let text_id = self
                        .forest
                        .insert(ContentBlock::new(BlockKind::Text { runs: text_runs }));
                    self.forest.add_child(cell_id, text_id);
                }
            }
        }
    }
}

/// Returns the image if `nodes` is exactly one image plus optional
/// whitespace, else `None`.
fn sole_image(nodes: &[InlineNode]) -> Option<(&str, &str)> {
    let mut image = None;
    for node in nodes {
        match node {
            InlineNode::Image { url, alt } => {
                if image.is_some() {
                    return None;
                }
                image = Some((url.as_str(), alt.as_str()));
            }
            InlineNode::Text(text) if text.trim().is_empty() => {}
            _ => return None,
        }
    }
    image
}

/// Builds the small inline tree for the block currently being collected.
struct InlineCollector {
    frames: Vec<InlineFrame>,
}

struct InlineFrame {
    kind: FrameKind,
    nodes: Vec<InlineNode>,
}

enum FrameKind {
    Root,
    Span(SpanStyle),
    Image { url: String },
}

impl InlineCollector {
    fn new() -> Self {
        Self {
            frames: vec![InlineFrame {
                kind: FrameKind::Root,
                nodes: Vec::new(),
            }],
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].nodes.is_empty()
    }

    fn push_node(&mut self, node: InlineNode) {
        if let Some(frame) = self.frames.last_mut() {
            frame.nodes.push(node);
        }
    }

    fn open_span(&mut self, style: SpanStyle) {
        self.frames.push(InlineFrame {
            kind: FrameKind::Span(style),
            nodes: Vec::new(),
        });
    }

    fn open_image(&mut self, url: String) {
        self.frames.push(InlineFrame {
            kind: FrameKind::Image { url },
            nodes: Vec::new(),
        });
    }

    fn close_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        match frame.kind {
            FrameKind::Span(style) => self.push_node(InlineNode::Span {
                style,
                children: frame.nodes,
            }),
            FrameKind::Image { url } => {
                let alt = plain_text(&frame.nodes);
                self.push_node(InlineNode::Image { url, alt });
            }
            FrameKind::Root => {}
        }
    }

    /// Drain the collected nodes, closing any dangling frames first.
    fn take(&mut self) -> Vec<InlineNode> {
        while self.frames.len() > 1 {
            self.close_frame();
        }
        match self.frames.first_mut() {
            Some(frame) => std::mem::take(&mut frame.nodes),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::RenderError;
    use crate::models::MediaSource;
    use pretty_assertions::assert_eq;

    fn walk(text: &str) -> WalkOutput {
        walk_markdown(text, &WalkOptions::default(), None)
    }

    fn runs_text(runs: &[StyledTextRun]) -> String {
        runs.iter().map(|run| run.text.as_str()).collect()
    }

    fn root_block<'a>(output: &'a WalkOutput, at: usize) -> &'a ContentBlock {
        let id = output.forest.roots()[at];
        output.forest.get(id).unwrap()
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let output = walk("");
        assert!(output.forest.is_empty());
        assert!(output.media.is_empty());
    }

    #[test]
    fn heading_and_styled_paragraph() {
        let output = walk("# Title\n\nHello **world**");

        assert_eq!(output.forest.roots().len(), 2);

        let heading = root_block(&output, 0);
        match &heading.kind {
            BlockKind::Heading { level, runs } => {
                assert_eq!(*level, 1);
                assert_eq!(runs_text(runs), "Title");
            }
            other => panic!("expected heading, got {other:?}"),
        }

        let text = root_block(&output, 1);
        match &text.kind {
            BlockKind::Text { runs } => {
                assert_eq!(runs.len(), 2);
                assert_eq!(runs[0].text, "Hello ");
                assert!(runs[0].style.is_plain());
                assert_eq!(runs[1].text, "world");
                assert!(runs[1].style.bold);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn nested_list_links_parent_to_child() {
        let output = walk("- A\n  - B");

        assert_eq!(output.forest.len(), 2);
        assert_eq!(output.forest.roots().len(), 1);

        let parent = root_block(&output, 0);
        match &parent.kind {
            BlockKind::BulletItem { runs } => assert_eq!(runs_text(runs), "A"),
            other => panic!("expected bullet item, got {other:?}"),
        }
        assert_eq!(parent.children.len(), 1);

        let child = output.forest.get(parent.children[0]).unwrap();
        match &child.kind {
            BlockKind::BulletItem { runs } => assert_eq!(runs_text(runs), "B"),
            other => panic!("expected bullet item, got {other:?}"),
        }
    }

    #[test]
    fn ordered_list_item_kind() {
        let output = walk("1. first");
        match &root_block(&output, 0).kind {
            BlockKind::OrderedItem { runs } => assert_eq!(runs_text(runs), "first"),
            other => panic!("expected ordered item, got {other:?}"),
        }
    }

    #[test]
    fn task_markers_become_todo_blocks() {
        let output = walk("- [x] done thing\n- [ ] open thing");

        match &root_block(&output, 0).kind {
            BlockKind::Todo { done, runs } => {
                assert!(*done);
                assert_eq!(runs_text(runs), "done thing");
            }
            other => panic!("expected todo, got {other:?}"),
        }
        match &root_block(&output, 1).kind {
            BlockKind::Todo { done, runs } => {
                assert!(!*done);
                assert_eq!(runs_text(runs), "open thing");
            }
            other => panic!("expected todo, got {other:?}"),
        }
    }

    #[test]
    fn image_only_paragraph_collapses_to_image_block() {
        let output = walk("![alt](http://x/y.png)");

        assert_eq!(output.forest.len(), 1);
        let image = root_block(&output, 0);
        assert_eq!(image.kind, BlockKind::Image);

        assert_eq!(output.media.len(), 1);
        assert_eq!(
            output.media.get(&image.id),
            Some(&MediaSource::Url("http://x/y.png".to_string()))
        );
    }

    #[test]
    fn inline_image_stays_in_text_block() {
        let output = walk("before ![alt](http://x/y.png) after");

        assert_eq!(output.forest.len(), 1);
        match &root_block(&output, 0).kind {
            BlockKind::Text { runs } => assert_eq!(runs_text(runs), "before alt after"),
            other => panic!("expected text, got {other:?}"),
        }
        assert!(output.media.is_empty());
    }

    #[test]
    fn blockquote_contains_transformed_children() {
        let output = walk("> quoted text");

        let quote = root_block(&output, 0);
        assert_eq!(quote.kind, BlockKind::Quote);
        assert_eq!(quote.children.len(), 1);

        let child = output.forest.get(quote.children[0]).unwrap();
        match &child.kind {
            BlockKind::Text { runs } => assert_eq!(runs_text(runs), "quoted text"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn thematic_break_becomes_divider() {
        let output = walk("above\n\n---\n\nbelow");
        assert_eq!(output.forest.roots().len(), 3);
        assert_eq!(root_block(&output, 1).kind, BlockKind::Divider);
    }

    #[test]
    fn fenced_code_keeps_language() {
        let output = walk("```rust\nfn main() {}\n```");

        match &root_block(&output, 0).kind {
            BlockKind::Code { language, runs } => {
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(runs_text(runs), "fn main() {}");
            }
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn loose_item_extra_paragraph_becomes_child() {
        let output = walk("- first\n\n  second paragraph\n");

        let item = root_block(&output, 0);
        match &item.kind {
            BlockKind::BulletItem { runs } => assert_eq!(runs_text(runs), "first"),
            other => panic!("expected bullet item, got {other:?}"),
        }
        assert_eq!(item.children.len(), 1);
        let child = output.forest.get(item.children[0]).unwrap();
        match &child.kind {
            BlockKind::Text { runs } => assert_eq!(runs_text(runs), "second paragraph"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn code_fence_inside_item_becomes_child() {
        let output = walk("- has code:\n  ```python\n  pass\n  ```");

        let item = root_block(&output, 0);
        assert_eq!(item.children.len(), 1);
        let child = output.forest.get(item.children[0]).unwrap();
        match &child.kind {
            BlockKind::Code { language, .. } => assert_eq!(language.as_deref(), Some("python")),
            other => panic!("expected code, got {other:?}"),
        }
    }

    struct OkRenderer;

    impl DiagramRenderer for OkRenderer {
        fn render(&self, _source: &str) -> Result<Vec<u8>, RenderError> {
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }
    }

    struct FailRenderer;

    impl DiagramRenderer for FailRenderer {
        fn render(&self, _source: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Failed {
                code: Some(1),
                stderr: "boom".to_string(),
            })
        }
    }

    #[test]
    fn mermaid_renders_to_image_with_bytes() {
        let output = walk_markdown(
            "```mermaid\ngraph TD;\n```",
            &WalkOptions::default(),
            Some(&OkRenderer),
        );

        let image = root_block(&output, 0);
        assert_eq!(image.kind, BlockKind::Image);
        match output.media.get(&image.id) {
            Some(MediaSource::Bytes { data, filename }) => {
                assert_eq!(data, &vec![0x89, 0x50, 0x4e, 0x47]);
                assert_eq!(filename, "diagram.png");
            }
            other => panic!("expected bytes media, got {other:?}"),
        }
    }

    #[test]
    fn mermaid_render_failure_falls_back_to_code_block() {
        let output = walk_markdown(
            "```mermaid\ngraph TD;\n```",
            &WalkOptions::default(),
            Some(&FailRenderer),
        );

        match &root_block(&output, 0).kind {
            BlockKind::Code { language, runs } => {
                assert_eq!(language.as_deref(), Some("mermaid"));
                assert_eq!(runs_text(runs), "graph TD;");
            }
            other => panic!("expected code fallback, got {other:?}"),
        }
        assert!(output.media.is_empty());
    }

    #[test]
    fn mermaid_without_renderer_stays_code() {
        let output = walk("```mermaid\ngraph TD;\n```");
        match &root_block(&output, 0).kind {
            BlockKind::Code { language, .. } => assert_eq!(language.as_deref(), Some("mermaid")),
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn table_emits_cells_with_text_children() {
        let output = walk("| a | b |\n|---|---|\n| 1 | 2 |");

        let table = root_block(&output, 0);
        match &table.kind {
            BlockKind::Table {
                rows,
                cols,
                col_widths,
            } => {
                assert_eq!(*rows, 2);
                assert_eq!(*cols, 2);
                assert_eq!(col_widths, &vec![50, 50]);
            }
            other => panic!("expected table, got {other:?}"),
        }
        // 2 rows x 2 cols, each cell carrying exactly one text child.
        assert_eq!(table.children.len(), 4);
        for &cell_id in &table.children {
            let cell = output.forest.get(cell_id).unwrap();
            assert_eq!(cell.kind, BlockKind::TableCell);
            assert_eq!(cell.children.len(), 1);
            let text = output.forest.get(cell.children[0]).unwrap();
            assert!(matches!(text.kind, BlockKind::Text { .. }));
        }
        // 1 table + 4 cells + 4 texts
        assert_eq!(output.forest.len(), 9);
    }

    #[test]
    fn oversized_table_chunks_on_row_boundaries() {
        // 10 columns, 5 rows (header + 4) = 50 cells; with the 20-cell
        // ceiling that is three sibling tables of 2 + 2 + 1 rows.
        let header = format!("|{}|", vec!["h"; 10].join("|"));
        let divider = format!("|{}|", vec!["---"; 10].join("|"));
        let body = format!("|{}|", vec!["x"; 10].join("|"));
        let markdown = format!("{header}\n{divider}\n{body}\n{body}\n{body}\n{body}\n");

        let output = walk(&markdown);

        assert_eq!(output.forest.roots().len(), 3);
        let mut row_counts = Vec::new();
        for &root in output.forest.roots() {
            match &output.forest.get(root).unwrap().kind {
                BlockKind::Table { rows, cols, .. } => {
                    assert!(rows * cols <= table::MAX_CELLS_PER_TABLE);
                    assert_eq!(*cols, 10);
                    row_counts.push(*rows);
                }
                other => panic!("expected table, got {other:?}"),
            }
        }
        assert_eq!(row_counts.iter().sum::<usize>(), 5);
        assert_eq!(row_counts, vec![2, 2, 1]);
    }

    #[test]
    fn data_url_image_decodes_immediately() {
        // "hi" in base64.
        let output = walk("![x](data:image/png;base64,aGk=)");

        let image = root_block(&output, 0);
        match output.media.get(&image.id) {
            Some(MediaSource::Bytes { data, .. }) => assert_eq!(data, b"hi"),
            other => panic!("expected bytes media, got {other:?}"),
        }
    }

    #[test]
    fn relative_image_path_resolves_against_base_dir() {
        let options = WalkOptions {
            image_base_dir: Some(PathBuf::from("/srv/assets")),
        };
        let output = walk_markdown("![x](pics/chart.png)", &options, None);

        let image = root_block(&output, 0);
        assert_eq!(
            output.media.get(&image.id),
            Some(&MediaSource::Path(PathBuf::from("/srv/assets/pics/chart.png")))
        );
    }

    #[test]
    fn blocks_enter_arena_in_pre_order() {
        let output = walk("- A\n  - B\n  - C\n- D");

        let order: Vec<String> = output
            .forest
            .iter()
            .map(|block| match &block.kind {
                BlockKind::BulletItem { runs } => runs_text(runs),
                other => panic!("unexpected block {other:?}"),
            })
            .collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }
}
