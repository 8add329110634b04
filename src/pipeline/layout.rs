//! Layout reconstruction: flatten a page's block → line → span tree into text.
//!
//! Spans are concatenated with no separator unless the provider flagged a
//! visual gap (`space_before`), in which case exactly one space is inserted.
//! Lines of a block are joined with `\n`; blocks with `\n\n`, so the blank
//! line marks the paragraph boundary every later stage relies on.
//!
//! Malformed trees never fail: a line without spans and a block without lines
//! contribute nothing.

use crate::model::{Block, Line};

/// Flatten all blocks of a page into one string, blocks separated by a blank line.
pub fn reconstruct(blocks: &[Block]) -> String {
    paragraphs(blocks).join("\n\n")
}

/// One paragraph string per non-empty block, in source order.
pub fn paragraphs(blocks: &[Block]) -> Vec<String> {
    blocks.iter().filter_map(block_text).collect()
}

/// Text of one block, or `None` when it has no line carrying any span.
pub fn block_text(block: &Block) -> Option<String> {
    let lines: Vec<String> = block
        .lines
        .iter()
        .filter(|line| !line.spans.is_empty())
        .map(line_text)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Text of one line.
pub fn line_text(line: &Line) -> String {
    let mut text = String::with_capacity(line.spans.iter().map(|s| s.text.len() + 1).sum());
    for span in &line.spans {
        if span.space_before {
            text.push(' ');
        }
        text.push_str(&span.text);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Span;

    #[test]
    fn spaced_span_gets_exactly_one_space() {
        let block = Block::new(vec![Line::new(vec![
            Span::new("Hello"),
            Span::spaced("world"),
        ])]);
        assert_eq!(reconstruct(&[block]), "Hello world");
    }

    #[test]
    fn spans_without_hint_are_glued() {
        let line = Line::new(vec![Span::new("E"), Span::new("=mc"), Span::new("^2")]);
        assert_eq!(line_text(&line), "E=mc^2");
    }

    #[test]
    fn lines_join_with_newline_blocks_with_blank_line() {
        let blocks = vec![
            Block::from_text_lines(["first line", "second line"]),
            Block::from_text_lines(["next paragraph"]),
        ];
        assert_eq!(
            reconstruct(&blocks),
            "first line\nsecond line\n\nnext paragraph"
        );
    }

    #[test]
    fn empty_page_reconstructs_to_empty_string() {
        assert_eq!(reconstruct(&[]), "");
    }

    #[test]
    fn block_without_lines_is_skipped() {
        let blocks = vec![
            Block::from_text_lines(["a"]),
            Block::default(),
            Block::from_text_lines(["b"]),
        ];
        assert_eq!(reconstruct(&blocks), "a\n\nb");
    }

    #[test]
    fn line_without_spans_contributes_nothing() {
        let block = Block::new(vec![
            Line::new(vec![Span::new("top")]),
            Line::default(),
            Line::new(vec![Span::new("bottom")]),
        ]);
        assert_eq!(block_text(&block).as_deref(), Some("top\nbottom"));

        let hollow = Block::new(vec![Line::default(), Line::default()]);
        assert_eq!(block_text(&hollow), None);
    }

    #[test]
    fn source_order_is_preserved() {
        let blocks: Vec<Block> = (1..=4)
            .map(|i| Block::from_text_lines([format!("p{i}")]))
            .collect();
        assert_eq!(paragraphs(&blocks), vec!["p1", "p2", "p3", "p4"]);
    }
}
