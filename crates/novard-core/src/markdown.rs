//! Minimal Markdown renderer for bot replies
//!
//! Covers the subset the backend's mentor prompt produces: headings (levels
//! 1-3), bold, italic, inline code, fenced code blocks, unordered lists and
//! paragraphs. Rendering runs as explicit passes, and the pass order is the
//! precedence:
//!
//! 1. escape HTML-significant characters
//! 2. block scan: fences are lifted out first, then each line is classified
//!    as heading, list item, code line or paragraph
//! 3. inline scan: code spans, then bold, then italic
//!
//! [`parse`] is escape-agnostic and public so front ends other than HTML
//! (the terminal UI) can style the same tree.

use std::mem;

const FENCE: &str = "```";

/// Inline content of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    /// Triple-backtick fence. May carry newlines; its content is never parsed.
    CodeBlock(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    List(Vec<Vec<Inline>>),
    /// A line that opens with a fenced code block. Not wrapped in a paragraph.
    Code(Vec<Inline>),
    Paragraph(Vec<Inline>),
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Render Markdown to an HTML fragment. Total over every input.
pub fn render(markdown: &str) -> String {
    let escaped = escape_html(markdown);
    to_html(&parse(&escaped))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize a parsed document. Text leaves are emitted verbatim, so the
/// document must have been parsed from escaped input.
pub fn to_html(doc: &Document) -> String {
    doc.blocks
        .iter()
        .map(block_html)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse(text: &str) -> Document {
    let mut blocks: Vec<Block> = Vec::new();

    for pieces in split_lines(text) {
        match classify(pieces) {
            Line::Item(item) => {
                if let Some(Block::List(items)) = blocks.last_mut() {
                    items.push(item);
                } else {
                    blocks.push(Block::List(vec![item]));
                }
            }
            Line::Block(block) => blocks.push(block),
        }
    }

    Document { blocks }
}

// ---------------------------------------------------------------------------
// Block scan
// ---------------------------------------------------------------------------

enum Piece {
    Text(String),
    Fence(String),
}

enum Line {
    Item(Vec<Inline>),
    Block(Block),
}

/// Split into lines, lifting fenced code out first so that fence content
/// (including its newlines) never takes part in line classification.
fn split_lines(text: &str) -> Vec<Vec<Piece>> {
    let mut lines: Vec<Vec<Piece>> = vec![Vec::new()];
    let mut rest = text;

    loop {
        let fence = rest.find(FENCE).and_then(|open| {
            let after = &rest[open + FENCE.len()..];
            after.find(FENCE).map(|close| (open, close))
        });

        let (before, code) = match fence {
            Some((open, close)) => {
                let after = &rest[open + FENCE.len()..];
                let code = &after[..close];
                let before = &rest[..open];
                rest = &after[close + FENCE.len()..];
                (before, Some(code))
            }
            None => (mem::take(&mut rest), None),
        };

        for (i, part) in before.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if !part.is_empty() {
                push_piece(&mut lines, Piece::Text(part.to_string()));
            }
        }

        match code {
            Some(code) => push_piece(&mut lines, Piece::Fence(code.to_string())),
            None => break,
        }
    }

    lines
}

fn push_piece(lines: &mut [Vec<Piece>], piece: Piece) {
    if let Some(line) = lines.last_mut() {
        line.push(piece);
    }
}

fn classify(pieces: Vec<Piece>) -> Line {
    let mut iter = pieces.into_iter();
    let first = match iter.next() {
        None => return Line::Block(Block::Blank),
        Some(Piece::Text(text)) => text,
        Some(fence) => {
            let line = std::iter::once(fence).chain(iter).collect();
            return Line::Block(Block::Code(inlines(line)));
        }
    };
    let rest: Vec<Piece> = iter.collect();

    if rest.is_empty() && first.trim().is_empty() {
        return Line::Block(Block::Paragraph(Vec::new()));
    }

    let followed = !rest.is_empty();
    if let Some((level, content)) = heading_marker(&first, followed) {
        return Line::Block(Block::Heading {
            level,
            content: inlines(prepend(content, rest)),
        });
    }
    if let Some(content) = list_marker(&first, followed) {
        return Line::Item(inlines(prepend(content, rest)));
    }

    Line::Block(Block::Paragraph(inlines(prepend(first, rest))))
}

fn prepend(head: String, rest: Vec<Piece>) -> Vec<Piece> {
    std::iter::once(Piece::Text(head)).chain(rest).collect()
}

/// `#`, `##` or `###`, then whitespace, then content. The `#` run is counted
/// whole, so `####` is not a heading.
fn heading_marker(text: &str, followed: bool) -> Option<(u8, String)> {
    let level = text.chars().take_while(|&c| c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let content = after_marker(&text[level..], followed)?;
    Some((level as u8, content))
}

fn list_marker(text: &str, followed: bool) -> Option<String> {
    after_marker(text.strip_prefix('-')?, followed)
}

fn after_marker(rest: &str, followed: bool) -> Option<String> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim_start();
    if content.is_empty() && !followed {
        return None;
    }
    Some(content.to_string())
}

fn inlines(pieces: Vec<Piece>) -> Vec<Inline> {
    let mut out = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) if text.is_empty() => {}
            Piece::Text(text) => out.extend(parse_inline(&text)),
            Piece::Fence(code) => out.push(Inline::CodeBlock(code)),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Inline scan
// ---------------------------------------------------------------------------

fn parse_inline(text: &str) -> Vec<Inline> {
    let nodes = split_code_spans(text);
    let nodes = apply_delimited(nodes, 2, Inline::Strong);
    apply_delimited(nodes, 1, Inline::Emphasis)
}

/// `` `x` `` with non-empty content and no backtick inside. A backtick with
/// no partner is literal.
fn split_code_spans(text: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut buf = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        match after.find('`') {
            Some(0) => {
                buf.push_str(&rest[..=open]);
                rest = after;
            }
            Some(close) => {
                buf.push_str(&rest[..open]);
                if !buf.is_empty() {
                    nodes.push(Inline::Text(mem::take(&mut buf)));
                }
                nodes.push(Inline::Code(after[..close].to_string()));
                rest = &after[close + 1..];
            }
            None => break,
        }
    }

    buf.push_str(rest);
    if !buf.is_empty() {
        nodes.push(Inline::Text(buf));
    }
    nodes
}

#[derive(Clone)]
enum Atom {
    Char(char),
    Node(Inline),
}

/// Wrap `width` stars + content + `width` stars. Content is non-empty and
/// holds no star; nodes produced by earlier passes are opaque and may sit
/// inside the content.
fn apply_delimited(nodes: Vec<Inline>, width: usize, wrap: fn(Vec<Inline>) -> Inline) -> Vec<Inline> {
    let mut atoms = Vec::new();
    for node in nodes {
        match node {
            Inline::Text(text) => atoms.extend(text.chars().map(Atom::Char)),
            other => atoms.push(Atom::Node(other)),
        }
    }

    let is_star = |i: usize| matches!(atoms.get(i), Some(Atom::Char('*')));
    let is_delim = |i: usize| (i..i + width).all(|j| is_star(j));

    let mut out: Vec<Atom> = Vec::with_capacity(atoms.len());
    let mut i = 0;
    while i < atoms.len() {
        if is_delim(i) {
            let start = i + width;
            if let Some(end) = (start..atoms.len()).find(|&j| is_star(j)) {
                if end > start && is_delim(end) {
                    out.push(Atom::Node(wrap(group(&atoms[start..end]))));
                    i = end + width;
                    continue;
                }
            }
        }
        out.push(atoms[i].clone());
        i += 1;
    }

    group(&out)
}

fn group(atoms: &[Atom]) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut buf = String::new();
    for atom in atoms {
        match atom {
            Atom::Char(c) => buf.push(*c),
            Atom::Node(node) => {
                if !buf.is_empty() {
                    nodes.push(Inline::Text(mem::take(&mut buf)));
                }
                nodes.push(node.clone());
            }
        }
    }
    if !buf.is_empty() {
        nodes.push(Inline::Text(buf));
    }
    nodes
}

// ---------------------------------------------------------------------------
// HTML output
// ---------------------------------------------------------------------------

fn block_html(block: &Block) -> String {
    let mut out = String::new();
    match block {
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            push_inlines(&mut out, content);
            out.push_str(&format!("</h{level}>"));
        }
        Block::List(items) => {
            out.push_str("<ul>");
            for item in items {
                out.push_str("<li>");
                push_inlines(&mut out, item);
                out.push_str("</li>");
            }
            out.push_str("</ul>");
        }
        Block::Code(content) => push_inlines(&mut out, content),
        Block::Paragraph(content) => {
            out.push_str("<p>");
            push_inlines(&mut out, content);
            out.push_str("</p>");
        }
        Block::Blank => {}
    }
    out
}

fn push_inlines(out: &mut String, nodes: &[Inline]) {
    for node in nodes {
        match node {
            Inline::Text(text) => out.push_str(text),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(code);
                out.push_str("</code>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                push_inlines(out, children);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                push_inlines(out, children);
                out.push_str("</em>");
            }
            Inline::CodeBlock(code) => {
                out.push_str("<pre><code>");
                out.push_str(&code.replace('\n', "<br/>"));
                out.push_str("</code></pre>");
            }
        }
    }
}
