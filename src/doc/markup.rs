//! Markup conversion.
//!
//! The markup is a Markdown dialect close to what Discourse posts use:
//!
//! - blocks are separated by a blank line; an empty paragraph is `<br>`
//! - list items are `- ` / `1. `, indented two spaces per depth level
//! - a quote is `[quote="user" src="url"]`, raw body lines, then `[/quote]`
//! - a soft newline outside quotes is a `\` at the end of the line
//! - `**`, `*`, `__`, `~~` and `` ` `` toggle bold, italic, underline,
//!   strikethrough and code
//! - `[text](url)` links, `![alt|WxH](src)` images and
//!   `![text|name](upload://id)` upload placeholders, where `|name` is
//!   left out when it equals the text
//!
//! [`MarkupParser::parse`] is total: anything it does not recognize
//! degrades to plain paragraph text.

use super::block::char_to_byte;
use super::{Block, BlockType, Document, EntityMap, EntityType};
use crate::core::{CharMeta, DataMap, DataValue, EntityKey, InlineStyle, StyleSet};
use serde::{Deserialize, Serialize};

const QUOTE_CLOSE: &str = "[/quote]";
const EMPTY_BLOCK: &str = "<br>";
const UPLOAD_SCHEME: &str = "upload://";

/// Who a quote was taken from. Passed to the parser to restore avatars,
/// which the markup does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSource {
    pub username: String,
    #[serde(default, rename = "avatarURL")]
    pub avatar_url: String,
    #[serde(default, rename = "sourceURL")]
    pub source_url: String,
}

pub(crate) mod keys {
    pub const USERNAME: &str = "username";
    pub const AVATAR_URL: &str = "avatarURL";
    pub const SOURCE_URL: &str = "sourceURL";
    pub const ACTIVE: &str = "active";
    pub const URL: &str = "url";
    pub const SRC: &str = "src";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
}

/// Data map of a quote block.
pub fn quote_data(username: &str, avatar_url: &str, source_url: &str) -> DataMap {
    let mut data = DataMap::new();
    data.insert(keys::USERNAME.into(), DataValue::from(username));
    data.insert(keys::AVATAR_URL.into(), DataValue::from(avatar_url));
    data.insert(keys::SOURCE_URL.into(), DataValue::from(source_url));
    data.insert(keys::ACTIVE.into(), DataValue::Bool(false));
    data
}

impl Document {
    pub fn to_markup(&self) -> String {
        self.blocks()
            .map(|block| serialize_block(self, block))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn serialize_block(doc: &Document, block: &Block) -> String {
    match &block.kind {
        BlockType::Quote => {
            let username = block.data_str(keys::USERNAME).unwrap_or_default();
            let source = block.data_str(keys::SOURCE_URL).unwrap_or_default();
            format!(
                "[quote=\"{}\" src=\"{}\"]\n{}\n{}",
                escape_attr(username),
                escape_attr(source),
                serialize_inline(doc, block, "\n"),
                QUOTE_CLOSE
            )
        }
        BlockType::UnorderedListItem | BlockType::OrderedListItem => {
            let marker = if block.kind == BlockType::UnorderedListItem {
                "- "
            } else {
                "1. "
            };
            let indent = "  ".repeat(usize::from(block.depth));
            format!(
                "{indent}{marker}{}",
                serialize_inline(doc, block, "\\\n")
            )
        }
        // Custom block types have no markup form of their own.
        _ if block.is_empty() => EMPTY_BLOCK.to_string(),
        _ => serialize_inline(doc, block, "\\\n"),
    }
}

fn serialize_inline(doc: &Document, block: &Block, soft_break: &str) -> String {
    let mut out = String::with_capacity(block.text().len() + 8);
    let mut active = StyleSet::new();
    let mut open: Option<EntityKey> = None;
    let mut run_text = String::new();

    for (index, (ch, meta)) in block.text().chars().zip(block.chars()).enumerate() {
        let target = meta.entity.filter(|key| is_serializable(doc, *key));
        if target != open {
            if let Some(key) = open {
                close_entity(doc, key, &run_text, soft_break, &mut out);
            }
            if let Some(key) = target {
                open_entity(doc, key, &mut out);
            }
            open = target;
            run_text.clear();
        }
        push_style_delta(&active, &meta.style, &mut out);
        active = meta.style.clone();
        push_text_char(ch, index == 0, soft_break, &mut out);
        if open.is_some() {
            run_text.push(ch);
        }
    }

    if let Some(key) = open {
        close_entity(doc, key, &run_text, soft_break, &mut out);
    }
    push_style_delta(&active, &StyleSet::new(), &mut out);
    out
}

fn is_serializable(doc: &Document, key: EntityKey) -> bool {
    doc.entity(key).is_some_and(|entity| {
        matches!(
            entity.kind,
            EntityType::Link | EntityType::Image | EntityType::Upload
        )
    })
}

fn open_entity(doc: &Document, key: EntityKey, out: &mut String) {
    match doc.entity(key).map(|entity| &entity.kind) {
        Some(EntityType::Link) => out.push('['),
        _ => out.push_str("!["),
    }
}

fn close_entity(doc: &Document, key: EntityKey, run_text: &str, soft_break: &str, out: &mut String) {
    let Some(entity) = doc.entity(key) else {
        return;
    };
    let destination = match entity.kind {
        EntityType::Link => entity.data_str(keys::URL).unwrap_or_default().to_string(),
        EntityType::Upload => {
            // The name only needs spelling out once the visible run differs.
            let name = entity.data_str(keys::NAME).unwrap_or_default();
            if name != run_text {
                out.push('|');
                for ch in name.chars() {
                    push_text_char(ch, false, soft_break, out);
                }
            }
            format!(
                "{UPLOAD_SCHEME}{}",
                entity.data_str(keys::ID).unwrap_or_default()
            )
        }
        _ => {
            if let (Some(width), Some(height)) =
                (entity.data_int(keys::WIDTH), entity.data_int(keys::HEIGHT))
            {
                out.push_str(&format!("|{width}x{height}"));
            }
            entity.data_str(keys::SRC).unwrap_or_default().to_string()
        }
    };
    out.push_str("](");
    for ch in destination.chars() {
        match ch {
            '\n' => out.push_str(soft_break),
            '\\' | ')' | '(' | '[' | ']' | '\r' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push(')');
}

fn style_marker(style: InlineStyle) -> &'static str {
    match style {
        InlineStyle::Bold => "**",
        InlineStyle::Italic => "*",
        InlineStyle::Underline => "__",
        InlineStyle::Strikethrough => "~~",
        InlineStyle::Code => "`",
    }
}

fn push_style_delta(from: &StyleSet, to: &StyleSet, out: &mut String) {
    for style in InlineStyle::ALL {
        if from.contains(&style) != to.contains(&style) {
            out.push_str(style_marker(style));
        }
    }
}

fn push_text_char(ch: char, block_start: bool, soft_break: &str, out: &mut String) {
    match ch {
        '\n' => out.push_str(soft_break),
        '\\' | '*' | '_' | '~' | '`' | '[' | ']' | '!' | '<' | '|' | '\r' => {
            out.push('\\');
            out.push(ch);
        }
        // Leading characters that would otherwise read as list markers.
        ' ' | '\t' | '-' | '0'..='9' if block_start => {
            out.push('\\');
            out.push(ch);
        }
        _ => out.push(ch),
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct MarkupParser;

impl MarkupParser {
    pub fn parse(markup: &str, quotes: &[QuoteSource]) -> Document {
        let lines: Vec<&str> = markup
            .split('\n')
            .map(strip_carriage_return)
            .collect();

        let mut entities = EntityMap::new();
        let mut blocks = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = lines[index];
            if line.chars().all(|ch| ch == ' ' || ch == '\t') {
                index += 1;
                continue;
            }

            if let Some(header) = parse_quote_header(line)
                && let Some(close) = lines[index + 1..]
                    .iter()
                    .position(|candidate| *candidate == QUOTE_CLOSE)
            {
                let body = lines[index + 1..index + 1 + close].join("\n");
                blocks.push(parse_quote(&header, &body, quotes, &mut entities));
                index += close + 2;
                continue;
            }

            let mut content = String::new();
            while index < lines.len() {
                let current = lines[index];
                index += 1;
                if let Some(stripped) = strip_continuation(current) {
                    content.push_str(stripped);
                    content.push('\n');
                } else {
                    content.push_str(current);
                    break;
                }
            }
            blocks.push(parse_block(&content, &mut entities));
        }

        if blocks.is_empty() {
            return Document::new();
        }
        // Keys are fresh and every entity reference was created above.
        Document::from_parts(blocks, entities).unwrap_or_default()
    }
}

/// Drops a CRLF line ending. An escaped `\r` is content and stays.
fn strip_carriage_return(line: &str) -> &str {
    match line.strip_suffix('\r') {
        Some(rest) if rest.chars().rev().take_while(|ch| *ch == '\\').count() % 2 == 0 => rest,
        _ => line,
    }
}

/// Strips a trailing unescaped backslash, i.e. an odd run of backslashes.
fn strip_continuation(line: &str) -> Option<&str> {
    let run = line.chars().rev().take_while(|ch| *ch == '\\').count();
    if run % 2 == 1 {
        Some(&line[..line.len() - 1])
    } else {
        None
    }
}

struct QuoteHeader {
    username: String,
    source: String,
}

fn parse_quote_header(line: &str) -> Option<QuoteHeader> {
    let rest = line.strip_prefix("[quote")?;
    if rest == "]" {
        return Some(QuoteHeader {
            username: String::new(),
            source: String::new(),
        });
    }
    let rest = rest.strip_prefix('=')?;
    let (username, rest) = parse_attr_value(rest)?;
    let (source, rest) = match rest.strip_prefix(" src=") {
        Some(after) => parse_attr_value(after)?,
        None => (String::new(), rest),
    };
    (rest == "]").then_some(QuoteHeader { username, source })
}

/// Parses a `"..."` value, returning it and the remaining input.
fn parse_attr_value(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, &body[index + 1..])),
            '\\' => match chars.next()?.1 {
                'n' => value.push('\n'),
                other => value.push(other),
            },
            _ => value.push(ch),
        }
    }
    None
}

fn parse_quote(
    header: &QuoteHeader,
    body: &str,
    quotes: &[QuoteSource],
    entities: &mut EntityMap,
) -> Block {
    let avatar = quotes
        .iter()
        .find(|source| source.username == header.username)
        .map(|source| source.avatar_url.as_str())
        .unwrap_or_default();
    InlineParser::new(entities)
        .parse(body)
        .into_block(BlockType::Quote)
        .with_data(quote_data(&header.username, avatar, &header.source))
}

fn parse_block(content: &str, entities: &mut EntityMap) -> Block {
    if content == EMPTY_BLOCK {
        return Block::new(BlockType::Unstyled);
    }
    let indent = content.chars().take_while(|ch| *ch == ' ').count();
    let rest = &content[indent..];
    let depth = u8::try_from(indent / 2).unwrap_or(u8::MAX);

    if let Some(body) = rest.strip_prefix("- ").or((rest == "-").then_some("")) {
        return InlineParser::new(entities)
            .parse(body)
            .into_block(BlockType::UnorderedListItem)
            .with_depth(depth);
    }
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(body) = after.strip_prefix(". ").or((after == ".").then_some("")) {
            return InlineParser::new(entities)
                .parse(body)
                .into_block(BlockType::OrderedListItem)
                .with_depth(depth);
        }
    }
    InlineParser::new(entities)
        .parse(content)
        .into_block(BlockType::Unstyled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenKind {
    Link,
    Image,
}

struct OpenEntity {
    kind: OpenKind,
    start: usize,
    dims: Option<String>,
}

struct InlineParser<'a> {
    entities: &'a mut EntityMap,
    text: String,
    chars: Vec<CharMeta>,
    style: StyleSet,
    open: Option<OpenEntity>,
}

impl<'a> InlineParser<'a> {
    fn new(entities: &'a mut EntityMap) -> Self {
        Self {
            entities,
            text: String::new(),
            chars: Vec::new(),
            style: StyleSet::new(),
            open: None,
        }
    }

    fn parse(mut self, input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let mut index = 0;
        while index < input.len() {
            let ch = input[index];
            let next = input.get(index + 1).copied();

            if ch == '\\' {
                let literal = next.unwrap_or('\\');
                match self.open.as_mut().and_then(|open| open.dims.as_mut()) {
                    Some(dims) => dims.push(literal),
                    None => self.push_literal(literal),
                }
                index += 2;
                continue;
            }

            if let Some(dims) = self.open.as_mut().and_then(|open| open.dims.as_mut())
                && !(ch == ']' && next == Some('('))
            {
                dims.push(ch);
                index += 1;
                continue;
            }

            let pair = next.map(|second| [ch, second]);
            let toggled = match pair {
                Some(['*', '*']) => Some((InlineStyle::Bold, 2)),
                Some(['_', '_']) => Some((InlineStyle::Underline, 2)),
                Some(['~', '~']) => Some((InlineStyle::Strikethrough, 2)),
                _ if ch == '*' => Some((InlineStyle::Italic, 1)),
                _ if ch == '`' => Some((InlineStyle::Code, 1)),
                _ => None,
            };
            if let Some((style, width)) = toggled {
                if !self.style.remove(&style) {
                    self.style.insert(style);
                }
                index += width;
                continue;
            }

            match (ch, next) {
                ('!', Some('[')) if self.open.is_none() => {
                    self.open_entity(OpenKind::Image);
                    index += 2;
                }
                ('[', _) if self.open.is_none() => {
                    self.open_entity(OpenKind::Link);
                    index += 1;
                }
                ('|', _) if self.open.as_ref().is_some_and(|open| open.kind == OpenKind::Image) => {
                    if let Some(open) = self.open.as_mut() {
                        open.dims = Some(String::new());
                    }
                    index += 1;
                }
                (']', Some('(')) if self.open.is_some() => {
                    let (destination, consumed) = read_destination(&input[index + 2..]);
                    self.close_entity(destination);
                    index += 2 + consumed;
                }
                _ => {
                    self.push_literal(ch);
                    index += 1;
                }
            }
        }
        self.restore_unclosed();
        self
    }

    /// Puts back the markers of an entity that never saw its `](...)`.
    fn restore_unclosed(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        let marker = match open.kind {
            OpenKind::Link => "[",
            OpenKind::Image => "![",
        };
        let meta = CharMeta::new(self.style.clone(), None);
        self.text
            .insert_str(char_to_byte(&self.text, open.start), marker);
        self.chars.splice(
            open.start..open.start,
            marker.chars().map(|_| meta.clone()),
        );
        if let Some(dims) = open.dims {
            self.push_literal('|');
            dims.chars().for_each(|ch| self.push_literal(ch));
        }
    }

    fn push_literal(&mut self, ch: char) {
        self.text.push(ch);
        self.chars.push(CharMeta::new(self.style.clone(), None));
    }

    fn open_entity(&mut self, kind: OpenKind) {
        self.open = Some(OpenEntity {
            kind,
            start: self.chars.len(),
            dims: None,
        });
    }

    fn close_entity(&mut self, destination: String) {
        let Some(open) = self.open.take() else {
            return;
        };
        if open.start == self.chars.len() {
            return;
        }
        let mut data = DataMap::new();
        let kind = match open.kind {
            OpenKind::Link => {
                data.insert(keys::URL.into(), DataValue::String(destination));
                EntityType::Link
            }
            OpenKind::Image => match destination.strip_prefix(UPLOAD_SCHEME) {
                Some(id) => {
                    let name = open
                        .dims
                        .unwrap_or_else(|| self.text.chars().skip(open.start).collect());
                    data.insert(keys::ID.into(), DataValue::from(id));
                    data.insert(keys::NAME.into(), DataValue::String(name));
                    EntityType::Upload
                }
                None => {
                    data.insert(keys::SRC.into(), DataValue::String(destination));
                    if let Some((width, height)) = open.dims.as_deref().and_then(parse_dims) {
                        data.insert(keys::WIDTH.into(), DataValue::Int(width));
                        data.insert(keys::HEIGHT.into(), DataValue::Int(height));
                    }
                    EntityType::Image
                }
            },
        };
        let mutability = kind.default_mutability();
        let key = self.entities.create(kind, mutability, data);
        for meta in &mut self.chars[open.start..] {
            meta.entity = Some(key);
        }
    }

    fn into_block(self, kind: BlockType) -> Block {
        let fallback_len = self.chars.len();
        Block::from_parts(kind.clone(), self.text, self.chars)
            .unwrap_or_else(|| Block::with_text(kind, &" ".repeat(fallback_len)))
    }
}

/// Reads a link destination up to the closing `)`. Returns the value and
/// the number of input chars consumed, including the `)`.
fn read_destination(input: &[char]) -> (String, usize) {
    let mut value = String::new();
    let mut index = 0;
    while index < input.len() {
        match input[index] {
            '\\' if index + 1 < input.len() => {
                value.push(input[index + 1]);
                index += 2;
            }
            ')' => return (value, index + 1),
            ch => {
                value.push(ch);
                index += 1;
            }
        }
    }
    (value, index)
}

fn parse_dims(dims: &str) -> Option<(i64, i64)> {
    let (width, height) = dims.split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}
