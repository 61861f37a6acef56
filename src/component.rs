//! Component Source Parser
//!
//! Byte-level scanner splitting a Riot component file into its sections:
//!
//! ```html
//! <my-component>
//!   <p>{ state.message }</p>
//!   <script>export default { state: { message: 'hi' } }</script>
//!   <style>p { color: red }</style>
//! </my-component>
//! ```
//!
//! The first element that is not a `<script>` or `<style>` is the root node and
//! holds the template. Script and style blocks are recognized at the top level and
//! inside the root node; the first occurrence of each wins. Markup is not parsed
//! any further, that is the job of the template compiler.

use lazy_static::lazy_static;
use memchr::memchr;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ComponentParseError;
use crate::script::ScriptSection;

lazy_static! {
    static ref ATTRIBUTE_RE: Regex =
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute pattern is valid");
}

const TAG_SCRIPT: &[u8] = b"script";
const TAG_STYLE: &[u8] = b"style";

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub name: String,
    /// Offset of the opening `<`
    pub start: usize,
    /// Offset right after the closing `>`
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

impl ElementNode {
    pub fn content<'s>(&self, source: &'s str) -> &'s str {
        &source[self.content_start..self.content_end]
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Range of the whole element, tags included.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// Root node of the component
    pub template: Option<ElementNode>,
    pub javascript: Option<ElementNode>,
    pub css: Option<ElementNode>,
}

/// Which sections a component source contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSections {
    pub template: bool,
    pub javascript: bool,
    pub css: bool,
}

impl ComponentSections {
    pub fn any(&self) -> bool {
        self.template || self.javascript || self.css
    }
}

impl ComponentDescriptor {
    pub fn root(&self) -> Option<&ElementNode> {
        self.template.as_ref()
    }

    /// Component name, taken from the root node.
    pub fn name(&self) -> Option<&str> {
        self.template.as_ref().map(|root| root.name.as_str())
    }

    pub fn sections(&self) -> ComponentSections {
        ComponentSections {
            template: self.template.is_some(),
            javascript: self.javascript.is_some(),
            css: self.css.is_some(),
        }
    }

    /// The script block as a section of `source`, the text this descriptor was
    /// parsed from.
    pub fn script_section<'s>(&self, source: &'s str) -> Option<ScriptSection<'s>> {
        self.javascript.as_ref().map(|script| {
            ScriptSection::with_attributes(
                script.content(source),
                script.content_start as u32,
                script.attributes.clone(),
            )
        })
    }

    fn record(&mut self, element: ElementNode) {
        let slot = if tag_name_eq(element.name.as_bytes(), TAG_SCRIPT) {
            &mut self.javascript
        } else if tag_name_eq(element.name.as_bytes(), TAG_STYLE) {
            &mut self.css
        } else {
            &mut self.template
        };
        if slot.is_none() {
            *slot = Some(element);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

/// Split a component source into its sections.
pub fn parse_component(source: &str) -> Result<ComponentDescriptor, ComponentParseError> {
    let bytes = source.as_bytes();
    let mut descriptor = ComponentDescriptor::default();
    let mut found_element = false;
    let mut pos = 0;

    while let Some(offset) = memchr(b'<', &bytes[pos..]) {
        let start = pos + offset;

        match scan_markup(source, start)? {
            Markup::Skip(next) => pos = next,
            Markup::Open(tag) => {
                found_element = true;

                if is_raw_text(&tag.name) {
                    let element = raw_text_element(source, tag)?;
                    pos = element.end;
                    descriptor.record(element);
                } else if descriptor.template.is_none() {
                    let (element, nested) = element_with_children(source, tag)?;
                    pos = element.end;
                    descriptor.template = Some(element);
                    for child in nested {
                        descriptor.record(child);
                    }
                } else {
                    // markup outside of the root node is left to the root validator
                    let (element, _) = element_with_children(source, tag)?;
                    pos = element.end;
                }
            }
        }

        if pos >= bytes.len() {
            break;
        }
    }

    if !found_element {
        return Err(ComponentParseError::MissingRoot);
    }

    Ok(descriptor)
}

/// Opening tag as scanned, before its content is located.
#[derive(Debug)]
struct OpenTag {
    name: String,
    start: usize,
    /// Offset right after the closing `>` of the opening tag
    end: usize,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

enum Markup {
    /// Not an opening tag; resume scanning at this offset
    Skip(usize),
    Open(OpenTag),
}

#[inline(always)]
fn tag_name_eq(name: &[u8], expected: &[u8]) -> bool {
    name.len() == expected.len() && name.eq_ignore_ascii_case(expected)
}

fn is_raw_text(name: &str) -> bool {
    tag_name_eq(name.as_bytes(), TAG_SCRIPT) || tag_name_eq(name.as_bytes(), TAG_STYLE)
}

fn is_name_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'>' || byte == b'/'
}

/// Classify the markup starting at the `<` found at `start`.
fn scan_markup(source: &str, start: usize) -> Result<Markup, ComponentParseError> {
    let bytes = source.as_bytes();
    let rest = &bytes[start..];

    if rest.starts_with(b"<!--") {
        return find(bytes, b"-->", start + 4)
            .map(|end| Markup::Skip(end + 3))
            .ok_or_else(|| ComponentParseError::UnterminatedTag {
                tag: "!--".to_string(),
                offset: start,
            });
    }

    if rest.starts_with(b"<!") || rest.starts_with(b"</") {
        // doctype or stray closing tag
        return Ok(Markup::Skip(
            memchr(b'>', rest).map_or(bytes.len(), |end| start + end + 1),
        ));
    }

    if !rest.get(1).is_some_and(|b| b.is_ascii_alphabetic()) {
        return Ok(Markup::Skip(start + 1));
    }

    let name_end = rest[1..]
        .iter()
        .position(|&b| is_name_end(b))
        .map_or(bytes.len(), |idx| start + 1 + idx);
    let name = source[start + 1..name_end].to_string();

    let Some(tag_end) = find_tag_end(bytes, name_end) else {
        return Err(ComponentParseError::UnterminatedTag { tag: name, offset: start });
    };

    let self_closing = tag_end > name_end && bytes[tag_end - 1] == b'/';
    let attributes_end = if self_closing { tag_end - 1 } else { tag_end };

    Ok(Markup::Open(OpenTag {
        attributes: parse_attributes(&source[name_end..attributes_end]),
        name,
        start,
        end: tag_end + 1,
        self_closing,
    }))
}

/// Offset of the `>` closing a tag, ignoring quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;

    for (idx, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(idx),
            None => {}
        }
    }

    None
}

fn parse_attributes(text: &str) -> Vec<(String, String)> {
    ATTRIBUTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| m.as_str().to_string());
            Some((name, value))
        })
        .collect()
}

/// Case-insensitive search for `needle` starting at `from`.
fn find(bytes: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let first = needle.first()?.to_ascii_lowercase();
    let mut pos = from;

    while pos < bytes.len() {
        let offset = bytes[pos..]
            .iter()
            .position(|b| b.to_ascii_lowercase() == first)?;
        let idx = pos + offset;
        if bytes
            .get(idx..idx + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
        {
            return Some(idx);
        }
        pos = idx + 1;
    }

    None
}

/// Offset of the closing tag `</name>` of an element, and the offset right after it.
fn closing_tag_at(bytes: &[u8], idx: usize, name: &[u8]) -> Option<usize> {
    let rest = bytes.get(idx..)?;
    if !rest.starts_with(b"</") {
        return None;
    }
    let candidate = rest.get(2..2 + name.len())?;
    if !candidate.eq_ignore_ascii_case(name) {
        return None;
    }
    match rest.get(2 + name.len()) {
        Some(b) if b.is_ascii_whitespace() || *b == b'>' => {
            memchr(b'>', &rest[2 + name.len()..]).map(|end| idx + 2 + name.len() + end + 1)
        }
        _ => None,
    }
}

/// `<script>` and `<style>` hold raw text up to their closing tag.
fn raw_text_element(source: &str, tag: OpenTag) -> Result<ElementNode, ComponentParseError> {
    let bytes = source.as_bytes();

    if tag.self_closing {
        return Ok(element(tag, None));
    }

    let mut pos = tag.end;
    loop {
        let Some(idx) = find(bytes, b"</", pos) else {
            return Err(ComponentParseError::UnclosedElement {
                tag: tag.name,
                offset: tag.start,
            });
        };
        if let Some(end) = closing_tag_at(bytes, idx, tag.name.as_bytes()) {
            return Ok(element(tag, Some((idx, end))));
        }
        pos = idx + 2;
    }
}

/// Locate the end of an element by tracking nested elements of the same name.
/// Script and style blocks met along the way are returned as well.
fn element_with_children(
    source: &str,
    tag: OpenTag,
) -> Result<(ElementNode, Vec<ElementNode>), ComponentParseError> {
    let bytes = source.as_bytes();
    let mut nested = Vec::new();

    if tag.self_closing {
        return Ok((element(tag, None), nested));
    }

    let name = tag.name.clone();
    let mut depth = 1usize;
    let mut pos = tag.end;

    while let Some(offset) = memchr(b'<', bytes.get(pos..).unwrap_or_default()) {
        let idx = pos + offset;

        if let Some(end) = closing_tag_at(bytes, idx, name.as_bytes()) {
            depth -= 1;
            if depth == 0 {
                return Ok((element(tag, Some((idx, end))), nested));
            }
            pos = end;
            continue;
        }

        match scan_markup(source, idx)? {
            Markup::Skip(next) => pos = next,
            Markup::Open(child) if is_raw_text(&child.name) => {
                let child = raw_text_element(source, child)?;
                pos = child.end;
                nested.push(child);
            }
            Markup::Open(child) => {
                if tag_name_eq(child.name.as_bytes(), name.as_bytes()) && !child.self_closing {
                    depth += 1;
                }
                pos = child.end;
            }
        }
    }

    Err(ComponentParseError::UnclosedElement {
        tag: tag.name,
        offset: tag.start,
    })
}

/// `closing` is the range of the closing tag, `None` for elements without content.
fn element(tag: OpenTag, closing: Option<(usize, usize)>) -> ElementNode {
    let (content_end, end) = closing.unwrap_or((tag.end, tag.end));
    ElementNode {
        name: tag.name,
        start: tag.start,
        end,
        content_start: tag.end,
        content_end,
        attributes: tag.attributes,
        self_closing: tag.self_closing,
    }
}
