//! Detection of markup outside of the component root node.
//!
//! A component file holds a single root node. Whatever remains once the root is
//! cut out (head and tail) is parsed again; if the leftover yields any section the
//! component has more than one root. Leftovers that fail to parse are treated as
//! plain text, so this check never reports a false positive on unparsable junk.

use std::ops::Range;

use crate::component::{parse_component, ComponentSections};

/// True when `source` contains a template, script or style outside of `root`.
/// Without a root the whole source is inspected.
pub fn has_markup_outside_root(root: Option<Range<usize>>, source: &str) -> bool {
    has_markup_outside_root_with(root, source, |code| {
        parse_component(code).map(|descriptor| descriptor.sections())
    })
}

/// Same as [`has_markup_outside_root`] with a custom component parser.
pub fn has_markup_outside_root_with<F, E>(root: Option<Range<usize>>, source: &str, parse: F) -> bool
where
    F: FnOnce(&str) -> Result<ComponentSections, E>,
{
    let leftover = match root {
        Some(range) => {
            let head = source.get(..range.start).unwrap_or_default();
            let tail = source.get(range.end..).unwrap_or_default();
            [head, tail].concat()
        }
        None => source.to_string(),
    };

    let leftover = leftover.trim();
    if leftover.is_empty() {
        return false;
    }

    match parse(leftover) {
        Ok(sections) => {
            tracing::debug!(?sections, "parsed markup outside of the root node");
            sections.any()
        }
        Err(_) => false,
    }
}
