//! Position maps between translated script code and the original component file.
//!
//! A translator may reshape the script text (strip types, expand syntax, insert a
//! prelude). The map records anchor points `generated -> original`; offsets between
//! two anchors keep their distance to the preceding anchor.

use oxc_sourcemap::SourceMap;
use serde::{Deserialize, Serialize};

/// A single anchor of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetMapping {
    /// Offset in the translated code
    pub generated: u32,
    /// Offset in the original text
    pub original: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMap {
    mappings: Vec<OffsetMapping>,
}

impl PositionMap {
    pub fn new(mut mappings: Vec<OffsetMapping>) -> Self {
        mappings.sort_by_key(|m| m.generated);
        mappings.dedup_by_key(|m| m.generated);
        Self { mappings }
    }

    pub fn add_mapping(&mut self, generated: u32, original: u32) {
        let idx = self.mappings.partition_point(|m| m.generated < generated);
        match self.mappings.get_mut(idx) {
            Some(existing) if existing.generated == generated => existing.original = original,
            _ => self
                .mappings
                .insert(idx, OffsetMapping { generated, original }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn mappings(&self) -> &[OffsetMapping] {
        &self.mappings
    }

    /// Map an offset of the translated code back to the original text.
    /// Offsets before the first anchor belong to synthesized code and resolve to
    /// the first mapped original position.
    pub fn original_offset(&self, generated: u32) -> u32 {
        let idx = self.mappings.partition_point(|m| m.generated <= generated);
        if idx == 0 {
            return self.mappings.first().map_or(generated, |m| m.original);
        }
        let anchor = self.mappings[idx - 1];
        anchor.original + (generated - anchor.generated)
    }

    /// Merge the map with a constant shift of every original position.
    pub fn with_base_offset(&self, base: u32) -> Self {
        Self {
            mappings: self
                .mappings
                .iter()
                .map(|m| OffsetMapping {
                    generated: m.generated,
                    original: m.original + base,
                })
                .collect(),
        }
    }

    /// Build a map from a Source Map v3 JSON document produced by a translator.
    ///
    /// Returns `None` for maps without mappings and for malformed documents; both
    /// are treated as absent maps by the compiler. Only tokens of the first source
    /// are used.
    pub fn from_source_map_json(json: &str, generated_code: &str, original_code: &str) -> Option<Self> {
        let source_map = match SourceMap::from_json_string(json) {
            Ok(source_map) => source_map,
            Err(e) => {
                tracing::warn!(error = ?e, "ignoring malformed translator source map");
                return None;
            }
        };

        let generated_lines = line_starts(generated_code);
        let original_lines = line_starts(original_code);

        let mappings = source_map
            .get_tokens()
            .filter(|token| token.get_source_id() == Some(0))
            .filter_map(|token| {
                let generated = resolve_offset(
                    &generated_lines,
                    generated_code,
                    token.get_dst_line(),
                    token.get_dst_col(),
                )?;
                let original =
                    resolve_offset(&original_lines, original_code, token.get_src_line(), token.get_src_col())?;
                Some(OffsetMapping { generated, original })
            })
            .collect();

        let map = Self::new(mappings);
        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }
}

fn line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0];
    starts.extend(
        memchr::memchr_iter(b'\n', text.as_bytes()).map(|idx| idx as u32 + 1),
    );
    starts
}

fn resolve_offset(starts: &[u32], text: &str, line: u32, column: u32) -> Option<u32> {
    let start = *starts.get(line as usize)?;
    let offset = start as u64 + column as u64;
    Some(offset.min(text.len() as u64) as u32)
}
