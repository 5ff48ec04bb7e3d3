//! Marker-anchored line insertion.
//!
//! Passes never edit by absolute position; they locate a structural marker
//! (layer change, region type, extrusion reset, tool select) and insert
//! relative to it. Anchors are plain `(block, line)` positions and go stale
//! the moment anything is inserted into the same block, so they are always
//! recomputed per pass and the engine applies multi-anchor insertions back to
//! front.

use crate::buffer::{Block, LAYER_MARKER, LayerBuffer, TYPE_MARKER};
use crate::parser::{self, TokenKind};

/// Column that inline comments on inserted lines are aligned to.
pub const COMMENT_COLUMN: usize = 30;

/// A located line in the buffer. Stale after any insertion into `block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LinePos {
    pub block: usize,
    pub line: usize,
}

/// Structural patterns an anchor can match, all by exact prefix on the line.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorPattern {
    /// The `;LAYER:<n>` marker for one specific 0-based layer number.
    Layer(i32),
    /// Any `;LAYER:<n>` marker.
    AnyLayer,
    /// A `;TYPE:<NAME>` region marker, e.g. `RegionType("PRIME-TOWER")`.
    RegionType(String),
    /// The first extrusion-reset line (`G92 E...`) of each block.
    ExtrusionReset,
    /// A `T<n>` tool-select line.
    ToolSelect(u8),
}

impl AnchorPattern {
    /// Whether the line matches this pattern.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::Layer(number) => line
                .strip_prefix(LAYER_MARKER)
                .and_then(|rest| rest.trim().parse::<i32>().ok())
                .is_some_and(|n| n == *number),
            Self::AnyLayer => line.starts_with(LAYER_MARKER),
            Self::RegionType(name) => line
                .strip_prefix(TYPE_MARKER)
                .is_some_and(|rest| rest.trim() == name),
            Self::ExtrusionReset => {
                let mut tokens = parser::live_tokens(line);
                tokens.next().is_some_and(|t| t.text.eq_ignore_ascii_case("G92"))
                    && tokens.any(|t| {
                        t.kind == TokenKind::Parameter
                            && t.text.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'E'))
                    })
            }
            Self::ToolSelect(tool) => {
                matches!(parser::tool_index(line), Ok(Some(t)) if t == *tool)
            }
        }
    }

    /// Whether only the first match per block is an anchor. Extrusion resets
    /// recur within a block (one per retraction cycle); only the first one
    /// is structural.
    fn first_per_block(&self) -> bool {
        matches!(self, Self::ExtrusionReset)
    }
}

/// Where to place inserted lines relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// All anchor positions matching `pattern` within the block range
/// `[from_block, to_block]` inclusive.
pub fn find_anchors(
    buffer: &LayerBuffer,
    from_block: usize,
    to_block: usize,
    pattern: &AnchorPattern,
) -> Vec<LinePos> {
    let mut found = Vec::new();
    for (block_idx, block) in buffer
        .blocks()
        .iter()
        .enumerate()
        .skip(from_block)
        .take(to_block.saturating_sub(from_block) + 1)
    {
        for (line_idx, line) in block.lines().iter().enumerate() {
            if pattern.matches(line) {
                found.push(LinePos {
                    block: block_idx,
                    line: line_idx,
                });
                if pattern.first_per_block() {
                    break;
                }
            }
        }
    }
    found
}

/// The nearest anchor matching `pattern` at or after `from_block`.
pub fn find_first_anchor(
    buffer: &LayerBuffer,
    from_block: usize,
    to_block: usize,
    pattern: &AnchorPattern,
) -> Option<LinePos> {
    find_anchors(buffer, from_block, to_block, pattern)
        .into_iter()
        .next()
}

/// Insert `lines` immediately before or after every anchor matching
/// `pattern` (or only the first match when `first_only`). Existing lines are
/// never reordered; within each block the insertions are applied back to
/// front so earlier anchors stay valid while later ones are patched.
///
/// Returns the number of anchors that received an insertion.
pub fn insert_at_anchors(
    buffer: &mut LayerBuffer,
    from_block: usize,
    to_block: usize,
    pattern: &AnchorPattern,
    placement: Placement,
    lines: &[String],
    first_only: bool,
) -> usize {
    let mut anchors = find_anchors(buffer, from_block, to_block, pattern);
    if first_only {
        anchors.truncate(1);
    }

    for anchor in anchors.iter().rev() {
        if let Some(block) = buffer.block_mut(anchor.block) {
            insert_lines(block, anchor.line, placement, lines);
        }
    }
    anchors.len()
}

/// Insert `lines` into `block` before or after line `at`.
pub fn insert_lines(block: &mut Block, at: usize, placement: Placement, lines: &[String]) {
    let index = match placement {
        Placement::Before => at,
        Placement::After => (at + 1).min(block.len()),
    };
    for (offset, line) in lines.iter().enumerate() {
        block.insert(index + offset, line.clone());
    }
}

/// Format a command with an inline comment aligned to [`COMMENT_COLUMN`].
///
/// The padding is ordinary whitespace in front of the `;`, so the lexer sees
/// the same tokens as for the unpadded line.
pub fn with_aligned_comment(code: &str, comment: &str) -> String {
    let pad = COMMENT_COLUMN.saturating_sub(code.len()).max(1);
    format!("{code}{:pad$}; {comment}", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer() -> LayerBuffer {
        LayerBuffer::from_text(
            ";header\nG28\nG92 E0\n;LAYER:0\nT0\nG1 X1 E1\n;LAYER:1\n;TYPE:PRIME-TOWER\nT1\nG1 X2 E2\n;End of Gcode\n",
        )
    }

    #[test]
    fn test_layer_pattern_matches_exact_number_only() {
        let pattern = AnchorPattern::Layer(1);
        assert!(pattern.matches(";LAYER:1"));
        assert!(!pattern.matches(";LAYER:10"));
        assert!(!pattern.matches(";LAYER_COUNT:1"));
    }

    #[test]
    fn test_region_type_pattern() {
        let pattern = AnchorPattern::RegionType("PRIME-TOWER".to_string());
        assert!(pattern.matches(";TYPE:PRIME-TOWER"));
        assert!(!pattern.matches(";TYPE:WALL-OUTER"));
    }

    #[test]
    fn test_extrusion_reset_pattern() {
        let pattern = AnchorPattern::ExtrusionReset;
        assert!(pattern.matches("G92 E0"));
        assert!(pattern.matches("G92 E-2.5"));
        assert!(!pattern.matches("G92 X0 Y0"));
        assert!(!pattern.matches("G1 E0"));
    }

    #[test]
    fn test_tool_select_pattern() {
        let pattern = AnchorPattern::ToolSelect(1);
        assert!(pattern.matches("T1"));
        assert!(!pattern.matches("T0"));
        assert!(!pattern.matches("T10"));
        assert!(!pattern.matches("M104 T1 S200"));
    }

    #[test]
    fn test_find_anchors_across_blocks() {
        let buffer = sample_buffer();
        let anchors = find_anchors(&buffer, 0, buffer.len() - 1, &AnchorPattern::AnyLayer);
        assert_eq!(
            anchors,
            vec![LinePos { block: 2, line: 0 }, LinePos { block: 3, line: 0 }]
        );
    }

    #[test]
    fn test_find_first_anchor_is_the_nearest_match() {
        let buffer = sample_buffer();

        let first = find_first_anchor(&buffer, 0, buffer.len() - 1, &AnchorPattern::AnyLayer);
        assert_eq!(first, Some(LinePos { block: 2, line: 0 }));

        // Searching from a later block skips the earlier marker
        let later = find_first_anchor(&buffer, 3, buffer.len() - 1, &AnchorPattern::AnyLayer);
        assert_eq!(later, Some(LinePos { block: 3, line: 0 }));

        let missing = find_first_anchor(&buffer, 0, buffer.len() - 1, &AnchorPattern::Layer(9));
        assert_eq!(missing, None);
    }

    #[test]
    fn test_insert_after_every_match() {
        let mut buffer = sample_buffer();
        let end = buffer.len() - 1;
        let count = insert_at_anchors(
            &mut buffer,
            0,
            end,
            &AnchorPattern::AnyLayer,
            Placement::After,
            &["M117 NEW LAYER".to_string()],
            false,
        );

        assert_eq!(count, 2);
        assert_eq!(buffer.block(2).unwrap().line(1), Some("M117 NEW LAYER"));
        assert_eq!(buffer.block(3).unwrap().line(1), Some("M117 NEW LAYER"));
    }

    #[test]
    fn test_insert_first_only() {
        let mut buffer = sample_buffer();
        let end = buffer.len() - 1;
        let count = insert_at_anchors(
            &mut buffer,
            0,
            end,
            &AnchorPattern::AnyLayer,
            Placement::After,
            &["M117 ONCE".to_string()],
            true,
        );

        assert_eq!(count, 1);
        assert_eq!(buffer.block(2).unwrap().line(1), Some("M117 ONCE"));
        assert!(!buffer.block(3).unwrap().contains_prefix("M117"));
    }

    #[test]
    fn test_insertion_preserves_other_blocks() {
        let mut buffer = sample_buffer();
        let untouched_before = buffer.block(3).unwrap().clone();

        let end = buffer.len() - 1;
        insert_at_anchors(
            &mut buffer,
            0,
            end,
            &AnchorPattern::Layer(0),
            Placement::Before,
            &["M83".to_string()],
            false,
        );

        assert_eq!(buffer.block(2).unwrap().line(0), Some("M83"));
        assert_eq!(buffer.block(3).unwrap(), &untouched_before);
    }

    #[test]
    fn test_multi_line_insertion_keeps_order() {
        let mut buffer = sample_buffer();
        let lines = vec!["M400".to_string(), "M117 A".to_string(), "M117 B".to_string()];
        insert_at_anchors(
            &mut buffer,
            2,
            2,
            &AnchorPattern::ToolSelect(0),
            Placement::After,
            &lines,
            false,
        );

        let block = buffer.block(2).unwrap();
        assert_eq!(block.line(1), Some("T0"));
        assert_eq!(block.line(2), Some("M400"));
        assert_eq!(block.line(3), Some("M117 A"));
        assert_eq!(block.line(4), Some("M117 B"));
    }

    #[test]
    fn test_aligned_comment_column() {
        let line = with_aligned_comment("G0 F300 Z0.8", "travel hop");
        assert_eq!(line.find(';'), Some(COMMENT_COLUMN));
        assert_eq!(crate::parser::param_value(&line, 'Z').unwrap(), Some(0.8));

        // Long code still gets one space before the comment
        let long = with_aligned_comment("G1 F12000 X123.456 Y654.321 E12.34567", "tag");
        assert!(long.contains(" ; tag"));
    }
}
