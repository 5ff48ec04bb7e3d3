//! Layer-segmented G-code buffer.
//!
//! The buffer mirrors how the slicing engine hands its output to
//! post-processing: an ordered list of text blocks. Block 0 is the header
//! metadata, block 1 the start sequence, blocks `[2, n-2]` the print layers
//! in order, and the final block the end sequence. Passes mutate blocks in
//! place; the host owns creation and persistence.

pub mod anchor;

pub use anchor::{
    AnchorPattern, LinePos, Placement, find_anchors, find_first_anchor, insert_at_anchors,
    insert_lines, with_aligned_comment,
};

/// Marker prefix emitted by the slicer at every layer change.
pub const LAYER_MARKER: &str = ";LAYER:";

/// Marker prefix emitted by the slicer at every extrusion-region change.
pub const TYPE_MARKER: &str = ";TYPE:";

/// Marker line the slicer emits after the last layer.
pub const END_MARKER: &str = ";End of Gcode";

/// One block of the buffer, owning its lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    lines: Vec<String>,
}

impl Block {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Build a block from newline-separated text.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Insert a line, shifting subsequent indices in this block only. Any
    /// previously computed index at or past `index` is stale afterwards.
    pub fn insert(&mut self, index: usize, line: impl Into<String>) {
        self.lines.insert(index, line.into());
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Replace the whole line list, preserving block identity.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether any line in the block starts with the given prefix.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.lines.iter().any(|l| l.starts_with(prefix))
    }

    /// The layer number of this block's `;LAYER:<n>` marker, if it has one.
    pub fn layer_number(&self) -> Option<i32> {
        self.lines
            .iter()
            .find_map(|l| l.strip_prefix(LAYER_MARKER))
            .and_then(|rest| rest.trim().parse().ok())
    }
}

/// The whole buffer for one print: header, start sequence, layers, end
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerBuffer {
    blocks: Vec<Block>,
}

impl LayerBuffer {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Segment flat G-code text into blocks the way the slicer does: leading
    /// comments form the header, the start sequence runs to the first layer
    /// marker, each `;LAYER:<n>` line begins a new block, and the end marker
    /// begins the end sequence. An empty end block is appended when the
    /// marker is missing so the end sequence is always the last block.
    pub fn from_text(text: &str) -> Self {
        let mut blocks: Vec<Block> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut in_header = true;
        let mut seen_end = false;

        for line in text.lines() {
            let starts_layer = line.starts_with(LAYER_MARKER);
            let starts_end = line.starts_with(END_MARKER);

            if in_header && !line.trim_start().is_empty() && !line.trim_start().starts_with(';') {
                // First command line ends the header and opens the start
                // sequence.
                blocks.push(Block::new(std::mem::take(&mut current)));
                in_header = false;
            }

            if (starts_layer || starts_end) && !seen_end {
                if in_header {
                    // Degenerate input with a layer marker before any
                    // command: close the header anyway.
                    in_header = false;
                }
                blocks.push(Block::new(std::mem::take(&mut current)));
                seen_end = starts_end;
            }

            current.push(line.to_string());
        }
        blocks.push(Block::new(current));

        if !seen_end {
            blocks.push(Block::default());
        }

        Self { blocks }
    }

    /// Flatten back to text for persistence. Every line gets a trailing
    /// newline; empty blocks contribute nothing.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            for line in &block.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Header/metadata block (index 0). The idempotency sentinels live here.
    pub fn header(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn header_mut(&mut self) -> Option<&mut Block> {
        self.blocks.first_mut()
    }

    /// Index of the first print-layer block (always 2 in a well-formed
    /// buffer).
    pub fn first_layer_block(&self) -> usize {
        2
    }

    /// Index of the last print-layer block; the end sequence follows it.
    pub fn last_layer_block(&self) -> usize {
        self.blocks.len().saturating_sub(2)
    }

    /// Find the block carrying the `;LAYER:<n>` marker for 0-based layer
    /// `number`.
    pub fn find_layer(&self, number: i32) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| b.layer_number() == Some(number))
    }
}
