//! Machine-state tracking.
//!
//! One forward scan over a block range, maintaining the active tool, the
//! absolute X/Y/Z position, the active feed rate, and the length of the
//! travel run in progress. The state belongs to a single scan: it is never
//! rolled back and never persisted across passes. A pass that needs state
//! "before" a point it has already mutated re-runs the scan from the start.
//!
//! Axes are sticky: a motion command updates only the axes it carries. The
//! initial absolute Z is never explicitly emitted by the slicer, so Z must be
//! seeded from the first-layer height before scanning.

use crate::buffer::LayerBuffer;
use crate::error::{PassError, ValueError};
use crate::parser;

/// Machine state maintained by one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Active tool index; `None` until the first tool-select line.
    pub tool: Option<u8>,
    /// Absolute X; `None` until first seen.
    pub x: Option<f64>,
    /// Absolute Y; `None` until first seen.
    pub y: Option<f64>,
    /// Absolute Z; seeded from the first-layer height.
    pub z: Option<f64>,
    /// Active feed rate in mm/min; `None` until the first F parameter.
    pub feed: Option<f64>,
    /// Accumulated XY distance of the travel run in progress; reset by the
    /// next extruding move.
    pub travel_distance: f64,
}

impl MachineState {
    /// Fresh state with every field unset.
    pub fn new() -> Self {
        Self {
            tool: None,
            x: None,
            y: None,
            z: None,
            feed: None,
            travel_distance: 0.0,
        }
    }

    /// Fresh state with Z seeded from the first-layer height setting.
    pub fn seeded(initial_layer_height: f64) -> Self {
        Self {
            z: Some(initial_layer_height),
            ..Self::new()
        }
    }

    /// Current XY, with unseen axes at the origin. The slicer homes to 0/0
    /// before the first positioning move, so this matches the machine.
    pub fn position(&self) -> (f64, f64) {
        (self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }

    /// Fold one line into the state.
    pub fn observe_line(&mut self, line: &str) -> Result<(), ValueError> {
        if let Some(tool) = parser::tool_index(line)? {
            self.tool = Some(tool);
            return Ok(());
        }

        if !parser::is_motion_command(line) {
            return Ok(());
        }

        let (prev_x, prev_y) = self.position();
        if let Some(x) = parser::param_value(line, 'X')? {
            self.x = Some(x);
        }
        if let Some(y) = parser::param_value(line, 'Y')? {
            self.y = Some(y);
        }
        if let Some(z) = parser::param_value(line, 'Z')? {
            self.z = Some(z);
        }
        if let Some(feed) = parser::param_value(line, 'F')? {
            self.feed = Some(feed);
        }

        if parser::param_value(line, 'E')?.is_some() {
            self.travel_distance = 0.0;
        } else if parser::has_live_param(line, 'X') || parser::has_live_param(line, 'Y') {
            let (x, y) = self.position();
            self.travel_distance += ((x - prev_x).powi(2) + (y - prev_y).powi(2)).sqrt();
        }

        Ok(())
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan the blocks `[from_block, to_block)` in order, folding every line into
/// `state`. Positions in the error refer to the scanned buffer.
pub fn scan_blocks(
    buffer: &LayerBuffer,
    from_block: usize,
    to_block: usize,
    state: &mut MachineState,
) -> Result<(), PassError> {
    for (block_idx, block) in buffer
        .blocks()
        .iter()
        .enumerate()
        .skip(from_block)
        .take(to_block.saturating_sub(from_block))
    {
        for (line_idx, line) in block.lines().iter().enumerate() {
            state
                .observe_line(line)
                .map_err(|e| PassError::malformed(block_idx, line_idx, e))?;
        }
    }
    Ok(())
}
