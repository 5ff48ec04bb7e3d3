//! Tool-change macro injection.
//!
//! Finds each tool's usage span (the first and last `T<n>` selection in the
//! print) and injects the configured one-time macros: the first-use macro
//! right after the tool's first selection, and the last-use macro at the
//! closing boundary of whichever tool is selected latest in the buffer. Tools
//! that never appear are skipped silently; a dual-extruder profile sliced
//! with one tool is normal, not an error.

use std::collections::BTreeMap;

use crate::buffer::{LayerBuffer, LinePos, Placement, insert_lines};
use crate::error::PassError;
use crate::parser;
use crate::passes::{Outcome, Pass, PassContext};
use crate::settings::schema::{SettingsFile, ToolMacrosSettings};

/// Per tool, where it is first and last selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolUsageSpan {
    pub first: LinePos,
    pub last: LinePos,
}

/// The tool-change macro pass.
pub struct ToolMacros;

impl Pass for ToolMacros {
    fn name(&self) -> &'static str {
        "Tool Change Macros"
    }

    fn enabled(&self, settings: &SettingsFile) -> bool {
        settings
            .passes
            .tool_macros
            .as_ref()
            .is_some_and(|c| c.enabled)
    }

    fn apply(
        &self,
        buffer: &mut LayerBuffer,
        ctx: &mut PassContext<'_>,
    ) -> Result<Outcome, PassError> {
        let printer = &ctx.settings.printer;
        let cfg = ctx
            .settings
            .passes
            .tool_macros
            .as_ref()
            .ok_or_else(|| PassError::Configuration("tool_macros section missing".to_string()))?;

        if printer.extruder_count < 2 {
            ctx.notices.notify(
                self.name(),
                "Requires a multi-extruder machine; nothing to do.",
            );
            return Ok(Outcome::Skipped("single-extruder machine".to_string()));
        }
        validate(cfg, printer.extruder_count)?;

        let spans = tool_usage_spans(buffer)?;

        // First-use macros: one insertion per configured, used tool. Applied
        // in descending position so earlier anchors stay valid.
        let mut first_use: Vec<(LinePos, &[String])> = cfg
            .tools
            .iter()
            .filter(|m| !m.first_use.is_empty())
            .filter_map(|m| spans.get(&m.tool).map(|s| (s.first, m.first_use.as_slice())))
            .collect();
        first_use.sort_by(|a, b| b.0.cmp(&a.0));
        for (pos, lines) in &first_use {
            if let Some(block) = buffer.block_mut(pos.block) {
                insert_lines(block, pos.line, Placement::After, lines);
            }
        }

        // Last-use macro: the true final tool use wins, whichever tool that
        // is; a shared final block is broken by ascending tool index.
        if let Some((tool, span)) = final_tool_use(&spans) {
            let macro_lines = cfg
                .tools
                .iter()
                .find(|m| m.tool == tool)
                .map(|m| m.last_use.as_slice())
                .unwrap_or(&[]);
            if !macro_lines.is_empty() {
                if let Some(block) = buffer.block_mut(span.last.block) {
                    let end = block.len();
                    insert_lines(block, end.saturating_sub(1), Placement::After, macro_lines);
                }
            }
        }

        log::debug!(
            "[{}] spans for {} tool(s), {} first-use insertion(s)",
            self.name(),
            spans.len(),
            first_use.len()
        );
        Ok(Outcome::Applied)
    }
}

fn validate(cfg: &ToolMacrosSettings, extruder_count: u8) -> Result<(), PassError> {
    for entry in &cfg.tools {
        if entry.tool >= extruder_count {
            return Err(PassError::Configuration(format!(
                "tool index {} beyond configured extruder count {}",
                entry.tool, extruder_count
            )));
        }
    }
    Ok(())
}

/// Scan every block between the start and end sequences for tool selections.
/// Computed on demand per pass; never cached across a mutation.
pub fn tool_usage_spans(buffer: &LayerBuffer) -> Result<BTreeMap<u8, ToolUsageSpan>, PassError> {
    let mut spans: BTreeMap<u8, ToolUsageSpan> = BTreeMap::new();
    let last = buffer.len().saturating_sub(1);

    for (block_idx, block) in buffer
        .blocks()
        .iter()
        .enumerate()
        .skip(1)
        .take(last.saturating_sub(1))
    {
        for (line_idx, line) in block.lines().iter().enumerate() {
            let tool = parser::tool_index(line)
                .map_err(|e| PassError::malformed(block_idx, line_idx, e))?;
            if let Some(tool) = tool {
                let pos = LinePos {
                    block: block_idx,
                    line: line_idx,
                };
                spans
                    .entry(tool)
                    .and_modify(|span| span.last = pos)
                    .or_insert(ToolUsageSpan {
                        first: pos,
                        last: pos,
                    });
            }
        }
    }

    Ok(spans)
}

/// The tool whose span ends latest, by block; ties on the final block go to
/// the smallest tool index. `None` when no tool is ever selected.
fn final_tool_use(spans: &BTreeMap<u8, ToolUsageSpan>) -> Option<(u8, ToolUsageSpan)> {
    spans
        .iter()
        .max_by(|(tool_a, a), (tool_b, b)| {
            a.last
                .block
                .cmp(&b.last.block)
                // BTreeMap iterates ascending; prefer the smaller tool on a
                // shared final block by ranking it higher.
                .then_with(|| tool_b.cmp(tool_a))
        })
        .map(|(tool, span)| (*tool, *span))
}
