//! Z-hop insertion for long travel moves.
//!
//! Scans a layer range, finds travel runs longer than the configured minimum
//! distance, and wraps each run in a hop-up/hop-down pair so the nozzle
//! clears the print while traveling. Works whether or not retraction is
//! enabled; by default it stands down when the slicer is already emitting its
//! own retraction hops, which can be overridden per profile.

use crate::buffer::{LayerBuffer, with_aligned_comment};
use crate::error::PassError;
use crate::passes::{Outcome, Pass, PassContext};
use crate::settings::schema::{PrintSequence, SettingsFile, ZhopTravelSettings};
use crate::tracker::{self, MachineState};
use crate::travel;

/// The Z-hop-on-travel pass.
pub struct ZhopTravel;

impl Pass for ZhopTravel {
    fn name(&self) -> &'static str {
        "ZHop On Travel"
    }

    fn enabled(&self, settings: &SettingsFile) -> bool {
        settings
            .passes
            .zhop_travel
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
            .zhop_travel
            .as_ref()
            .ok_or_else(|| PassError::Configuration("zhop_travel section missing".to_string()))?;

        if printer.print_sequence == PrintSequence::OneAtATime {
            ctx.notices.notify(
                self.name(),
                "Not compatible with the one-at-a-time print sequence.",
            );
            return Ok(Outcome::Skipped(
                "one-at-a-time print sequence".to_string(),
            ));
        }
        if printer.retraction_hop_enabled && !cfg.hop_when_firmware_hops {
            ctx.notices.notify(
                self.name(),
                "The slicer already emits retraction hops; set hop_when_firmware_hops to add travel hops anyway.",
            );
            return Ok(Outcome::Skipped(
                "slicer already emits retraction hops".to_string(),
            ));
        }
        if buffer.len() < 4 {
            return Ok(Outcome::Skipped("buffer has no print layers".to_string()));
        }

        validate(cfg)?;

        let start_block = buffer.find_layer(cfg.start_layer - 1).ok_or_else(|| {
            PassError::Configuration(format!("start layer {} not in the buffer", cfg.start_layer))
        })?;
        let end_block = if cfg.end_layer == -1 {
            buffer.last_layer_block()
        } else {
            buffer.find_layer(cfg.end_layer - 1).ok_or_else(|| {
                PassError::Configuration(format!("end layer {} not in the buffer", cfg.end_layer))
            })?
        };
        if end_block < start_block {
            return Err(PassError::Configuration(format!(
                "end layer {} precedes start layer {}",
                cfg.end_layer, cfg.start_layer
            )));
        }

        // The initial Z is never explicit in the G-code; seed it, then track
        // everything up to the first processed block.
        let mut state = MachineState::seeded(printer.initial_layer_height);
        tracker::scan_blocks(buffer, 0, start_block, &mut state)?;

        let feed = printer.speed_z_hop * 60.0;
        let mut hops = 0usize;

        for block_idx in start_block..=end_block {
            let mut insertions: Vec<(usize, String)> = Vec::new();

            {
                let lines = buffer.block(block_idx).map(|b| b.lines()).unwrap_or(&[]);
                let mut i = 0;
                while i < lines.len() {
                    let line = &lines[i];

                    if travel::is_travel_only(line) {
                        let (x, y) = state.position();
                        let run = travel::find_run(lines, i, x, y, cfg.min_travel_distance)
                            .map_err(|e| PassError::malformed(block_idx, i, e))?;

                        if let Some(run) = run {
                            let lifted = state.z.unwrap_or(printer.initial_layer_height)
                                + cfg.hop_height;
                            insertions.push((
                                run.start,
                                hop_line(feed, lifted),
                            ));

                            // Advance through the run so the restore height
                            // reflects any Z the travel itself carried.
                            for j in run.start..run.end {
                                state
                                    .observe_line(&lines[j])
                                    .map_err(|e| PassError::malformed(block_idx, j, e))?;
                            }
                            let restore = state.z.unwrap_or(printer.initial_layer_height);
                            insertions.push((run.end, hop_line(feed, restore)));

                            hops += 1;
                            i = run.end;
                            continue;
                        }
                    }

                    state
                        .observe_line(line)
                        .map_err(|e| PassError::malformed(block_idx, i, e))?;
                    i += 1;
                }
            }

            if let Some(block) = buffer.block_mut(block_idx) {
                for (index, text) in insertions.iter().rev() {
                    block.insert(*index, text.clone());
                }
            }
        }

        log::debug!(
            "[{}] inserted {hops} hop pairs across blocks {start_block}..={end_block}",
            self.name()
        );
        Ok(Outcome::Applied)
    }
}

fn validate(cfg: &ZhopTravelSettings) -> Result<(), PassError> {
    if cfg.hop_height <= 0.0 {
        return Err(PassError::Configuration(
            "hop_height must be positive".to_string(),
        ));
    }
    if cfg.min_travel_distance <= 0.0 {
        return Err(PassError::Configuration(
            "min_travel_distance must be positive".to_string(),
        ));
    }
    if cfg.start_layer < 1 {
        return Err(PassError::Configuration(
            "start_layer is 1-based".to_string(),
        ));
    }
    if cfg.end_layer != -1 && cfg.end_layer < cfg.start_layer {
        return Err(PassError::Configuration(
            "end_layer must be -1 or >= start_layer".to_string(),
        ));
    }
    Ok(())
}

fn hop_line(feed: f64, z: f64) -> String {
    with_aligned_comment(&format!("G0 F{} Z{}", fmt_num(feed), fmt_num(z)), "travel hop")
}

/// Format a number the way the slicer prints coordinates: at most two
/// decimals, no trailing zeros.
fn fmt_num(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(0.8), "0.8");
        assert_eq!(fmt_num(300.0), "300");
        assert_eq!(fmt_num(0.30000000000000004), "0.3");
        assert_eq!(fmt_num(1.25), "1.25");
    }

    #[test]
    fn test_hop_line_shape() {
        let line = hop_line(300.0, 0.8);
        assert!(line.starts_with("G0 F300 Z0.8"));
        assert!(line.ends_with("; travel hop"));
    }
}
