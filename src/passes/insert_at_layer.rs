//! G-code insertion at layer changes.
//!
//! Inserts a configured macro immediately after `;LAYER:<n>` markers: either
//! once at a single layer, or repeatedly at a fixed layer frequency within a
//! range. Inserted text is upper-cased because some firmwares ignore
//! lower-case commands.

use crate::buffer::{AnchorPattern, LayerBuffer, Placement, insert_at_anchors};
use crate::error::PassError;
use crate::passes::{Outcome, Pass, PassContext};
use crate::settings::schema::{InsertAtLayerSettings, SettingsFile};

/// The insert-at-layer-change pass.
pub struct InsertAtLayer;

impl Pass for InsertAtLayer {
    fn name(&self) -> &'static str {
        "Insert At Layer Change"
    }

    fn enabled(&self, settings: &SettingsFile) -> bool {
        settings
            .passes
            .insert_at_layer
            .as_ref()
            .is_some_and(|c| c.enabled)
    }

    fn apply(
        &self,
        buffer: &mut LayerBuffer,
        ctx: &mut PassContext<'_>,
    ) -> Result<Outcome, PassError> {
        let cfg = ctx
            .settings
            .passes
            .insert_at_layer
            .as_ref()
            .ok_or_else(|| {
                PassError::Configuration("insert_at_layer section missing".to_string())
            })?;

        let lines = macro_lines(cfg)?;
        let last_block = buffer.len().saturating_sub(1);

        match cfg.frequency.step() {
            None => {
                let layer = cfg.layer.ok_or_else(|| {
                    PassError::Configuration(
                        "frequency 'once_only' needs a target layer".to_string(),
                    )
                })?;
                // Every matching marker gets the insertion; repeated layer
                // numbers from independently sequenced objects are distinct
                // anchors on purpose.
                insert_at_anchors(
                    buffer,
                    0,
                    last_block,
                    &AnchorPattern::Layer(layer - 1),
                    Placement::After,
                    &lines,
                    false,
                );
            }
            Some(step) => {
                if cfg.start_layer < 1 {
                    return Err(PassError::Configuration(
                        "start_layer is 1-based".to_string(),
                    ));
                }
                let targets = target_layers(buffer, cfg, step);
                for number in targets {
                    insert_at_anchors(
                        buffer,
                        0,
                        last_block,
                        &AnchorPattern::Layer(number),
                        Placement::After,
                        &lines,
                        false,
                    );
                }
            }
        }

        Ok(Outcome::Applied)
    }
}

/// The configured macro, split on commas and upper-cased.
fn macro_lines(cfg: &InsertAtLayerSettings) -> Result<Vec<String>, PassError> {
    let lines: Vec<String> = cfg
        .gcode
        .split(',')
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(PassError::Configuration(
            "no g-code configured to insert".to_string(),
        ));
    }
    Ok(lines)
}

/// The 0-based layer numbers the frequency selects, among layers that exist
/// in the buffer.
fn target_layers(buffer: &LayerBuffer, cfg: &InsertAtLayerSettings, step: i32) -> Vec<i32> {
    let first = cfg.start_layer - 1;
    let last = if cfg.end_layer == -1 {
        i32::MAX
    } else {
        cfg.end_layer - 1
    };

    buffer
        .blocks()
        .iter()
        .filter_map(|b| b.layer_number())
        .filter(|n| *n >= first && *n <= last)
        .filter(|n| (*n - first) % step == 0)
        .collect()
}
