//! Search and replace over the buffer.
//!
//! Literal or regex replacement across a block range. The header block is
//! never touched (the idempotency sentinels live there), and by default the
//! start and end sequences are left alone too.

use regex::Regex;

use crate::buffer::LayerBuffer;
use crate::error::PassError;
use crate::passes::{Outcome, Pass, PassContext};
use crate::settings::schema::{SearchReplaceSettings, SettingsFile};

/// The search-and-replace pass.
pub struct SearchReplace;

impl Pass for SearchReplace {
    fn name(&self) -> &'static str {
        "Search And Replace"
    }

    fn enabled(&self, settings: &SettingsFile) -> bool {
        settings
            .passes
            .search_replace
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
            .search_replace
            .as_ref()
            .ok_or_else(|| {
                PassError::Configuration("search_replace section missing".to_string())
            })?;

        if cfg.search.is_empty() {
            return Err(PassError::Configuration(
                "search text must not be empty".to_string(),
            ));
        }

        // One code path: literal searches are escaped, then both go through
        // the regex engine.
        let pattern = if cfg.use_regex {
            cfg.search.clone()
        } else {
            regex::escape(&cfg.search)
        };
        let regex = Regex::new(&pattern)
            .map_err(|e| PassError::Configuration(format!("invalid search pattern: {e}")))?;

        let (from, to) = block_range(buffer, cfg);
        let mut replaced = 0usize;

        for index in from..=to {
            let Some(block) = buffer.block_mut(index) else {
                continue;
            };
            let text = block.text();
            if !regex.is_match(&text) {
                continue;
            }

            let new_text = if cfg.use_regex {
                if cfg.first_instance_only {
                    regex.replace(&text, cfg.replace.as_str())
                } else {
                    regex.replace_all(&text, cfg.replace.as_str())
                }
            } else {
                // Literal mode: `$` in the replacement must stay literal.
                if cfg.first_instance_only {
                    regex.replace(&text, regex::NoExpand(&cfg.replace))
                } else {
                    regex.replace_all(&text, regex::NoExpand(&cfg.replace))
                }
            };

            block.set_text(&new_text);
            replaced += 1;
            if cfg.first_instance_only {
                break;
            }
        }

        log::debug!("[{}] rewrote {replaced} block(s)", self.name());
        Ok(Outcome::Applied)
    }
}

/// The inclusive block range the replacement may touch. Block 0 is always
/// out of bounds for this pass.
fn block_range(buffer: &LayerBuffer, cfg: &SearchReplaceSettings) -> (usize, usize) {
    let from = if cfg.ignore_start { 2 } else { 1 };
    let last = buffer.len().saturating_sub(1);
    let to = if cfg.ignore_end {
        last.saturating_sub(1)
    } else {
        last
    };
    (from, to)
}
