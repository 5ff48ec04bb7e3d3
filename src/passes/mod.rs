//! Transformation passes and the pipeline that runs them.
//!
//! Each pass is a pure function over the buffer: it reads the settings
//! snapshot, scans, and mutates in place. The runner makes every pass
//! transactional: a pass works on a scratch copy and the copy is committed
//! only on success, so a failing pass leaves the buffer exactly as it found
//! it and later passes still run.
//!
//! Idempotency: a pass that commits appends its sentinel line to the header
//! block, and is short-circuited on re-entry. The sentinel is written only
//! after the whole pass succeeded (fail-closed), so a failed attempt is
//! retried rather than silently skipped.

pub mod insert_at_layer;
pub mod search_replace;
pub mod tool_macros;
pub mod zhop_travel;

pub use insert_at_layer::InsertAtLayer;
pub use search_replace::SearchReplace;
pub use tool_macros::ToolMacros;
pub use zhop_travel::ZhopTravel;

use crate::buffer::LayerBuffer;
use crate::error::PassError;
use crate::notice::NoticeSink;
use crate::settings::SettingsFile;

/// What a successful pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The pass ran; the buffer may have been rewritten.
    Applied,
    /// A documented precondition was not met; the buffer is untouched and no
    /// sentinel is written, so a later run with fixed settings is not
    /// skipped.
    Skipped(String),
}

/// One transformation pass over the buffer.
pub trait Pass {
    /// Display name; also the sentinel identity.
    fn name(&self) -> &'static str;

    /// Whether the settings snapshot enables this pass at all.
    fn enabled(&self, settings: &SettingsFile) -> bool;

    /// Run the pass. The runner hands in a scratch buffer; on error the
    /// caller's buffer is left untouched.
    fn apply(
        &self,
        buffer: &mut LayerBuffer,
        ctx: &mut PassContext<'_>,
    ) -> Result<Outcome, PassError>;
}

/// Everything a pass may consult besides the buffer.
pub struct PassContext<'a> {
    pub settings: &'a SettingsFile,
    pub notices: &'a mut dyn NoticeSink,
}

/// The sentinel line a pass leaves in the header block.
pub fn sentinel_for(name: &str) -> String {
    format!(";  [{name}] plugin is enabled")
}

/// Whether the buffer already carries the pass's sentinel.
pub fn is_marked(buffer: &LayerBuffer, name: &str) -> bool {
    let sentinel = sentinel_for(name);
    buffer
        .header()
        .is_some_and(|h| h.lines().iter().any(|l| l.contains(&sentinel)))
}

/// Append the pass's sentinel to the header block.
pub fn mark(buffer: &mut LayerBuffer, name: &str) {
    let sentinel = sentinel_for(name);
    if let Some(header) = buffer.header_mut() {
        header.push(sentinel);
    }
}

/// How one pass of a pipeline run ended.
#[derive(Debug)]
pub enum PassStatus {
    Applied,
    AlreadyApplied,
    Disabled,
    Skipped(String),
    Failed(PassError),
}

/// Report for one pass of a pipeline run.
#[derive(Debug)]
pub struct PassReport {
    pub pass: &'static str,
    pub status: PassStatus,
}

/// All built-in passes, in pipeline order.
pub fn builtin_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(SearchReplace),
        Box::new(InsertAtLayer),
        Box::new(ZhopTravel),
        Box::new(ToolMacros),
    ]
}

/// Run the passes in order over the buffer.
///
/// Failures are local: a failing pass reports, notifies the host, and leaves
/// the buffer in its pre-pass state for the next pass.
pub fn run_passes(
    buffer: &mut LayerBuffer,
    passes: &[Box<dyn Pass>],
    settings: &SettingsFile,
    notices: &mut dyn NoticeSink,
) -> Vec<PassReport> {
    let mut reports = Vec::with_capacity(passes.len());

    for pass in passes {
        let name = pass.name();

        if is_marked(buffer, name) {
            log::debug!("[{name}] sentinel present, skipping");
            reports.push(PassReport {
                pass: name,
                status: PassStatus::AlreadyApplied,
            });
            continue;
        }

        if !pass.enabled(settings) {
            log::debug!("[{name}] disabled");
            reports.push(PassReport {
                pass: name,
                status: PassStatus::Disabled,
            });
            continue;
        }

        let mut scratch = buffer.clone();
        let mut ctx = PassContext {
            settings,
            notices: &mut *notices,
        };

        let status = match pass.apply(&mut scratch, &mut ctx) {
            Ok(Outcome::Applied) => {
                mark(&mut scratch, name);
                *buffer = scratch;
                log::info!("[{name}] applied");
                PassStatus::Applied
            }
            Ok(Outcome::Skipped(reason)) => {
                log::info!("[{name}] skipped: {reason}");
                PassStatus::Skipped(reason)
            }
            Err(error) => {
                log::error!("[{name}] failed: {error}");
                notices.notify(name, &format!("Did not run: {error}"));
                PassStatus::Failed(error)
            }
        };

        reports.push(PassReport { pass: name, status });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Block;
    use crate::notice::RecordingSink;
    use crate::settings::schema::PrintSequence;

    fn test_settings() -> SettingsFile {
        crate::settings::from_toml_str(
            r#"
            [printer]
            extruder_count = 2
            layer_height = 0.2
            initial_layer_height = 0.3
            nozzle_diameter = 0.4
            retraction_enabled = true
            speed_z_hop = 5.0
            print_sequence = "all_at_once"
            "#,
        )
        .unwrap()
    }

    fn test_buffer() -> LayerBuffer {
        LayerBuffer::new(vec![
            Block::from_text(";header"),
            Block::from_text("G28"),
            Block::from_text(";LAYER:0\nG1 X1 Y1 E1"),
            Block::default(),
        ])
    }

    struct CountingPass {
        fail: bool,
    }

    impl Pass for CountingPass {
        fn name(&self) -> &'static str {
            "Counting"
        }

        fn enabled(&self, _settings: &SettingsFile) -> bool {
            true
        }

        fn apply(
            &self,
            buffer: &mut LayerBuffer,
            _ctx: &mut PassContext<'_>,
        ) -> Result<Outcome, PassError> {
            buffer.block_mut(2).unwrap().push("M117 TOUCHED");
            if self.fail {
                return Err(PassError::Configuration("boom".to_string()));
            }
            Ok(Outcome::Applied)
        }
    }

    #[test]
    fn test_sentinel_round_trip() {
        let mut buffer = test_buffer();
        assert!(!is_marked(&buffer, "Counting"));

        mark(&mut buffer, "Counting");
        assert!(is_marked(&buffer, "Counting"));
        assert_eq!(
            buffer.header().unwrap().lines().last().unwrap(),
            ";  [Counting] plugin is enabled"
        );
    }

    #[test]
    fn test_second_run_is_short_circuited() {
        let settings = test_settings();
        let mut sink = RecordingSink::default();
        let passes: Vec<Box<dyn Pass>> = vec![Box::new(CountingPass { fail: false })];

        let mut buffer = test_buffer();
        run_passes(&mut buffer, &passes, &settings, &mut sink);
        let after_first = buffer.clone();

        let reports = run_passes(&mut buffer, &passes, &settings, &mut sink);
        assert!(matches!(reports[0].status, PassStatus::AlreadyApplied));
        assert_eq!(buffer, after_first);
    }

    #[test]
    fn test_failed_pass_leaves_buffer_unchanged_and_unmarked() {
        let settings = test_settings();
        let mut sink = RecordingSink::default();
        let passes: Vec<Box<dyn Pass>> = vec![Box::new(CountingPass { fail: true })];

        let mut buffer = test_buffer();
        let pristine = buffer.clone();
        let reports = run_passes(&mut buffer, &passes, &settings, &mut sink);

        assert!(matches!(reports[0].status, PassStatus::Failed(_)));
        assert_eq!(buffer, pristine);
        assert!(!is_marked(&buffer, "Counting"));
        assert_eq!(sink.notices.len(), 1);
    }

    #[test]
    fn test_failing_pass_does_not_stop_later_passes() {
        let settings = test_settings();
        let mut sink = RecordingSink::default();
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(CountingPass { fail: true }),
            Box::new(CountingPass { fail: false }),
        ];

        let mut buffer = test_buffer();
        let reports = run_passes(&mut buffer, &passes, &settings, &mut sink);

        assert!(matches!(reports[0].status, PassStatus::Failed(_)));
        assert!(matches!(reports[1].status, PassStatus::Applied));
        assert!(is_marked(&buffer, "Counting"));
    }

    #[test]
    fn test_print_sequence_available_to_passes() {
        let settings = test_settings();
        assert_eq!(settings.printer.print_sequence, PrintSequence::AllAtOnce);
    }
}
