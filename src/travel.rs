//! Travel-run detection.
//!
//! A travel run is a maximal sequence of consecutive travel-only lines
//! (motion carrying X or Y, extruding nothing). The detector decides whether
//! a run is long enough to warrant a height change around it, by greedy
//! lookahead from the candidate line: displacements between successive XY
//! positions are summed (a missing axis carries the previous value) until the
//! first non-travel line terminates the run. Runs are greedy and
//! non-overlapping; globally optimal partitioning is explicitly not
//! attempted.
//!
//! A run needs both an entry and an exit anchor, so a run still open when the
//! scanned range ends is rejected.

use crate::error::ValueError;
use crate::parser;

/// Detector states. `Committed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No travel-only line seen yet.
    Idle,
    /// Inside a run, distance accumulating.
    Accumulating,
    /// Run terminated and its length exceeds the threshold.
    Committed,
    /// Run terminated at or under the threshold, or ran out of lines.
    Rejected,
}

/// A committed run: `[start, end)` line indices into the scanned slice, where
/// `end` is the terminating non-travel line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelRun {
    pub start: usize,
    pub end: usize,
    pub length: f64,
}

/// Whether the line is a travel-only move: motion with X or Y and no E.
pub fn is_travel_only(line: &str) -> bool {
    parser::is_motion_command(line)
        && (parser::has_live_param(line, 'X') || parser::has_live_param(line, 'Y'))
        && !parser::has_live_param(line, 'E')
}

/// One run's state machine. Feed it lines in order; it transitions
/// Idle → Accumulating on the first travel-only line, stays in Accumulating
/// while they continue, and settles in Committed or Rejected on the first
/// non-travel line (or in Rejected when [`RunDetector::finish`] is called
/// with the run still open).
#[derive(Debug, Clone)]
pub struct RunDetector {
    threshold: f64,
    state: RunState,
    length: f64,
    x: f64,
    y: f64,
}

impl RunDetector {
    /// `x`/`y` is the machine position just before the candidate line.
    pub fn new(threshold: f64, x: f64, y: f64) -> Self {
        Self {
            threshold,
            state: RunState::Idle,
            length: 0.0,
            x,
            y,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Feed the next line, returning the new state.
    pub fn feed(&mut self, line: &str) -> Result<RunState, ValueError> {
        match self.state {
            RunState::Committed | RunState::Rejected => return Ok(self.state),
            RunState::Idle | RunState::Accumulating => {}
        }

        if is_travel_only(line) {
            let x = parser::param_value(line, 'X')?.unwrap_or(self.x);
            let y = parser::param_value(line, 'Y')?.unwrap_or(self.y);
            self.length += ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt();
            self.x = x;
            self.y = y;
            self.state = RunState::Accumulating;
        } else if self.state == RunState::Accumulating {
            self.state = if self.length > self.threshold {
                RunState::Committed
            } else {
                RunState::Rejected
            };
        }

        Ok(self.state)
    }

    /// End of the scanned range: an open run has no exit anchor and is
    /// rejected regardless of its length.
    pub fn finish(&mut self) -> RunState {
        if self.state == RunState::Accumulating || self.state == RunState::Idle {
            self.state = RunState::Rejected;
        }
        self.state
    }
}

/// Detect a travel run starting at `lines[from]`, with the machine at
/// `(x, y)` just before that line. Returns the committed run, or `None` when
/// the candidate is rejected (too short, not a travel line, or unterminated).
pub fn find_run(
    lines: &[String],
    from: usize,
    x: f64,
    y: f64,
    threshold: f64,
) -> Result<Option<TravelRun>, ValueError> {
    if from >= lines.len() || !is_travel_only(&lines[from]) {
        return Ok(None);
    }

    let mut detector = RunDetector::new(threshold, x, y);
    for (offset, line) in lines[from..].iter().enumerate() {
        match detector.feed(line)? {
            RunState::Committed => {
                return Ok(Some(TravelRun {
                    start: from,
                    end: from + offset,
                    length: detector.length(),
                }));
            }
            RunState::Rejected => return Ok(None),
            RunState::Idle | RunState::Accumulating => {}
        }
    }

    detector.finish();
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_travel_only() {
        assert!(is_travel_only("G0 X50 Y50"));
        assert!(is_travel_only("G1 X50"));
        assert!(is_travel_only("G0 F9000 Y10"));
        assert!(!is_travel_only("G1 X50 Y50 E2.5"));
        assert!(!is_travel_only("G0 Z0.8"));
        assert!(!is_travel_only("M204 S500"));
        assert!(!is_travel_only(";TYPE:SKIN"));
    }

    #[test]
    fn test_run_commits_above_threshold() {
        let block = lines(&["G0 X50 Y50", "G1 X55 Y55 E1"]);
        let run = find_run(&block, 0, 5.0, 5.0, 10.0).unwrap().unwrap();

        assert_eq!(run.start, 0);
        assert_eq!(run.end, 1);
        assert!((run.length - (45.0f64 * 45.0 * 2.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_run_at_exact_threshold_is_rejected() {
        let block = lines(&["G0 X10 Y0", "G1 X11 Y0 E1"]);
        assert!(find_run(&block, 0, 0.0, 0.0, 10.0).unwrap().is_none());
    }

    #[test]
    fn test_run_just_over_threshold_commits() {
        let block = lines(&["G0 X10.01 Y0", "G1 X11 Y0 E1"]);
        let run = find_run(&block, 0, 0.0, 0.0, 10.0).unwrap().unwrap();
        assert!((run.length - 10.01).abs() < 1e-9);
    }

    #[test]
    fn test_consecutive_travel_lines_accumulate() {
        let block = lines(&["G0 X3 Y4", "G0 X6 Y8", "G0 X9 Y12", "G1 E0.2"]);
        let run = find_run(&block, 0, 0.0, 0.0, 10.0).unwrap().unwrap();

        assert_eq!(run.start, 0);
        assert_eq!(run.end, 3);
        assert!((run.length - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_axis_carries_previous_value() {
        let block = lines(&["G0 X12", "G1 X13 E1"]);
        let run = find_run(&block, 0, 0.0, 7.0, 10.0).unwrap().unwrap();
        assert!((run.length - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_unterminated_run_is_rejected() {
        let block = lines(&["G0 X50 Y50", "G0 X90 Y90"]);
        assert!(find_run(&block, 0, 0.0, 0.0, 10.0).unwrap().is_none());
    }

    #[test]
    fn test_non_travel_candidate_is_idle() {
        let block = lines(&["G1 X50 Y50 E5", "G0 X90 Y90"]);
        assert!(find_run(&block, 0, 0.0, 0.0, 10.0).unwrap().is_none());
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut detector = RunDetector::new(10.0, 0.0, 0.0);
        assert_eq!(detector.state(), RunState::Idle);

        assert_eq!(detector.feed("G0 X20 Y0").unwrap(), RunState::Accumulating);
        assert_eq!(detector.feed("G0 X40 Y0").unwrap(), RunState::Accumulating);
        assert_eq!(detector.feed("G1 X41 E1").unwrap(), RunState::Committed);

        // Terminal: further input does not change the state
        assert_eq!(detector.feed("G0 X0 Y0").unwrap(), RunState::Committed);
    }

    #[test]
    fn test_short_run_settles_rejected() {
        let mut detector = RunDetector::new(10.0, 0.0, 0.0);
        detector.feed("G0 X1 Y1").unwrap();
        assert_eq!(detector.feed("G1 E0.1").unwrap(), RunState::Rejected);
    }

    #[test]
    fn test_finish_rejects_open_run() {
        let mut detector = RunDetector::new(1.0, 0.0, 0.0);
        detector.feed("G0 X100 Y0").unwrap();
        assert_eq!(detector.state(), RunState::Accumulating);
        assert_eq!(detector.finish(), RunState::Rejected);
    }

    #[test]
    fn test_malformed_travel_line_is_error() {
        let block = lines(&["G0 X1..5 Y0", "G1 E1"]);
        assert!(find_run(&block, 0, 0.0, 0.0, 10.0).is_err());
    }
}
