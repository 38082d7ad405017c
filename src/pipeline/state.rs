//! Render state machine and progress reporting.
//!
//! [`RenderState`] names the phase a run is in.  [`ProgressReporter`] is the
//! run's write end of a `tokio::sync::watch` channel carrying [`Progress`]
//! snapshots; hosts keep a `watch::Receiver` and only ever look at the most
//! recent value.

use tokio::sync::watch;

// ---------------------------------------------------------------------------
// RenderState
// ---------------------------------------------------------------------------

/// States of one render run.
///
/// ```text
/// Idle ──blank input──────────────────────────────────────────▶ Failed
/// Idle ─▶ Normalizing ─▶ Segmenting ──no sentences────────────▶ Failed
///                         └─▶ Loading (vocab, voice, session) ─▶ Failed
///                              └─▶ per sentence i:
///                                   Phonemizing{i} ─▶ Synthesizing{i} ─▶ Encoding{i}
///                                   (any error / cancellation) ─────▶ Failed
///                              └─▶ Stitching ─▶ Completed | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    /// Submitted, nothing done yet.
    #[default]
    Idle,
    Normalizing,
    Segmenting,
    /// Acquiring vocabulary, voice style and inference session.
    Loading,
    Phonemizing { index: usize },
    Synthesizing { index: usize },
    Encoding { index: usize },
    Stitching,
    Completed,
    Failed,
}

impl RenderState {
    /// Returns `true` while the run is doing work.
    ///
    /// ```
    /// use offline_tts::pipeline::RenderState;
    ///
    /// assert!(!RenderState::Idle.is_busy());
    /// assert!(RenderState::Synthesizing { index: 0 }.is_busy());
    /// assert!(RenderState::Stitching.is_busy());
    /// assert!(!RenderState::Completed.is_busy());
    /// assert!(!RenderState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            RenderState::Idle | RenderState::Completed | RenderState::Failed
        )
    }

    /// `Completed` and `Failed` are the only terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderState::Completed | RenderState::Failed)
    }

    /// Index of the sentence being processed, if inside the sentence loop.
    pub fn sentence_index(&self) -> Option<usize> {
        match *self {
            RenderState::Phonemizing { index }
            | RenderState::Synthesizing { index }
            | RenderState::Encoding { index } => Some(index),
            _ => None,
        }
    }

    /// A short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RenderState::Idle => "Idle",
            RenderState::Normalizing => "Normalizing",
            RenderState::Segmenting => "Segmenting",
            RenderState::Loading => "Loading",
            RenderState::Phonemizing { .. } => "Phonemizing",
            RenderState::Synthesizing { .. } => "Synthesizing",
            RenderState::Encoding { .. } => "Encoding",
            RenderState::Stitching => "Stitching",
            RenderState::Completed => "Done",
            RenderState::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Percentage reported when stitching starts.
pub const STITCH_PERCENT: u8 = 95;

/// Highest percentage reported inside the sentence loop.
const LOOP_CEILING: u8 = STITCH_PERCENT - 1;

/// Percentage reported when sentence `index` of `count` starts:
/// `min(floor(index * 100 / count), 94)`.
///
/// ```
/// use offline_tts::pipeline::sentence_percent;
///
/// assert_eq!(sentence_percent(0, 3), 0);
/// assert_eq!(sentence_percent(1, 3), 33);
/// assert_eq!(sentence_percent(2, 3), 66);
/// assert_eq!(sentence_percent(99, 100), 94);
/// ```
pub fn sentence_percent(index: usize, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let pct = index.saturating_mul(100) / count;
    pct.min(usize::from(LOOP_CEILING)) as u8
}

/// One progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 0–100.
    pub percent: u8,
    /// Human-readable status line.
    pub status: String,
    pub state: RenderState,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            percent: 0,
            status: RenderState::Idle.label().to_owned(),
            state: RenderState::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

/// Publishes [`Progress`] for one run.
///
/// Sending never blocks and never fails, with or without receivers.  The
/// percentage never decreases: a lower value than the current one is
/// raised to the current one.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<Progress>,
}

impl ProgressReporter {
    /// A reporter and the first receiver for it.
    pub fn new() -> (Self, watch::Receiver<Progress>) {
        let (tx, rx) = watch::channel(Progress::default());
        (Self { tx }, rx)
    }

    /// A reporter nobody listens to (yet).
    pub fn detached() -> Self {
        Self::new().0
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn latest(&self) -> Progress {
        self.tx.borrow().clone()
    }

    /// Publish a new percentage, status and state.
    pub fn report(&self, percent: u8, status: impl Into<String>, state: RenderState) {
        let status = status.into();
        self.tx.send_modify(|p| {
            p.percent = p.percent.max(percent.min(100));
            p.status = status;
            p.state = state;
        });
    }

    /// Move to `state` without touching percentage or status.
    pub fn enter(&self, state: RenderState) {
        self.tx.send_modify(|p| p.state = state);
    }

    /// Move to `Failed`, keeping the last percentage.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|p| {
            p.status = message;
            p.state = RenderState::Failed;
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- RenderState ---

    #[test]
    fn idle_is_default_and_not_busy() {
        assert_eq!(RenderState::default(), RenderState::Idle);
        assert!(!RenderState::Idle.is_busy());
        assert!(!RenderState::Idle.is_terminal());
    }

    #[test]
    fn loop_states_are_busy() {
        for state in [
            RenderState::Normalizing,
            RenderState::Segmenting,
            RenderState::Loading,
            RenderState::Phonemizing { index: 2 },
            RenderState::Synthesizing { index: 2 },
            RenderState::Encoding { index: 2 },
            RenderState::Stitching,
        ] {
            assert!(state.is_busy(), "{state:?} should be busy");
            assert!(!state.is_terminal(), "{state:?} should not be terminal");
        }
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(RenderState::Completed.is_terminal());
        assert!(RenderState::Failed.is_terminal());
    }

    #[test]
    fn sentence_index_only_inside_loop() {
        assert_eq!(RenderState::Encoding { index: 4 }.sentence_index(), Some(4));
        assert_eq!(RenderState::Stitching.sentence_index(), None);
    }

    #[test]
    fn labels() {
        assert_eq!(RenderState::Completed.label(), "Done");
        assert_eq!(RenderState::Synthesizing { index: 0 }.label(), "Synthesizing");
    }

    // ---- sentence_percent ---

    #[test]
    fn loop_percent_stays_below_stitch_percent() {
        for count in 1..=300 {
            let mut last = 0;
            for index in 0..count {
                let pct = sentence_percent(index, count);
                assert!(pct < STITCH_PERCENT);
                assert!(pct >= last);
                last = pct;
            }
        }
    }

    #[test]
    fn zero_sentences_is_zero_percent() {
        assert_eq!(sentence_percent(0, 0), 0);
    }

    // ---- ProgressReporter ---

    #[test]
    fn reporter_publishes_latest() {
        let (reporter, rx) = ProgressReporter::new();
        reporter.report(0, "Initializing...", RenderState::Loading);
        reporter.report(50, "Processing sentence 2/2", RenderState::Phonemizing { index: 1 });

        let p = rx.borrow().clone();
        assert_eq!(p.percent, 50);
        assert_eq!(p.status, "Processing sentence 2/2");
        assert_eq!(p.state, RenderState::Phonemizing { index: 1 });
    }

    #[test]
    fn percent_never_goes_backwards() {
        let reporter = ProgressReporter::detached();
        reporter.report(60, "a", RenderState::Loading);
        reporter.report(10, "b", RenderState::Loading);
        assert_eq!(reporter.latest().percent, 60);
        assert_eq!(reporter.latest().status, "b");
    }

    #[test]
    fn percent_is_capped_at_100() {
        let reporter = ProgressReporter::detached();
        reporter.report(250, "x", RenderState::Completed);
        assert_eq!(reporter.latest().percent, 100);
    }

    #[test]
    fn enter_keeps_percent_and_status() {
        let reporter = ProgressReporter::detached();
        reporter.report(33, "Processing sentence 2/3", RenderState::Phonemizing { index: 1 });
        reporter.enter(RenderState::Synthesizing { index: 1 });

        let p = reporter.latest();
        assert_eq!(p.percent, 33);
        assert_eq!(p.status, "Processing sentence 2/3");
        assert_eq!(p.state, RenderState::Synthesizing { index: 1 });
    }

    #[test]
    fn fail_keeps_percent() {
        let reporter = ProgressReporter::detached();
        reporter.report(STITCH_PERCENT, "Stitching audio...", RenderState::Stitching);
        reporter.fail("stitching failed: boom");

        let p = reporter.latest();
        assert_eq!(p.percent, STITCH_PERCENT);
        assert_eq!(p.state, RenderState::Failed);
        assert!(p.status.contains("boom"));
    }

    #[test]
    fn late_subscriber_sees_current_value() {
        let reporter = ProgressReporter::detached();
        reporter.report(40, "x", RenderState::Encoding { index: 0 });
        let rx = reporter.subscribe();
        assert_eq!(rx.borrow().percent, 40);
    }
}
