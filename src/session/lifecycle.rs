//! The request lifecycle — a single-step-per-cycle state machine.
//!
//! [`RequestLifecycle`] owns no state of its own; it advances the shared
//! [`ConversationState`] one transition per call to [`advance`]:
//!
//! ```text
//! 1. Promote   pending_query + Idle      → User message in history, stage = Answering
//! 2. Answer    Answering + pending_query → Answerer call, Assistant message in history
//! 3. Audio     pending_audio + Idle      → decode → gate → transcribe → pending_query
//! 4. NoWork    nothing matched           → no-op (a redundant re-entry is fine)
//! ```
//!
//! Only the **first** matching rule fires per cycle — `advance` returns after
//! it. That makes the ordering guarantees structural: the history is never
//! mutated twice in one cycle, and a query is never promoted and answered in
//! the same cycle, so an assistant turn cannot precede the user turn it
//! answers.
//!
//! The state lock is released around every remote call. Results are folded
//! back in only if the state's generation still matches the snapshot taken
//! before the call; a mismatch means the session was cleared mid-flight and
//! the result is discarded.
//!
//! [`advance`]: RequestLifecycle::advance
//! [`ConversationState`]: crate::session::ConversationState

use std::sync::Arc;

use thiserror::Error;

use crate::audio::{decode_wav, fingerprint, resample_to_16k, QualityGate};
use crate::rag::Answerer;
use crate::session::message::Message;
use crate::session::state::{SharedState, Stage};
use crate::stt::{TranscribeError, Transcriber};

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// A user intent relayed from the view.
///
/// Intents only queue or toggle things; they never advance the pipeline
/// themselves. Advancement happens in [`RequestLifecycle::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// A typed question.
    SubmitText(String),
    /// A recorded audio blob (encoded WAV bytes).
    SubmitAudio(Vec<u8>),
    /// Process the blob parked while auto-process was off.
    ConfirmAudio,
    /// Toggle immediate processing of new recordings.
    SetAutoProcess(bool),
    /// Reset the conversation.
    Clear,
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Cycle-scoped, user-visible failures.
///
/// These render inline for the current cycle and are never appended to the
/// history. Every variant halts the audio pipeline for the blob in question;
/// the conversation itself is untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The quality gate rejected the clip as too short or too quiet.
    #[error("It sounded too short or too quiet. Try closer to the mic.")]
    AudioRejected {
        /// Measured clip length in seconds.
        duration_secs: f32,
        /// Measured RMS amplitude.
        rms: f32,
        /// Measured peak amplitude.
        peak: f32,
    },

    /// The blob could not be decoded as WAV audio.
    #[error("Could not read that recording: {0}")]
    UndecodableAudio(String),

    /// The transcription backend ran but produced nothing usable.
    #[error("Transcription came back empty.")]
    EmptyTranscript,

    /// The transcription backend could not be reached at all.
    #[error("Transcription is unavailable: {0}")]
    TranscriptionUnavailable(String),
}

impl From<TranscribeError> for SessionError {
    fn from(e: TranscribeError) -> Self {
        match e {
            TranscribeError::EmptyTranscript => SessionError::EmptyTranscript,
            TranscribeError::BackendUnavailable(msg) => {
                SessionError::TranscriptionUnavailable(msg)
            }
            TranscribeError::ModelNotFound(path) => SessionError::TranscriptionUnavailable(
                format!("transcription model not found at {path}"),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// CycleReport
// ---------------------------------------------------------------------------

/// Which transition fired during an [`advance`](RequestLifecycle::advance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// Rule 1 — the pending query became a `User` history entry.
    PromotedQuery,
    /// Rule 2 — an assistant turn was appended.
    Answered,
    /// Rule 3 — the pending blob was consumed (transcribed or rejected).
    ProcessedAudio,
    /// A remote result arrived after a clear and was dropped.
    Discarded,
    /// Nothing matched; the cycle was a no-op.
    NoWork,
}

/// What one advancement cycle did, for the host loop and the view.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// The transition that fired.
    pub step: CycleStep,
    /// Hint that state changed materially and the view should redraw.
    /// Advisory only — the lifecycle never depends on a redraw happening.
    pub rerender: bool,
    /// Cycle-scoped error to surface inline, if any.
    pub error: Option<SessionError>,
    /// Status captions to surface inline (audio stats, transcript preview,
    /// search debug). Never appended to the history.
    pub notes: Vec<String>,
}

impl CycleReport {
    fn no_work() -> Self {
        Self {
            step: CycleStep::NoWork,
            rerender: false,
            error: None,
            notes: Vec::new(),
        }
    }

    fn fired(step: CycleStep) -> Self {
        Self {
            step,
            rerender: true,
            error: None,
            notes: Vec::new(),
        }
    }

    fn discarded() -> Self {
        Self {
            step: CycleStep::Discarded,
            rerender: false,
            error: None,
            notes: Vec::new(),
        }
    }

    fn failed(step: CycleStep, error: SessionError) -> Self {
        Self {
            step,
            rerender: true,
            error: Some(error),
            notes: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestLifecycle
// ---------------------------------------------------------------------------

/// Drives one conversation: intake of user intents plus the one-step-per-
/// cycle advancement of pending work.
///
/// Create with [`RequestLifecycle::new`], then have the host loop call
/// [`apply_intent`](Self::apply_intent) as intents arrive and
/// [`advance`](Self::advance) once per refresh cycle.
pub struct RequestLifecycle {
    gate: QualityGate,
    transcriber: Arc<dyn Transcriber>,
    answerer: Arc<dyn Answerer>,
}

impl RequestLifecycle {
    /// Create a lifecycle over the given gate and adapter seams.
    pub fn new(
        gate: QualityGate,
        transcriber: Arc<dyn Transcriber>,
        answerer: Arc<dyn Answerer>,
    ) -> Self {
        Self {
            gate,
            transcriber,
            answerer,
        }
    }

    // -----------------------------------------------------------------------
    // Intake
    // -----------------------------------------------------------------------

    /// Fold a user intent into the state. Returns `true` when the state
    /// changed (the host should schedule a cycle), `false` when the intent
    /// was ignored.
    ///
    /// Intake is deliberately conservative:
    /// - text is accepted only while idle with no audio pending;
    /// - audio is dropped when its fingerprint matches the last accepted
    ///   blob, so a re-delivered recording is never processed twice.
    pub fn apply_intent(&self, state: &SharedState, intent: Intent) -> bool {
        let mut st = state.lock().unwrap();

        match intent {
            Intent::SubmitText(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return false;
                }
                if st.stage != Stage::Idle || st.pending_audio.is_some() {
                    log::debug!(
                        "session: text ignored while busy (stage={}, audio_pending={})",
                        st.stage.label(),
                        st.pending_audio.is_some()
                    );
                    return false;
                }
                st.pending_query = Some(text.to_string());
                true
            }

            Intent::SubmitAudio(blob) => {
                let fp = fingerprint(&blob);
                if st.last_audio_fingerprint.as_deref() == Some(fp.as_str()) {
                    log::debug!("session: duplicate audio blob ignored ({fp:.12}…)");
                    return false;
                }
                st.last_audio_fingerprint = Some(fp);
                if st.auto_process {
                    st.pending_audio = Some(blob);
                } else {
                    st.held_audio = Some(blob);
                }
                true
            }

            Intent::ConfirmAudio => match st.held_audio.take() {
                Some(blob) => {
                    st.pending_audio = Some(blob);
                    true
                }
                None => false,
            },

            Intent::SetAutoProcess(enabled) => {
                let changed = st.auto_process != enabled;
                st.auto_process = enabled;
                changed
            }

            Intent::Clear => {
                st.clear();
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // Advancement
    // -----------------------------------------------------------------------

    /// Advance the state by at most one transition.
    ///
    /// Evaluates the rules in fixed priority order and fires only the first
    /// match; see the module docs for the ordering argument. Re-entering
    /// with nothing pending is a harmless no-op.
    pub async fn advance(&self, state: &SharedState) -> CycleReport {
        // ── Rule 1: promote the pending query into the history ───────────
        {
            let mut st = state.lock().unwrap();
            if st.stage == Stage::Idle {
                if let Some(query) = st.pending_query.clone() {
                    st.history.push(Message::user(query));
                    st.stage = Stage::Answering;
                    log::debug!("session: promoted query ({} turns)", st.history.len());
                    return CycleReport::fired(CycleStep::PromotedQuery);
                }
            }
        }

        // ── Rule 2: answer the promoted query ────────────────────────────
        let answering = {
            let st = state.lock().unwrap();
            if st.stage == Stage::Answering {
                st.pending_query.clone().map(|q| (q, st.generation))
            } else {
                None
            }
        };

        if let Some((query, generation)) = answering {
            // Remote call with the lock released.
            let answer = self.answerer.answer(&query).await;

            let mut st = state.lock().unwrap();
            if st.generation != generation {
                log::info!("session: discarding answer from a cleared conversation");
                return CycleReport::discarded();
            }

            if answer.failed {
                log::warn!("session: answer step reported a failure: {}", answer.text);
            }
            st.history.push(Message::assistant(answer.text));
            st.pending_query = None;
            st.stage = Stage::Idle;

            let mut report = CycleReport::fired(CycleStep::Answered);
            report.notes.push(format!("debug: {}", answer.search_debug));
            return report;
        }

        // ── Rule 3: process the pending audio blob ───────────────────────
        let processing = {
            let st = state.lock().unwrap();
            if st.stage == Stage::Idle {
                st.pending_audio.clone().map(|blob| (blob, st.generation))
            } else {
                None
            }
        };

        if let Some((blob, generation)) = processing {
            return self.process_audio(state, &blob, generation).await;
        }

        CycleReport::no_work()
    }

    /// Rule 3 body: decode → gate → transcribe → queue the transcript.
    ///
    /// Every exit path clears `pending_audio` (if the generation still
    /// matches) — a blob is consumed by its processing attempt, successful
    /// or not.
    async fn process_audio(
        &self,
        state: &SharedState,
        blob: &[u8],
        generation: u64,
    ) -> CycleReport {
        // Decode and gate are pure and cheap; no lock needed.
        let decoded = match decode_wav(blob) {
            Ok(d) => d,
            Err(e) => {
                return self.finish_audio(
                    state,
                    generation,
                    CycleReport::failed(
                        CycleStep::ProcessedAudio,
                        SessionError::UndecodableAudio(e.to_string()),
                    ),
                );
            }
        };

        let report = self.gate.evaluate(&decoded.samples, decoded.sample_rate);
        if !report.accepted {
            log::info!(
                "session: audio rejected ({:.2}s, rms {:.4}, peak {:.4})",
                report.duration_secs,
                report.rms,
                report.peak
            );
            return self.finish_audio(
                state,
                generation,
                CycleReport::failed(
                    CycleStep::ProcessedAudio,
                    SessionError::AudioRejected {
                        duration_secs: report.duration_secs,
                        rms: report.rms,
                        peak: report.peak,
                    },
                ),
            );
        }

        // Remote / blocking call with the lock released.
        let samples = resample_to_16k(&decoded.samples, decoded.sample_rate);
        let transcript = match self.transcriber.transcribe(&samples).await {
            Ok(text) if text.trim().is_empty() => Err(SessionError::EmptyTranscript),
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => Err(SessionError::from(e)),
        };

        match transcript {
            Ok(text) => {
                let mut st = state.lock().unwrap();
                if st.generation != generation {
                    log::info!("session: discarding transcript from a cleared conversation");
                    return CycleReport::discarded();
                }
                st.pending_audio = None;
                // Promotion happens next cycle via rule 1, never this one.
                st.pending_query = Some(text.clone());

                let mut cycle = CycleReport::fired(CycleStep::ProcessedAudio);
                cycle.notes.push(report.caption());
                cycle
                    .notes
                    .push(format!("Transcript: \u{201c}{}\u{201d}", transcript_preview(&text)));
                cycle
            }
            Err(e) => self.finish_audio(
                state,
                generation,
                CycleReport::failed(CycleStep::ProcessedAudio, e),
            ),
        }
    }

    /// Consume the blob on a failure path, unless a clear beat us to it.
    fn finish_audio(
        &self,
        state: &SharedState,
        generation: u64,
        report: CycleReport,
    ) -> CycleReport {
        let mut st = state.lock().unwrap();
        if st.generation != generation {
            return CycleReport::discarded();
        }
        st.pending_audio = None;
        report
    }
}

/// Transcript caption shown next to a processed clip, truncated to 110
/// characters.
fn transcript_preview(text: &str) -> String {
    const MAX_CHARS: usize = 110;
    let mut preview: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        preview.push('…');
    }
    preview
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::audio::encode_wav_16k;
    use crate::rag::{Answer, MockAnswerer, NO_CONTENT_FALLBACK};
    use crate::session::message::Role;
    use crate::session::state::new_shared_state;
    use crate::stt::MockTranscriber;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lifecycle(
        transcriber: Arc<dyn Transcriber>,
        answerer: Arc<dyn Answerer>,
    ) -> RequestLifecycle {
        RequestLifecycle::new(QualityGate::default(), transcriber, answerer)
    }

    fn text_lifecycle(answerer: Arc<dyn Answerer>) -> RequestLifecycle {
        lifecycle(Arc::new(MockTranscriber::ok("unused")), answerer)
    }

    /// 2 s of audible signal @ 16 kHz, encoded as a WAV blob.
    fn audible_blob() -> Vec<u8> {
        encode_wav_16k(&vec![0.05_f32; 32_000]).unwrap()
    }

    /// 0.2 s of silence @ 16 kHz — fails both gate thresholds.
    fn short_silent_blob() -> Vec<u8> {
        encode_wav_16k(&vec![0.0_f32; 3_200]).unwrap()
    }

    // -----------------------------------------------------------------------
    // Intake
    // -----------------------------------------------------------------------

    #[test]
    fn text_intake_trims_and_queues() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(lc.apply_intent(&state, Intent::SubmitText("  hello  ".into())));
        assert_eq!(
            state.lock().unwrap().pending_query.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn blank_text_is_ignored() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(!lc.apply_intent(&state, Intent::SubmitText("   ".into())));
        assert!(state.lock().unwrap().pending_query.is_none());
    }

    #[test]
    fn text_is_rejected_while_answering() {
        let state = new_shared_state();
        state.lock().unwrap().stage = Stage::Answering;
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(!lc.apply_intent(&state, Intent::SubmitText("too soon".into())));
        assert!(state.lock().unwrap().pending_query.is_none());
    }

    #[test]
    fn text_is_rejected_while_audio_pending() {
        let state = new_shared_state();
        state.lock().unwrap().pending_audio = Some(vec![0]);
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(!lc.apply_intent(&state, Intent::SubmitText("wait your turn".into())));
        assert!(state.lock().unwrap().pending_query.is_none());
    }

    #[test]
    fn new_audio_is_queued_and_fingerprinted() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(lc.apply_intent(&state, Intent::SubmitAudio(audible_blob())));
        let st = state.lock().unwrap();
        assert!(st.pending_audio.is_some());
        assert!(st.last_audio_fingerprint.is_some());
    }

    #[test]
    fn duplicate_audio_is_ignored() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));
        let blob = audible_blob();

        assert!(lc.apply_intent(&state, Intent::SubmitAudio(blob.clone())));
        // Simulate the host re-delivering the same blob on the next refresh.
        assert!(!lc.apply_intent(&state, Intent::SubmitAudio(blob)));
    }

    /// Identical blobs must cost exactly one transcription call, even when
    /// re-delivered after the first was fully processed.
    #[tokio::test]
    async fn duplicate_audio_never_reaches_the_transcriber() {
        let state = new_shared_state();
        let transcriber = Arc::new(MockTranscriber::ok("what is the return policy"));
        let lc = lifecycle(
            Arc::clone(&transcriber) as Arc<dyn Transcriber>,
            Arc::new(MockAnswerer::ok("30 days")),
        );
        let blob = audible_blob();

        assert!(lc.apply_intent(&state, Intent::SubmitAudio(blob.clone())));
        let report = lc.advance(&state).await;
        assert_eq!(report.step, CycleStep::ProcessedAudio);
        assert_eq!(transcriber.calls(), 1);

        // Re-delivery: not queued, not transcribed.
        assert!(!lc.apply_intent(&state, Intent::SubmitAudio(blob)));
        assert!(state.lock().unwrap().pending_audio.is_none());
        assert_eq!(transcriber.calls(), 1);
    }

    #[test]
    fn auto_process_off_parks_the_blob_until_confirmed() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(lc.apply_intent(&state, Intent::SetAutoProcess(false)));
        assert!(lc.apply_intent(&state, Intent::SubmitAudio(audible_blob())));
        {
            let st = state.lock().unwrap();
            assert!(st.pending_audio.is_none());
            assert!(st.held_audio.is_some());
        }

        assert!(lc.apply_intent(&state, Intent::ConfirmAudio));
        {
            let st = state.lock().unwrap();
            assert!(st.pending_audio.is_some());
            assert!(st.held_audio.is_none());
        }

        // A second confirm has nothing to move.
        assert!(!lc.apply_intent(&state, Intent::ConfirmAudio));
    }

    #[test]
    fn set_auto_process_reports_change_only() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        assert!(!lc.apply_intent(&state, Intent::SetAutoProcess(true))); // already on
        assert!(lc.apply_intent(&state, Intent::SetAutoProcess(false)));
    }

    #[test]
    fn clear_intent_resets_the_conversation() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));
        lc.apply_intent(&state, Intent::SubmitText("q".into()));

        assert!(lc.apply_intent(&state, Intent::Clear));
        let st = state.lock().unwrap();
        assert!(st.history.is_empty());
        assert!(st.pending_query.is_none());
    }

    // -----------------------------------------------------------------------
    // Advancement — text path
    // -----------------------------------------------------------------------

    /// Promotion and answering must take two separate cycles, with the user
    /// message in the history strictly before its answer exists anywhere.
    #[tokio::test]
    async fn promotion_and_answer_are_separate_cycles() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("the answer")));
        lc.apply_intent(&state, Intent::SubmitText("a question".into()));

        let first = lc.advance(&state).await;
        assert_eq!(first.step, CycleStep::PromotedQuery);
        assert!(first.rerender);
        {
            let st = state.lock().unwrap();
            assert_eq!(st.history.len(), 1);
            assert_eq!(st.history[0].role, Role::User);
            assert_eq!(st.stage, Stage::Answering);
            // The query stays pending for the answer cycle.
            assert_eq!(st.pending_query.as_deref(), Some("a question"));
        }

        let second = lc.advance(&state).await;
        assert_eq!(second.step, CycleStep::Answered);
        let st = state.lock().unwrap();
        assert_eq!(st.history.len(), 2);
        assert_eq!(st.history[1].role, Role::Assistant);
        assert_eq!(st.history[1].content, "the answer");
        assert_eq!(st.stage, Stage::Idle);
        assert!(st.pending_query.is_none());
    }

    #[tokio::test]
    async fn answered_report_carries_the_search_debug_note() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("hi")));
        lc.apply_intent(&state, Intent::SubmitText("q".into()));

        lc.advance(&state).await;
        let report = lc.advance(&state).await;
        assert!(report.notes.iter().any(|n| n.starts_with("debug: role=")));
    }

    /// End-to-end scenario: "What is the return policy?" answered from a
    /// retrieved chunk.
    #[tokio::test]
    async fn text_query_end_to_end() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok(
            "You can return items within 30 days.",
        )));

        lc.apply_intent(&state, Intent::SubmitText("What is the return policy?".into()));
        lc.advance(&state).await;
        lc.advance(&state).await;

        let st = state.lock().unwrap();
        assert_eq!(
            st.history,
            vec![
                Message::user("What is the return policy?"),
                Message::assistant("You can return items within 30 days."),
            ]
        );
    }

    /// No relevant content is not an error: exactly one assistant turn with
    /// the fixed fallback text.
    #[tokio::test]
    async fn no_content_appends_the_fallback_answer() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::no_content()));
        lc.apply_intent(&state, Intent::SubmitText("anything?".into()));

        lc.advance(&state).await;
        let report = lc.advance(&state).await;
        assert_eq!(report.step, CycleStep::Answered);
        assert!(report.error.is_none());

        let st = state.lock().unwrap();
        assert_eq!(st.history.len(), 2);
        assert_eq!(st.history[1].content, NO_CONTENT_FALLBACK);
    }

    /// A failed remote step still produces an assistant turn — the failure
    /// text is the answer, framed as one.
    #[tokio::test]
    async fn failed_answer_is_still_appended() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::failing("Search failed: boom")));
        lc.apply_intent(&state, Intent::SubmitText("q".into()));

        lc.advance(&state).await;
        lc.advance(&state).await;

        let st = state.lock().unwrap();
        assert_eq!(st.history.len(), 2);
        assert_eq!(st.history[1].content, "Search failed: boom");
        assert_eq!(st.stage, Stage::Idle);
    }

    #[tokio::test]
    async fn redundant_reentry_is_a_noop() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(MockAnswerer::ok("a")));

        let report = lc.advance(&state).await;
        assert_eq!(report.step, CycleStep::NoWork);
        assert!(!report.rerender);
        assert!(state.lock().unwrap().history.is_empty());
    }

    // -----------------------------------------------------------------------
    // Advancement — audio path
    // -----------------------------------------------------------------------

    /// End-to-end scenario: a short silent clip is rejected by the gate and
    /// nothing downstream runs.
    #[tokio::test]
    async fn short_silent_audio_is_rejected_by_the_gate() {
        let state = new_shared_state();
        let transcriber = Arc::new(MockTranscriber::ok("should never run"));
        let lc = lifecycle(
            Arc::clone(&transcriber) as Arc<dyn Transcriber>,
            Arc::new(MockAnswerer::ok("a")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(short_silent_blob()));
        let report = lc.advance(&state).await;

        assert_eq!(report.step, CycleStep::ProcessedAudio);
        assert!(matches!(
            report.error,
            Some(SessionError::AudioRejected { .. })
        ));
        assert_eq!(transcriber.calls(), 0);

        let st = state.lock().unwrap();
        assert!(st.history.is_empty());
        assert!(st.pending_audio.is_none());
        assert!(st.pending_query.is_none());
    }

    /// End-to-end scenario: an audible clip whose transcription comes back
    /// empty — error shown, no query created, history unchanged.
    #[tokio::test]
    async fn empty_transcript_halts_the_audio_pipeline() {
        let state = new_shared_state();
        let lc = lifecycle(
            Arc::new(MockTranscriber::err(TranscribeError::EmptyTranscript)),
            Arc::new(MockAnswerer::ok("a")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(audible_blob()));
        let report = lc.advance(&state).await;

        assert_eq!(report.error, Some(SessionError::EmptyTranscript));
        let st = state.lock().unwrap();
        assert!(st.history.is_empty());
        assert!(st.pending_audio.is_none());
        assert!(st.pending_query.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_and_clears_the_blob() {
        let state = new_shared_state();
        let lc = lifecycle(
            Arc::new(MockTranscriber::err(TranscribeError::BackendUnavailable(
                "connection refused".into(),
            ))),
            Arc::new(MockAnswerer::ok("a")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(audible_blob()));
        let report = lc.advance(&state).await;

        assert!(matches!(
            report.error,
            Some(SessionError::TranscriptionUnavailable(_))
        ));
        assert!(state.lock().unwrap().pending_audio.is_none());
    }

    #[tokio::test]
    async fn undecodable_blob_surfaces_and_clears() {
        let state = new_shared_state();
        let transcriber = Arc::new(MockTranscriber::ok("never"));
        let lc = lifecycle(
            Arc::clone(&transcriber) as Arc<dyn Transcriber>,
            Arc::new(MockAnswerer::ok("a")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(b"not a wav file".to_vec()));
        let report = lc.advance(&state).await;

        assert!(matches!(
            report.error,
            Some(SessionError::UndecodableAudio(_))
        ));
        assert_eq!(transcriber.calls(), 0);
        assert!(state.lock().unwrap().pending_audio.is_none());
    }

    /// A successful transcription queues the text for the *next* cycle; the
    /// history is untouched until promotion.
    #[tokio::test]
    async fn transcription_queues_a_query_for_the_next_cycle() {
        let state = new_shared_state();
        let lc = lifecycle(
            Arc::new(MockTranscriber::ok("what is the return policy")),
            Arc::new(MockAnswerer::ok("30 days")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(audible_blob()));
        let report = lc.advance(&state).await;

        assert_eq!(report.step, CycleStep::ProcessedAudio);
        assert!(report.error.is_none());
        assert!(report.notes.iter().any(|n| n.starts_with("Audio ")));
        assert!(report.notes.iter().any(|n| n.starts_with("Transcript: ")));
        {
            let st = state.lock().unwrap();
            assert!(st.history.is_empty());
            assert_eq!(
                st.pending_query.as_deref(),
                Some("what is the return policy")
            );
        }

        // Next two cycles: promote, then answer.
        lc.advance(&state).await;
        lc.advance(&state).await;
        let st = state.lock().unwrap();
        assert_eq!(st.history.len(), 2);
        assert_eq!(st.history[0].content, "what is the return policy");
        assert_eq!(st.history[1].content, "30 days");
    }

    // -----------------------------------------------------------------------
    // Stale-generation discard
    // -----------------------------------------------------------------------

    /// Answerer double that clears the conversation while its call is in
    /// flight, simulating a Clear intent racing a slow remote answer.
    struct ClearingAnswerer {
        state: SharedState,
    }

    #[async_trait]
    impl Answerer for ClearingAnswerer {
        async fn answer(&self, _query: &str) -> Answer {
            self.state.lock().unwrap().clear();
            Answer {
                text: "stale answer".into(),
                failed: false,
                search_debug: "role=TEST db=TEST schema=TEST service=TEST".into(),
            }
        }
    }

    /// A clear during an in-flight answer must drop the result on the floor
    /// instead of resurrecting the cleared conversation.
    #[tokio::test]
    async fn answer_arriving_after_clear_is_discarded() {
        let state = new_shared_state();
        let lc = text_lifecycle(Arc::new(ClearingAnswerer {
            state: Arc::clone(&state),
        }));

        lc.apply_intent(&state, Intent::SubmitText("q".into()));
        lc.advance(&state).await; // promote
        let report = lc.advance(&state).await; // answer call; cleared mid-flight

        assert_eq!(report.step, CycleStep::Discarded);
        let st = state.lock().unwrap();
        assert!(st.history.is_empty());
        assert_eq!(st.stage, Stage::Idle);
    }

    /// Same race on the audio path: the transcript of a cleared session is
    /// never queued as a query.
    struct ClearingTranscriber {
        state: SharedState,
    }

    #[async_trait]
    impl Transcriber for ClearingTranscriber {
        async fn transcribe(&self, _samples: &[f32]) -> Result<String, TranscribeError> {
            self.state.lock().unwrap().clear();
            Ok("stale transcript".into())
        }
    }

    #[tokio::test]
    async fn transcript_arriving_after_clear_is_discarded() {
        let state = new_shared_state();
        let lc = lifecycle(
            Arc::new(ClearingTranscriber {
                state: Arc::clone(&state),
            }),
            Arc::new(MockAnswerer::ok("a")),
        );

        lc.apply_intent(&state, Intent::SubmitAudio(audible_blob()));
        let report = lc.advance(&state).await;

        assert_eq!(report.step, CycleStep::Discarded);
        assert!(state.lock().unwrap().pending_query.is_none());
    }

    // -----------------------------------------------------------------------
    // transcript_preview
    // -----------------------------------------------------------------------

    #[test]
    fn preview_passes_short_text_through() {
        assert_eq!(transcript_preview("short"), "short");
    }

    #[test]
    fn preview_truncates_long_text_with_ellipsis() {
        let long = "x".repeat(200);
        let preview = transcript_preview(&long);
        assert_eq!(preview.chars().count(), 111);
        assert!(preview.ends_with('…'));
    }
}
