//! Turn-taking state machine implementation.
//!
//! One [`TurnTakingMachine`] is created per running assistant session.
//! Its operations are synchronous and non-suspending; the internal atomics
//! keep reads lock-free, but the ordering contract is that all calls are
//! funneled through a single logical owner (an event loop, a dedicated
//! task, or an external mutex).

use parking_lot::RwLock as SyncRwLock;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::speech::{PlaybackHandle, SpeechSynthesis};
use crate::core::utils::get_current_time_ms;

use super::config::TurnTakingConfig;
use super::state::{ConversationState, TurnId};

/// Callback invoked synchronously on every state transition.
pub type StateCallback = Arc<dyn Fn(ConversationState) + Send + Sync>;

/// Identifier returned by [`TurnTakingMachine::subscribe`], used to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event consumed by [`TurnTakingMachine::handle_event`].
///
/// Convenience for callers that pipe events through a channel instead of
/// calling the individual handler methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// Voice activity detected: the user may have started speaking.
    SpeechStart,
    /// Voice activity ended: silence after speech.
    SpeechEnd,
    /// System playback of a synthesized reply began.
    PlaybackStart(TurnId),
    /// System playback finished naturally.
    PlaybackEnd,
}

/// Turn-taking state machine for one assistant session.
pub struct TurnTakingMachine {
    config: TurnTakingConfig,

    /// Current conversational state, stored as the enum discriminant for
    /// lock-free reads.
    state: AtomicU8,

    /// Echo suppression deadline, ms since epoch. Zero when no guard is
    /// active.
    echo_guard_until_ms: AtomicU64,

    /// Id of the turn whose playback is (or was most recently) active.
    current_turn_id: SyncRwLock<Option<TurnId>>,

    /// Single slot for the currently playing clip. Registering a new
    /// handle replaces the previous one; clips are never queued.
    playing_audio: SyncRwLock<Option<Arc<dyn PlaybackHandle>>>,

    /// Synthesis capability halted alongside the clip slot on stop.
    synthesis: Option<Arc<dyn SpeechSynthesis>>,

    /// Subscribers notified in registration order on each transition.
    subscribers: SyncRwLock<Vec<(SubscriptionId, StateCallback)>>,
    next_subscription_id: AtomicU64,
}

impl TurnTakingMachine {
    /// Create a new machine with no synthesis capability attached.
    ///
    /// `stop_speech` will only act on the registered playback handle.
    pub fn new(config: TurnTakingConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(ConversationState::Idle as u8),
            echo_guard_until_ms: AtomicU64::new(0),
            current_turn_id: SyncRwLock::new(None),
            playing_audio: SyncRwLock::new(None),
            synthesis: None,
            subscribers: SyncRwLock::new(Vec::new()),
            next_subscription_id: AtomicU64::new(0),
        }
    }

    /// Create a new machine that also halts `synthesis` when speech is
    /// stopped. Both the registered clip and the synthesis fallback are
    /// attempted on every stop, since either may be the active source.
    pub fn with_synthesis(config: TurnTakingConfig, synthesis: Arc<dyn SpeechSynthesis>) -> Self {
        Self {
            synthesis: Some(synthesis),
            ..Self::new(config)
        }
    }

    /// Current conversational state.
    pub fn state(&self) -> ConversationState {
        ConversationState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Id of the turn whose playback is (or was most recently) active.
    pub fn current_turn_id(&self) -> Option<TurnId> {
        self.current_turn_id.read().clone()
    }

    /// Whether the machine is administratively enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Time left inside the echo guard window, if one is active.
    pub fn echo_guard_remaining(&self) -> Option<Duration> {
        let until = self.echo_guard_until_ms.load(Ordering::Acquire);
        let now = get_current_time_ms();
        if now < until {
            Some(Duration::from_millis(until - now))
        } else {
            None
        }
    }

    /// Handle the start of detected voice activity.
    ///
    /// Returns whether the sound was accepted as genuine user speech.
    /// Inside the echo guard window the sound is treated as the system's
    /// own voice leaking into the microphone; during `Processing` new
    /// speech is ignored rather than queued; during `SystemSpeaking` it is
    /// a barge-in that stops playback.
    pub fn on_voice_activity_start(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let guard_until = self.echo_guard_until_ms.load(Ordering::Acquire);
        let now = get_current_time_ms();
        if now < guard_until {
            debug!(
                remaining_ms = guard_until - now,
                "Voice activity suppressed inside echo guard window"
            );
            return false;
        }

        match self.state() {
            ConversationState::Processing => {
                debug!("Voice activity ignored while a response is being computed");
                false
            }
            ConversationState::SystemSpeaking => {
                info!("Barge-in: user spoke over system playback, stopping speech");
                self.halt_playback();
                self.transition(ConversationState::UserSpeaking);
                true
            }
            ConversationState::Idle | ConversationState::UserSpeaking => {
                self.transition(ConversationState::UserSpeaking);
                true
            }
        }
    }

    /// Handle the end of detected voice activity.
    ///
    /// Silence after speech signals "user finished, now think": from
    /// `UserSpeaking` the machine moves to `Processing`. No-op in any
    /// other state.
    pub fn on_voice_activity_end(&self) {
        if !self.config.enabled {
            return;
        }

        if self.state() == ConversationState::UserSpeaking {
            debug!("User finished speaking, computing response");
            self.transition(ConversationState::Processing);
        }
    }

    /// Record that playback of a synthesized reply has started.
    ///
    /// Arms the echo guard and moves to `SystemSpeaking`. Valid from any
    /// state: the common path is `Processing -> SystemSpeaking`, but an
    /// unprompted proactive message enters here straight from `Idle`.
    pub fn on_speech_playback_start(&self, turn_id: impl Into<TurnId>) {
        if !self.config.enabled {
            return;
        }

        let turn_id = turn_id.into();
        let guard_until = get_current_time_ms() + self.config.echo_guard.as_millis() as u64;

        debug!(
            turn_id = %turn_id,
            echo_guard_ms = self.config.echo_guard.as_millis() as u64,
            "System playback started"
        );

        *self.current_turn_id.write() = Some(turn_id);
        self.echo_guard_until_ms
            .store(guard_until, Ordering::Release);
        self.transition(ConversationState::SystemSpeaking);
    }

    /// Record that playback finished naturally with no more text queued.
    ///
    /// Only completes a `SystemSpeaking` turn; a no-op otherwise, so a
    /// late completion event cannot clobber a state that already moved on
    /// (e.g. due to barge-in).
    pub fn on_speech_playback_end(&self) {
        if !self.config.enabled {
            return;
        }

        if self.state() == ConversationState::SystemSpeaking {
            debug!("System playback finished");
            self.transition(ConversationState::Idle);
        } else {
            debug!(
                state = self.state().as_str(),
                "Playback end ignored, state already moved on"
            );
        }
    }

    /// Halt whatever audio is currently registered as playing.
    ///
    /// Both the registered clip and the synthesis capability are
    /// attempted; either may be absent or already stopped, which is an
    /// idempotent no-op. Lower-level audio errors are logged, never
    /// propagated. If the machine was `SystemSpeaking` it returns to
    /// `Idle`.
    pub fn stop_speech(&self) {
        if !self.config.enabled {
            return;
        }

        self.halt_playback();
        if self.state() == ConversationState::SystemSpeaking {
            self.transition(ConversationState::Idle);
        }
    }

    /// Record the currently active audio handle so `stop_speech` has
    /// something concrete to halt. Replaces (and implicitly forgets) any
    /// previous handle; clips are never queued.
    pub fn register_playing_audio(&self, handle: Arc<dyn PlaybackHandle>) {
        if !self.config.enabled {
            return;
        }

        let previous = self.playing_audio.write().replace(handle);
        if previous.is_some() {
            debug!("Replaced previously registered audio handle");
        }
    }

    /// Dispatch a [`VoiceEvent`] to the matching handler.
    ///
    /// Returns the acceptance result for `SpeechStart`, `true` for every
    /// other event.
    pub fn handle_event(&self, event: VoiceEvent) -> bool {
        match event {
            VoiceEvent::SpeechStart => self.on_voice_activity_start(),
            VoiceEvent::SpeechEnd => {
                self.on_voice_activity_end();
                true
            }
            VoiceEvent::PlaybackStart(turn_id) => {
                self.on_speech_playback_start(turn_id);
                true
            }
            VoiceEvent::PlaybackEnd => {
                self.on_speech_playback_end();
                true
            }
        }
    }

    /// Register a callback notified synchronously on every state
    /// transition (not every event), in registration order.
    pub fn subscribe(&self, callback: StateCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, callback));
        id
    }

    /// Remove a previously registered callback. Returns whether it was
    /// still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Reset to `Idle`, clearing the echo guard, turn id, and registered
    /// audio handle. For session teardown; subscribers stay registered.
    pub fn reset(&self) {
        self.echo_guard_until_ms.store(0, Ordering::Release);
        *self.current_turn_id.write() = None;
        *self.playing_audio.write() = None;
        self.transition(ConversationState::Idle);
        debug!("Turn-taking machine reset");
    }

    /// Stop both audio paths without touching conversational state.
    fn halt_playback(&self) {
        let handle = self.playing_audio.read().clone();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop() {
                warn!(error = %e, "Failed to stop playing audio clip");
            }
        }

        if let Some(synthesis) = &self.synthesis {
            if let Err(e) = synthesis.cancel() {
                warn!(error = %e, "Failed to cancel speech synthesis");
            }
        }
    }

    /// Move to `next`, notifying subscribers only when the state actually
    /// changed.
    fn transition(&self, next: ConversationState) {
        let previous = ConversationState::from_u8(self.state.swap(next as u8, Ordering::AcqRel));
        if previous == next {
            return;
        }

        debug!(
            from = previous.as_str(),
            to = next.as_str(),
            "Conversation state transition"
        );

        // Clone out of the lock so a callback may re-enter the machine
        // (e.g. to subscribe or read state) without deadlocking.
        let subscribers = self.subscribers.read().clone();
        for (_, callback) in &subscribers {
            callback(next);
        }
    }

    /// Drive this machine from a channel of [`VoiceEvent`]s on a dedicated
    /// task.
    ///
    /// The spawned task becomes the single serializing owner of all event
    /// handling: producers (VAD, playback hooks) push into the channel
    /// instead of calling the machine concurrently. The channel is bounded;
    /// producers that outrun the consumer should drop frames rather than
    /// block real-time paths. The task ends when every sender is dropped.
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<VoiceEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let machine = Arc::clone(self);
        tokio::spawn(async move {
            debug!("Voice event loop started");
            while let Some(event) = events.recv().await {
                machine.handle_event(event);
            }
            debug!("Voice event channel closed, event loop exiting");
        })
    }

    /// Force the echo guard deadline for deterministic timing tests.
    #[cfg(test)]
    pub(crate) fn set_echo_guard_until_ms(&self, until_ms: u64) {
        self.echo_guard_until_ms.store(until_ms, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Stub synthesis capability counting `cancel` calls.
    struct StubSynthesis {
        cancel_count: AtomicUsize,
        fail_cancel: bool,
    }

    impl StubSynthesis {
        fn new() -> Self {
            Self {
                cancel_count: AtomicUsize::new(0),
                fail_cancel: false,
            }
        }

        fn failing() -> Self {
            Self {
                cancel_count: AtomicUsize::new(0),
                fail_cancel: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl SpeechSynthesis for StubSynthesis {
        async fn speak(&self, _text: &str) -> crate::core::speech::SpeechResult<()> {
            Ok(())
        }

        fn cancel(&self) -> crate::core::speech::SpeechResult<()> {
            self.cancel_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_cancel {
                Err(crate::core::speech::SpeechError::Synthesis(
                    "forced cancel failure".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }

    /// Stub playback handle counting `stop` calls.
    struct StubClip {
        stop_count: AtomicUsize,
    }

    impl StubClip {
        fn new() -> Self {
            Self {
                stop_count: AtomicUsize::new(0),
            }
        }
    }

    impl PlaybackHandle for StubClip {
        fn stop(&self) -> crate::core::speech::SpeechResult<()> {
            self.stop_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn machine() -> TurnTakingMachine {
        TurnTakingMachine::new(TurnTakingConfig::default())
    }

    /// Drive the machine into `Processing` via the normal path.
    fn drive_to_processing(machine: &TurnTakingMachine) {
        assert!(machine.on_voice_activity_start());
        machine.on_voice_activity_end();
        assert_eq!(machine.state(), ConversationState::Processing);
    }

    #[test]
    fn test_initial_state_is_idle() {
        let machine = machine();
        assert_eq!(machine.state(), ConversationState::Idle);
        assert!(machine.current_turn_id().is_none());
        assert!(machine.echo_guard_remaining().is_none());
    }

    #[test]
    fn test_vad_start_from_idle_accepted() {
        let machine = machine();
        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
    }

    #[test]
    fn test_vad_start_while_already_speaking_accepted() {
        let machine = machine();
        assert!(machine.on_voice_activity_start());
        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
    }

    #[test]
    fn test_vad_end_moves_to_processing() {
        let machine = machine();
        drive_to_processing(&machine);
    }

    #[test]
    fn test_vad_end_noop_outside_user_speaking() {
        let machine = machine();
        machine.on_voice_activity_end();
        assert_eq!(machine.state(), ConversationState::Idle);

        machine.on_speech_playback_start(TurnId::from("t1"));
        machine.set_echo_guard_until_ms(0);
        machine.on_voice_activity_end();
        assert_eq!(machine.state(), ConversationState::SystemSpeaking);
    }

    #[test]
    fn test_processing_not_interruptible_by_voice() {
        let machine = machine();
        drive_to_processing(&machine);

        // Regardless of echo guard timing, voice activity never leaves
        // Processing.
        machine.set_echo_guard_until_ms(0);
        assert!(!machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::Processing);

        machine.set_echo_guard_until_ms(get_current_time_ms() + 10_000);
        assert!(!machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::Processing);
    }

    #[test]
    fn test_playback_start_records_turn_and_arms_guard() {
        let machine = machine();
        machine.on_speech_playback_start(TurnId::from("turn-9"));

        assert_eq!(machine.state(), ConversationState::SystemSpeaking);
        assert_eq!(machine.current_turn_id().unwrap().as_str(), "turn-9");
        let remaining = machine.echo_guard_remaining().unwrap();
        assert!(remaining <= Duration::from_millis(500));
        assert!(remaining > Duration::from_millis(300));
    }

    #[test]
    fn test_echo_guard_suppresses_early_voice_activity() {
        let machine = machine();
        machine.on_speech_playback_start(TurnId::new());

        // Inside the guard window: suppressed, state unchanged.
        assert!(!machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::SystemSpeaking);
    }

    #[test]
    fn test_voice_after_guard_expiry_is_barge_in() {
        let synthesis = Arc::new(StubSynthesis::new());
        let machine = TurnTakingMachine::with_synthesis(
            TurnTakingConfig::default(),
            Arc::clone(&synthesis) as Arc<dyn SpeechSynthesis>,
        );
        let clip = Arc::new(StubClip::new());
        machine.register_playing_audio(Arc::clone(&clip) as Arc<dyn PlaybackHandle>);

        machine.on_speech_playback_start(TurnId::new());
        // Simulate the guard window having elapsed.
        machine.set_echo_guard_until_ms(get_current_time_ms());

        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
        // Barge-in stopped both audio paths.
        assert_eq!(clip.stop_count.load(Ordering::SeqCst), 1);
        assert_eq!(synthesis.cancel_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_echo_guard_with_real_clock() {
        let machine = TurnTakingMachine::new(
            TurnTakingConfig::default().with_echo_guard(Duration::from_millis(40)),
        );
        machine.on_speech_playback_start(TurnId::new());

        assert!(!machine.on_voice_activity_start());

        std::thread::sleep(Duration::from_millis(60));
        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
    }

    #[test]
    fn test_playback_end_completes_turn() {
        let machine = machine();
        machine.on_speech_playback_start(TurnId::new());
        machine.on_speech_playback_end();
        assert_eq!(machine.state(), ConversationState::Idle);
    }

    #[test]
    fn test_playback_end_does_not_clobber_barge_in() {
        let machine = machine();
        machine.on_speech_playback_start(TurnId::new());
        machine.set_echo_guard_until_ms(0);
        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);

        // The interrupted clip reports completion afterwards; the state
        // already moved on and must stay put.
        machine.on_speech_playback_end();
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
    }

    #[test]
    fn test_stop_speech_with_nothing_playing_is_noop() {
        let machine = machine();
        machine.stop_speech();
        assert_eq!(machine.state(), ConversationState::Idle);
    }

    #[test]
    fn test_stop_speech_halts_both_paths_and_idles() {
        let synthesis = Arc::new(StubSynthesis::new());
        let machine = TurnTakingMachine::with_synthesis(
            TurnTakingConfig::default(),
            Arc::clone(&synthesis) as Arc<dyn SpeechSynthesis>,
        );
        let clip = Arc::new(StubClip::new());
        machine.register_playing_audio(Arc::clone(&clip) as Arc<dyn PlaybackHandle>);
        machine.on_speech_playback_start(TurnId::new());

        machine.stop_speech();
        assert_eq!(machine.state(), ConversationState::Idle);
        assert_eq!(clip.stop_count.load(Ordering::SeqCst), 1);
        assert_eq!(synthesis.cancel_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_speech_swallows_audio_errors() {
        let synthesis = Arc::new(StubSynthesis::failing());
        let machine = TurnTakingMachine::with_synthesis(
            TurnTakingConfig::default(),
            Arc::clone(&synthesis) as Arc<dyn SpeechSynthesis>,
        );
        machine.on_speech_playback_start(TurnId::new());

        // The failing cancel is logged, never propagated.
        machine.stop_speech();
        assert_eq!(machine.state(), ConversationState::Idle);
        assert_eq!(synthesis.cancel_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_replaces_previous_handle() {
        let machine = machine();
        let first = Arc::new(StubClip::new());
        let second = Arc::new(StubClip::new());

        machine.register_playing_audio(Arc::clone(&first) as Arc<dyn PlaybackHandle>);
        machine.register_playing_audio(Arc::clone(&second) as Arc<dyn PlaybackHandle>);

        machine.stop_speech();
        // Only the current slot is stopped; the replaced clip is forgotten.
        assert_eq!(first.stop_count.load(Ordering::SeqCst), 0);
        assert_eq!(second.stop_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribers_notified_in_registration_order_on_transitions_only() {
        let machine = machine();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let log = Arc::clone(&log);
            machine.subscribe(Arc::new(move |state| {
                log.lock().unwrap().push(format!("{tag}:{state}"));
            }));
        }

        machine.on_voice_activity_start();
        // Repeated start is an event but not a transition.
        machine.on_voice_activity_start();
        machine.on_voice_activity_end();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "a:user_speaking".to_string(),
                "b:user_speaking".to_string(),
                "a:processing".to_string(),
                "b:processing".to_string(),
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let machine = machine();
        let count = Arc::new(AtomicUsize::new(0));

        let id = {
            let count = Arc::clone(&count);
            machine.subscribe(Arc::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }))
        };

        machine.on_voice_activity_start();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(machine.unsubscribe(id));
        assert!(!machine.unsubscribe(id));

        machine.on_voice_activity_end();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_machine_is_pass_through() {
        let machine = TurnTakingMachine::new(TurnTakingConfig::default().with_enabled(false));
        let notified = Arc::new(AtomicUsize::new(0));
        {
            let notified = Arc::clone(&notified);
            machine.subscribe(Arc::new(move |_| {
                notified.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // Permissive default: voice activity is always accepted.
        assert!(machine.on_voice_activity_start());
        machine.on_voice_activity_end();
        machine.on_speech_playback_start(TurnId::new());
        machine.on_speech_playback_end();
        machine.stop_speech();

        assert_eq!(machine.state(), ConversationState::Idle);
        assert!(machine.current_turn_id().is_none());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handle_event_dispatch_matches_direct_calls() {
        let machine = machine();

        assert!(machine.handle_event(VoiceEvent::SpeechStart));
        assert_eq!(machine.state(), ConversationState::UserSpeaking);

        assert!(machine.handle_event(VoiceEvent::SpeechEnd));
        assert_eq!(machine.state(), ConversationState::Processing);

        assert!(machine.handle_event(VoiceEvent::PlaybackStart(TurnId::from("t3"))));
        assert_eq!(machine.state(), ConversationState::SystemSpeaking);
        assert_eq!(machine.current_turn_id().unwrap().as_str(), "t3");

        assert!(machine.handle_event(VoiceEvent::PlaybackEnd));
        assert_eq!(machine.state(), ConversationState::Idle);
    }

    #[test]
    fn test_reset_clears_session_state() {
        let machine = machine();
        machine.register_playing_audio(Arc::new(StubClip::new()) as Arc<dyn PlaybackHandle>);
        machine.on_speech_playback_start(TurnId::new());

        machine.reset();
        assert_eq!(machine.state(), ConversationState::Idle);
        assert!(machine.current_turn_id().is_none());
        assert!(machine.echo_guard_remaining().is_none());
    }

    #[test]
    fn test_full_conversation_cycle() {
        let machine = machine();

        assert!(machine.on_voice_activity_start());
        machine.on_voice_activity_end();
        assert_eq!(machine.state(), ConversationState::Processing);

        machine.on_speech_playback_start(TurnId::from("reply-1"));
        assert_eq!(machine.state(), ConversationState::SystemSpeaking);

        machine.on_speech_playback_end();
        assert_eq!(machine.state(), ConversationState::Idle);

        // Next turn starts cleanly once the guard has lapsed.
        machine.set_echo_guard_until_ms(0);
        assert!(machine.on_voice_activity_start());
        assert_eq!(machine.state(), ConversationState::UserSpeaking);
    }

    #[tokio::test]
    async fn test_event_loop_drives_machine() {
        let machine = Arc::new(machine());
        let (tx, rx) = mpsc::channel(16);
        let worker = machine.spawn_event_loop(rx);

        tx.send(VoiceEvent::SpeechStart).await.unwrap();
        tx.send(VoiceEvent::SpeechEnd).await.unwrap();
        tx.send(VoiceEvent::PlaybackStart(TurnId::from("t8")))
            .await
            .unwrap();
        drop(tx);
        worker.await.unwrap();

        assert_eq!(machine.state(), ConversationState::SystemSpeaking);
        assert_eq!(machine.current_turn_id().unwrap().as_str(), "t8");
    }

    #[test]
    fn test_thread_safe_reads() {
        use std::thread;

        let machine = Arc::new(machine());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let machine = Arc::clone(&machine);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = machine.state();
                        let _ = machine.current_turn_id();
                        let _ = machine.echo_guard_remaining();
                    }
                })
            })
            .collect();

        for i in 0..50 {
            if i % 2 == 0 {
                machine.on_voice_activity_start();
            } else {
                machine.on_voice_activity_end();
            }
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
