use super::config::SessionConfig;
use super::state::SessionState;
use super::stats::{SessionCounters, SessionStats};
use crate::audio::{
    AudioClock, AudioFrame, CaptureBackend, CaptureFactory, FrameEncoder, PlaybackFactory,
    PlaybackScheduler,
};
use crate::auth::CredentialStore;
use crate::channel::{ChannelHandle, RealtimeChannel, ServerEvent};
use crate::error::{Result, VoiceError};
use crate::status::StatusSink;
use crate::transcript::{Message, TranscriptAggregator};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const STATUS_INITIALIZING: &str = "Initializing";
const STATUS_LISTENING: &str = "Listening";
const STATUS_SPEAKING: &str = "Speaking";
const STATUS_INTERRUPTED: &str = "Interrupted. Listening...";
const STATUS_ERROR: &str = "Session Error! Reconnect to try again.";
const STATUS_CLOSED: &str = "Session Closed.";

/// External collaborators a session talks to.
///
/// Capture and playback are factories because each session run owns a fresh
/// device context that is torn down on every exit path.
pub struct SessionIo {
    pub channel: Box<dyn RealtimeChannel>,
    pub capture: Box<dyn CaptureFactory>,
    pub playback: Box<dyn PlaybackFactory>,
    pub credentials: Arc<dyn CredentialStore>,
    pub status: Arc<dyn StatusSink>,
    pub clock: Arc<dyn AudioClock>,
}

#[cfg(feature = "audio-io")]
impl SessionIo {
    /// Collaborators backed by the host microphone, speakers, the WebSocket
    /// channel and an environment-variable API key.
    pub fn host(api_key_env: impl Into<String>) -> Self {
        Self {
            channel: Box::new(crate::channel::WsChannel),
            capture: Box::new(crate::audio::MicrophoneFactory),
            playback: Box::new(crate::audio::HostPlaybackFactory),
            credentials: Arc::new(crate::auth::EnvCredentialStore::new(api_key_env)),
            status: Arc::new(crate::status::LogStatus),
            clock: Arc::new(crate::audio::SystemClock::new()),
        }
    }
}

/// A realtime voice session: microphone in, transcribed conversation and
/// synthesized speech out.
///
/// One connection at a time. `start` is a no-op unless the session is Idle or
/// Closed; `stop` is safe and idempotent from any state. All owned resources
/// (capture device, channel, playback context) are released on every exit
/// path, exactly once.
pub struct VoiceSession {
    config: SessionConfig,
    channel: Box<dyn RealtimeChannel>,
    capture: Box<dyn CaptureFactory>,
    playback: Box<dyn PlaybackFactory>,
    credentials: Arc<dyn CredentialStore>,
    status: Arc<dyn StatusSink>,
    clock: Arc<dyn AudioClock>,

    state: Arc<Mutex<SessionState>>,
    messages: Arc<Mutex<Vec<Message>>>,
    counters: Arc<SessionCounters>,
    started_at: Arc<Mutex<chrono::DateTime<Utc>>>,
    last_error: Arc<Mutex<Option<String>>>,

    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    pub fn new(config: SessionConfig, io: SessionIo) -> Self {
        Self {
            config,
            channel: io.channel,
            capture: io.capture,
            playback: io.playback,
            credentials: io.credentials,
            status: io.status,
            clock: io.clock,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            messages: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(SessionCounters::default()),
            started_at: Arc::new(Mutex::new(Utc::now())),
            last_error: Arc::new(Mutex::new(None)),
            stop_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Connect and go live. No-op when a session is already in flight.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if !state.can_start() {
                warn!("session start ignored in state {}", *state);
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        info!("starting voice session: {}", self.config.session_id);
        self.status.report(STATUS_INITIALIZING);

        // A fresh run begins from a clean slate.
        self.messages.lock().await.clear();
        self.counters.reset();
        *self.started_at.lock().await = Utc::now();
        *self.last_error.lock().await = None;

        if !self.credentials.has_valid_credential() {
            if let Err(e) = self.credentials.request_credential().await {
                return self.fail_start(e).await;
            }
        }
        let credential = match self.credentials.credential() {
            Some(credential) => credential,
            None => {
                return self
                    .fail_start(VoiceError::Authorization("no credential on hand".into()))
                    .await;
            }
        };

        // Acquire the capture device.
        let mut backend = match self.capture.open(&self.config.capture_config()) {
            Ok(backend) => backend,
            Err(e) => return self.fail_start(e).await,
        };
        let frames = match backend.start().await {
            Ok(frames) => frames,
            Err(e) => {
                let _ = backend.stop().await;
                return self.fail_start(e).await;
            }
        };

        // Acquire the playback context.
        let sink = match self.playback.open() {
            Ok(sink) => sink,
            Err(e) => {
                let _ = backend.stop().await;
                return self.fail_start(e).await;
            }
        };

        // Open the realtime channel.
        let mut handle = match self
            .channel
            .connect(&self.config.channel_config(), &credential)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                let _ = backend.stop().await;
                if e.is_authorization() {
                    // Signal the credential collaborator to re-authorize; the
                    // caller may then retry.
                    let _ = self.credentials.request_credential().await;
                }
                return self.fail_start(e).await;
            }
        };

        // Wait for the remote acknowledgement before going live.
        match handle.events.recv().await {
            Some(ServerEvent::SessionOpened) => {}
            Some(ServerEvent::SessionError(reason)) => {
                let _ = backend.stop().await;
                let err = VoiceError::from_remote_reason(reason);
                if err.is_authorization() {
                    let _ = self.credentials.request_credential().await;
                }
                return self.fail_start(err).await;
            }
            Some(other) => {
                let _ = backend.stop().await;
                return self
                    .fail_start(VoiceError::Connection(format!(
                        "unexpected event before acknowledgement: {:?}",
                        other
                    )))
                    .await;
            }
            None => {
                let _ = backend.stop().await;
                return self
                    .fail_start(VoiceError::Connection(
                        "channel closed during setup".into(),
                    ))
                    .await;
            }
        }

        {
            let mut state = self.state.lock().await;
            if *state != SessionState::Connecting {
                // A stop request raced the connect; unwind quietly.
                drop(state);
                let _ = backend.stop().await;
                return Ok(());
            }
            *state = SessionState::Active;
        }
        self.status.report(STATUS_LISTENING);
        info!("voice session active: {}", self.config.session_id);

        let (stop_tx, stop_rx) = watch::channel(false);
        let driver = SessionDriver {
            frames,
            backend,
            handle,
            encoder: FrameEncoder::new(self.config.capture_sample_rate),
            scheduler: PlaybackScheduler::new(
                sink,
                Arc::clone(&self.clock),
                self.config.playback_sample_rate,
            ),
            aggregator: TranscriptAggregator::new(),
            status: Arc::clone(&self.status),
            state: Arc::clone(&self.state),
            messages: Arc::clone(&self.messages),
            counters: Arc::clone(&self.counters),
            credentials: Arc::clone(&self.credentials),
            last_error: Arc::clone(&self.last_error),
            stop_rx,
            speaking: false,
        };

        *self.stop_tx.lock().await = Some(stop_tx);
        *self.task.lock().await = Some(tokio::spawn(driver.run()));

        Ok(())
    }

    /// Request session close. Safe and idempotent from any state.
    pub async fn stop(&self) -> Result<SessionStats> {
        let live = {
            let mut state = self.state.lock().await;
            match *state {
                SessionState::Idle | SessionState::Closed => false,
                SessionState::Error => {
                    // Resources were already released on the way into Error.
                    *state = SessionState::Closed;
                    false
                }
                _ => {
                    *state = SessionState::Closing;
                    true
                }
            }
        };
        if !live {
            return Ok(self.stats().await);
        }

        info!("stopping voice session: {}", self.config.session_id);

        if let Some(stop) = self.stop_tx.lock().await.take() {
            let _ = stop.send(true);
        }
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                error!("session task panicked: {}", e);
            }
        }

        {
            let mut state = self.state.lock().await;
            *state = SessionState::Closed;
        }

        Ok(self.stats().await)
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// The ordered transcript log accumulated so far.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Current session statistics
    pub async fn stats(&self) -> SessionStats {
        let started_at = *self.started_at.lock().await;
        let duration = Utc::now().signed_duration_since(started_at);
        let state = *self.state.lock().await;
        SessionStats {
            is_live: state.is_live(),
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_captured: self.counters.frames_captured.load(Ordering::SeqCst),
            chunks_sent: self.counters.chunks_sent.load(Ordering::SeqCst),
            chunks_dropped: self.counters.chunks_dropped.load(Ordering::SeqCst),
            audio_chunks_scheduled: self.counters.audio_chunks_scheduled.load(Ordering::SeqCst),
            turns_completed: self.counters.turns_completed.load(Ordering::SeqCst),
            messages_count: self.messages.lock().await.len(),
        }
    }

    async fn fail_start(&self, err: VoiceError) -> Result<()> {
        error!("session start failed: {}", err);
        *self.last_error.lock().await = Some(err.to_string());
        *self.state.lock().await = SessionState::Error;
        self.status.report(STATUS_ERROR);
        Err(err)
    }
}

enum Outcome {
    /// Explicit stop request.
    Stopped,
    /// The service closed the conversation.
    RemoteClosed(String),
    /// Transport or protocol failure.
    Failed(VoiceError),
}

/// The session's single logical stream of control: one task that forwards
/// capture frames and dispatches server events in arrival order. Cursor and
/// source-set mutations all happen here, so an interruption can never race a
/// just-issued schedule.
struct SessionDriver {
    frames: mpsc::Receiver<AudioFrame>,
    backend: Box<dyn CaptureBackend>,
    handle: ChannelHandle,
    encoder: FrameEncoder,
    scheduler: PlaybackScheduler,
    aggregator: TranscriptAggregator,
    status: Arc<dyn StatusSink>,
    state: Arc<Mutex<SessionState>>,
    messages: Arc<Mutex<Vec<Message>>>,
    counters: Arc<SessionCounters>,
    credentials: Arc<dyn CredentialStore>,
    last_error: Arc<Mutex<Option<String>>>,
    stop_rx: watch::Receiver<bool>,
    speaking: bool,
}

impl SessionDriver {
    async fn run(mut self) {
        debug!("session event loop started");
        let outcome = loop {
            tokio::select! {
                _ = self.stop_rx.changed() => break Outcome::Stopped,
                frame = self.frames.recv() => match frame {
                    Some(frame) => self.forward_frame(frame),
                    None => break Outcome::Failed(VoiceError::DeviceUnavailable(
                        "capture stream ended".into(),
                    )),
                },
                event = self.handle.events.recv() => match event {
                    Some(event) => {
                        if let Some(outcome) = self.dispatch(event).await {
                            break outcome;
                        }
                    }
                    None => break Outcome::Failed(VoiceError::Connection(
                        "event stream ended unexpectedly".into(),
                    )),
                },
            }
        };
        self.finish(outcome).await;
    }

    /// Encode and hand off one capture frame. Never waits on the network: if
    /// the transport queue is full the chunk is dropped.
    fn forward_frame(&mut self, frame: AudioFrame) {
        self.counters.frames_captured.fetch_add(1, Ordering::SeqCst);
        let chunk = self.encoder.encode(&frame);
        match self.handle.input.try_send(chunk) {
            Ok(()) => {
                self.counters.chunks_sent.fetch_add(1, Ordering::SeqCst);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.counters.chunks_dropped.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("input queue full; {} chunks dropped so far", dropped);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // The reader will surface the close/error; just count it.
                self.counters.chunks_dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Handle one server event. Returns the session outcome when the event
    /// ends the session.
    async fn dispatch(&mut self, event: ServerEvent) -> Option<Outcome> {
        match event {
            ServerEvent::SessionOpened => None, // duplicate acknowledgement
            ServerEvent::PartialInputTranscript(text) => {
                self.aggregator.append_input(&text);
                None
            }
            ServerEvent::PartialOutputTranscript(text) => {
                self.aggregator.append_output(&text);
                self.report_speaking();
                None
            }
            ServerEvent::AudioChunk(bytes) => {
                match self.scheduler.schedule_chunk(&bytes) {
                    Ok(_) => {
                        self.counters
                            .audio_chunks_scheduled
                            .fetch_add(1, Ordering::SeqCst);
                        self.report_speaking();
                    }
                    // A single bad chunk is dropped; the session stays alive.
                    Err(e) => warn!("dropping audio chunk: {}", e),
                }
                None
            }
            ServerEvent::Interrupted => {
                self.scheduler.interrupt();
                self.speaking = false;
                self.status.report(STATUS_INTERRUPTED);
                None
            }
            ServerEvent::TurnComplete => {
                let turn_messages = self.aggregator.complete_turn();
                if !turn_messages.is_empty() {
                    let mut log = self.messages.lock().await;
                    for message in turn_messages {
                        log.push(message.clone());
                        self.status.push_message(message);
                    }
                }
                self.counters.turns_completed.fetch_add(1, Ordering::SeqCst);
                // The next turn's audio starts fresh relative to "now".
                self.scheduler.rebase();
                self.speaking = false;
                self.status.report(STATUS_LISTENING);
                None
            }
            ServerEvent::SessionError(reason) => {
                Some(Outcome::Failed(VoiceError::from_remote_reason(reason)))
            }
            ServerEvent::SessionClosed(reason) => Some(Outcome::RemoteClosed(reason)),
        }
    }

    fn report_speaking(&mut self) {
        if !self.speaking {
            self.speaking = true;
            self.status.report(STATUS_SPEAKING);
        }
    }

    /// Tear down in the same order on every exit path: stop input
    /// forwarding, flush playback, release the capture device.
    async fn finish(mut self, outcome: Outcome) {
        self.scheduler.interrupt();
        self.aggregator.clear();
        if let Err(e) = self.backend.stop().await {
            warn!("failed to stop capture backend: {}", e);
        }
        // Dropping the input sender closes the channel writer, which in turn
        // closes the socket; the playback context goes with the scheduler.

        match outcome {
            Outcome::Stopped => {
                *self.state.lock().await = SessionState::Closed;
                self.status.report(STATUS_CLOSED);
                info!("session closed");
            }
            Outcome::RemoteClosed(reason) => {
                *self.state.lock().await = SessionState::Closed;
                self.status.report(STATUS_CLOSED);
                info!("remote closed session: {}", reason);
            }
            Outcome::Failed(err) => {
                if err.is_authorization() {
                    let _ = self.credentials.request_credential().await;
                }
                error!("session failed: {}", err);
                *self.last_error.lock().await = Some(err.to_string());
                *self.state.lock().await = SessionState::Error;
                self.status.report(STATUS_ERROR);
            }
        }
        debug!("session event loop finished");
    }
}
