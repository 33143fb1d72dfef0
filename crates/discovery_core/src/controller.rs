//! crates/discovery_core/src/controller.rs
//!
//! Actor that owns one `DiscoverySession`. All session mutations happen on this
//! single task; the UI talks to it through `SessionHandle` and observes it through
//! a `watch` channel of snapshots plus an event stream.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{AccessToken, ActionKind, SongAction, Track};
use crate::ports::{DiscoveryBackend, PortError, PortResult};
use crate::session::{DiscoverySession, SessionSnapshot};
use crate::swipe::SwipeTracker;

const COMMAND_BUFFER: usize = 32;

/// Inputs accepted by the session actor.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// A direct like/dislike control, bypassing the drag.
    Decide(ActionKind),
    /// Horizontal drag movement on the top card.
    DragBy(f32),
    /// The drag ended; classified against the swipe threshold.
    Release,
    /// Load a track list. Resumes when it matches the current one unless `restart` is set.
    Load { tracks: Vec<Track>, restart: bool },
    Dispose,
}

/// Notifications that do not fit in a snapshot.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ActionRecorded { action: SongAction, message: String },
    /// The session still advanced; this is for a transient notice only.
    ActionFailed { action: SongAction, error: PortError },
    Completed { liked: Vec<Track> },
}

/// The caller's side of a running session actor. Dropping it disposes the session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    lifetime: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> PortResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PortError::Unexpected("Discovery session has ended".to_string()))
    }

    pub async fn like(&self) -> PortResult<()> {
        self.send(SessionCommand::Decide(ActionKind::Like)).await
    }

    pub async fn dislike(&self) -> PortResult<()> {
        self.send(SessionCommand::Decide(ActionKind::Dislike)).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Takes the event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    /// Stops the actor. An in-flight action is dropped along with its result.
    pub async fn dispose(self) {
        self.lifetime.cancel();
        if let Err(e) = self.task.await {
            warn!("Discovery session task ended abnormally: {}", e);
        }
    }
}

pub struct SessionController {
    session: DiscoverySession,
    swipe: SwipeTracker,
    backend: Arc<dyn DiscoveryBackend>,
    token: AccessToken,
    snapshots: watch::Sender<SessionSnapshot>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

type InFlight = BoxFuture<'static, PortResult<String>>;

enum Step {
    Stop,
    Command(SessionCommand),
    Resolved(PortResult<String>),
}

impl SessionController {
    /// Spawns the actor onto the current runtime. `lifetime` ties it to its owner
    /// (a screen or connection); cancelling it discards any pending result.
    pub fn spawn(
        backend: Arc<dyn DiscoveryBackend>,
        token: AccessToken,
        tracks: Vec<Track>,
        swipe_threshold: f32,
        lifetime: CancellationToken,
    ) -> SessionHandle {
        let session = DiscoverySession::new(tracks);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let controller = SessionController {
            session,
            swipe: SwipeTracker::new(swipe_threshold),
            backend,
            token,
            snapshots: snapshot_tx,
            events: event_tx,
        };

        let task = tokio::spawn(controller.run(command_rx, lifetime.clone()));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: Some(event_rx),
            lifetime,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        lifetime: CancellationToken,
    ) {
        info!(
            session_id = %self.session.id(),
            tracks = self.session.tracks().len(),
            "Discovery session started"
        );
        let mut in_flight: Option<InFlight> = None;

        loop {
            let step = tokio::select! {
                biased;
                _ = lifetime.cancelled() => Step::Stop,
                result = wait_in_flight(&mut in_flight) => Step::Resolved(result),
                command = commands.recv() => match command {
                    Some(SessionCommand::Dispose) | None => Step::Stop,
                    Some(command) => Step::Command(command),
                },
            };

            match step {
                Step::Stop => break,
                Step::Resolved(result) => {
                    in_flight = None;
                    self.finish_action(result);
                }
                Step::Command(command) => {
                    if let Some(action) = self.handle_command(command, &mut in_flight) {
                        in_flight = Some(self.submit(action));
                    }
                }
            }
            self.publish();
        }

        if in_flight.is_some() {
            debug!(
                session_id = %self.session.id(),
                "Dropping in-flight action for disposed session"
            );
        }
        info!(session_id = %self.session.id(), "Discovery session disposed");
    }

    /// Applies a command and returns an action to submit, if the command produced one.
    fn handle_command(
        &mut self,
        command: SessionCommand,
        in_flight: &mut Option<InFlight>,
    ) -> Option<SongAction> {
        match command {
            SessionCommand::Decide(kind) => self.decide(kind),
            SessionCommand::DragBy(delta) => {
                if !self.session.is_awaiting() && !self.session.is_complete() {
                    self.swipe.drag_by(delta);
                }
                None
            }
            SessionCommand::Release => match self.swipe.release() {
                Some(kind) => self.decide(kind),
                None => {
                    debug!("Swipe released inside threshold, cancelled");
                    None
                }
            },
            SessionCommand::Load { tracks, restart } => {
                if !restart && self.session.is_same_session(&tracks) {
                    info!(
                        session_id = %self.session.id(),
                        "Resuming in-progress discovery session"
                    );
                } else {
                    // Anything pending belongs to the old list.
                    *in_flight = None;
                    self.session.reset(tracks);
                    self.swipe.release();
                    info!(
                        session_id = %self.session.id(),
                        tracks = self.session.tracks().len(),
                        "Discovery session reset"
                    );
                }
                None
            }
            // Handled by the run loop.
            SessionCommand::Dispose => None,
        }
    }

    fn decide(&mut self, kind: ActionKind) -> Option<SongAction> {
        let action = self.session.decide(kind);
        if action.is_none() {
            debug!(action = %kind, "Decision ignored, action pending or session complete");
        }
        action
    }

    fn submit(&self, action: SongAction) -> InFlight {
        info!(isrc = %action.isrc, action = %action.action, "Submitting track action");
        let backend = self.backend.clone();
        let token = self.token.clone();
        Box::pin(async move { backend.record_action(&token, &action).await })
    }

    fn finish_action(&mut self, result: PortResult<String>) {
        let succeeded = result.is_ok();
        let Some(advance) = self.session.resolve(succeeded) else {
            return;
        };

        let event = match result {
            Ok(message) => {
                debug!(isrc = %advance.resolved.isrc, %message, "Track action recorded");
                SessionEvent::ActionRecorded {
                    action: advance.resolved,
                    message,
                }
            }
            Err(error) => {
                warn!(
                    isrc = %advance.resolved.isrc,
                    error = %error,
                    "Track action failed, advancing anyway"
                );
                SessionEvent::ActionFailed {
                    action: advance.resolved,
                    error,
                }
            }
        };
        self.emit(event);

        if advance.completed {
            info!(
                session_id = %self.session.id(),
                liked = self.session.liked().len(),
                "Discovery session complete"
            );
            self.emit(SessionEvent::Completed {
                liked: self.session.liked().to_vec(),
            });
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> PortResult<String> {
    match in_flight {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artist, CreatedPlaylist, DiscoveryRequest, PlaylistDraft};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Each `record_action` waits for a permit, so tests decide when actions resolve.
    struct GatedBackend {
        gate: Semaphore,
        calls: Mutex<Vec<SongAction>>,
        failing_isrcs: HashSet<String>,
    }

    impl GatedBackend {
        fn new(open: usize, failing: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(open),
                calls: Mutex::new(Vec::new()),
                failing_isrcs: failing.iter().map(|s| s.to_string()).collect(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DiscoveryBackend for GatedBackend {
        async fn fetch_artists(
            &self,
            _: &AccessToken,
            _: &str,
            _: &str,
        ) -> PortResult<Vec<Artist>> {
            Ok(vec![])
        }

        async fn discover_tracks(
            &self,
            _: &AccessToken,
            _: &DiscoveryRequest,
        ) -> PortResult<Vec<Track>> {
            Ok(vec![])
        }

        async fn record_action(&self, _: &AccessToken, action: &SongAction) -> PortResult<String> {
            self.calls.lock().unwrap().push(action.clone());
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            permit.forget();
            if self.failing_isrcs.contains(&action.isrc) {
                Err(PortError::Unexpected("network down".to_string()))
            } else {
                Ok("recorded".to_string())
            }
        }

        async fn preview_playlist(
            &self,
            _: &AccessToken,
            _: &DiscoveryRequest,
        ) -> PortResult<Vec<Track>> {
            Ok(vec![])
        }

        async fn create_playlist(
            &self,
            _: &AccessToken,
            _: &PlaylistDraft,
        ) -> PortResult<CreatedPlaylist> {
            Err(PortError::Unexpected("unused".to_string()))
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            isrc: id.to_string(),
            name: format!("Song {}", id),
            artists: vec!["Band".to_string()],
            album_art_url: None,
            preview_url: None,
            genres: vec!["rock".to_string()],
            popularity: 10,
        }
    }

    fn spawn(backend: Arc<GatedBackend>, tracks: Vec<Track>) -> SessionHandle {
        SessionController::spawn(
            backend,
            AccessToken::parse(Some("token")).unwrap(),
            tracks,
            100.0,
            CancellationToken::new(),
        )
    }

    async fn wait_for(
        handle: &SessionHandle,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = handle.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session dropped")
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn like_success_then_dislike_failure_completes() {
        let backend = GatedBackend::new(10, &["B"]);
        let mut handle = spawn(backend.clone(), vec![track("A"), track("B")]);
        let mut events = handle.take_events().unwrap();

        handle.like().await.unwrap();
        let snap = wait_for(&handle, |s| s.current_index == 1).await;
        assert_eq!(snap.liked, vec![track("A")]);

        handle.dislike().await.unwrap();
        let snap = wait_for(&handle, |s| s.complete).await;
        assert_eq!(snap.current_index, 2);
        assert_eq!(snap.liked, vec![track("A")]);

        assert!(matches!(events.recv().await, Some(SessionEvent::ActionRecorded { .. })));
        assert!(matches!(events.recv().await, Some(SessionEvent::ActionFailed { .. })));
        match events.recv().await {
            Some(SessionEvent::Completed { liked }) => assert_eq!(liked, vec![track("A")]),
            other => panic!("unexpected event: {:?}", other),
        }
        handle.dispose().await;
    }

    #[tokio::test]
    async fn input_while_awaiting_is_dropped_not_queued() {
        let backend = GatedBackend::new(0, &[]);
        let handle = spawn(backend.clone(), vec![track("A"), track("B")]);

        handle.like().await.unwrap();
        wait_for(&handle, |s| s.awaiting).await;
        handle.like().await.unwrap();
        handle.dislike().await.unwrap();
        wait_for(&handle, |s| s.ignored_inputs == 2).await;

        backend.gate.add_permits(1);
        let snap = wait_for(&handle, |s| s.current_index == 1 && !s.awaiting).await;
        assert_eq!(snap.liked.len(), 1);
        assert_eq!(backend.call_count(), 1);

        // Nothing was queued behind the first action.
        backend.gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.snapshot().current_index, 1);
        assert_eq!(backend.call_count(), 1);
        handle.dispose().await;
    }

    #[tokio::test]
    async fn swipe_past_threshold_drives_the_same_transition() {
        let backend = GatedBackend::new(10, &[]);
        let handle = spawn(backend.clone(), vec![track("A"), track("B")]);

        // Exactly at the threshold is a cancel.
        handle.send(SessionCommand::DragBy(100.0)).await.unwrap();
        handle.send(SessionCommand::Release).await.unwrap();
        handle.send(SessionCommand::DragBy(101.0)).await.unwrap();
        handle.send(SessionCommand::Release).await.unwrap();

        let snap = wait_for(&handle, |s| s.current_index == 1).await;
        assert_eq!(snap.liked, vec![track("A")]);

        handle.send(SessionCommand::DragBy(-150.0)).await.unwrap();
        handle.send(SessionCommand::Release).await.unwrap();
        let snap = wait_for(&handle, |s| s.complete).await;
        assert_eq!(snap.liked, vec![track("A")]);

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].action, ActionKind::Like);
        assert_eq!(calls[1].action, ActionKind::Dislike);
        drop(calls);
        handle.dispose().await;
    }

    #[tokio::test]
    async fn dispose_discards_pending_result() {
        let backend = GatedBackend::new(0, &[]);
        let mut handle = spawn(backend.clone(), vec![track("A")]);
        let mut events = handle.take_events().unwrap();
        let snapshots = handle.subscribe();

        handle.like().await.unwrap();
        wait_for(&handle, |s| s.awaiting).await;
        handle.dispose().await;
        backend.gate.add_permits(1);

        assert!(events.recv().await.is_none());
        let last = snapshots.borrow().clone();
        assert_eq!(last.current_index, 0);
        assert!(last.liked.is_empty());
    }

    #[tokio::test]
    async fn load_resumes_same_list_and_resets_on_new_one() {
        let backend = GatedBackend::new(10, &[]);
        let handle = spawn(backend.clone(), vec![track("A"), track("B")]);

        handle.like().await.unwrap();
        let first = wait_for(&handle, |s| s.current_index == 1).await;

        handle
            .send(SessionCommand::Load { tracks: vec![track("A"), track("B")], restart: false })
            .await
            .unwrap();
        handle.dislike().await.unwrap();
        let snap = wait_for(&handle, |s| s.complete).await;
        assert_eq!(snap.session_id, first.session_id);

        handle
            .send(SessionCommand::Load { tracks: vec![track("C")], restart: false })
            .await
            .unwrap();
        let fresh = wait_for(&handle, |s| s.session_id != first.session_id).await;
        assert_eq!(fresh.current_index, 0);
        assert_eq!(fresh.total, 1);
        assert!(fresh.liked.is_empty());
        handle.dispose().await;
    }
}
