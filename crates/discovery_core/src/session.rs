//! crates/discovery_core/src/session.rs
//!
//! The discovery cursor: a sequential walk over a fixed track list where each
//! card takes exactly one decision, one backend call, and one advance.

use uuid::Uuid;

use crate::domain::{ActionKind, SongAction, Track};

/// An enum representing where the session is in its decide/resolve cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// One action is in flight for the card at the cursor; further input is ignored.
    AwaitingActionResult { pending: SongAction },
    Complete,
}

/// What a resolved action did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub resolved: SongAction,
    pub liked_appended: bool,
    pub new_index: usize,
    pub completed: bool,
}

/// Read-only view handed to observers after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub current_index: usize,
    pub total: usize,
    pub current: Option<Track>,
    pub liked: Vec<Track>,
    pub awaiting: bool,
    pub complete: bool,
    pub ignored_inputs: u64,
}

#[derive(Debug, Clone)]
pub struct DiscoverySession {
    id: Uuid,
    tracks: Vec<Track>,
    current_index: usize,
    liked: Vec<Track>,
    phase: SessionPhase,
    ignored_inputs: u64,
}

impl DiscoverySession {
    pub fn new(tracks: Vec<Track>) -> Self {
        let phase = if tracks.is_empty() {
            SessionPhase::Complete
        } else {
            SessionPhase::Idle
        };
        Self {
            id: Uuid::new_v4(),
            tracks,
            current_index: 0,
            liked: Vec::new(),
            phase,
            ignored_inputs: 0,
        }
    }

    /// Starts over with a new track list. This is re-initialisation, not a transition.
    pub fn reset(&mut self, tracks: Vec<Track>) {
        *self = Self::new(tracks);
    }

    /// True when `tracks` is the list this session is already walking, so the
    /// caller should resume rather than restart.
    pub fn is_same_session(&self, tracks: &[Track]) -> bool {
        self.tracks.len() == tracks.len()
            && self.tracks.iter().zip(tracks).all(|(a, b)| a.id == b.id)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn liked(&self) -> &[Track] {
        &self.liked
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.phase, SessionPhase::AwaitingActionResult { .. })
    }

    /// `Idle -> AwaitingActionResult`. Returns the action to submit, or `None`
    /// when the input must be ignored (an action is pending or the session is over).
    pub fn decide(&mut self, kind: ActionKind) -> Option<SongAction> {
        if self.phase != SessionPhase::Idle {
            self.ignored_inputs += 1;
            return None;
        }
        let track = self.tracks.get(self.current_index)?;
        let action = SongAction::from_track(track, kind);
        self.phase = SessionPhase::AwaitingActionResult {
            pending: action.clone(),
        };
        Some(action)
    }

    /// `AwaitingActionResult -> Idle(n + 1)` or `Complete`, whatever the outcome.
    /// A liked track is appended before the cursor moves, and only on success.
    pub fn resolve(&mut self, succeeded: bool) -> Option<Advance> {
        let pending = match std::mem::replace(&mut self.phase, SessionPhase::Idle) {
            SessionPhase::AwaitingActionResult { pending } => pending,
            other => {
                self.phase = other;
                return None;
            }
        };

        let liked_appended = succeeded && pending.action == ActionKind::Like;
        if liked_appended {
            if let Some(track) = self.tracks.get(self.current_index) {
                self.liked.push(track.clone());
            }
        }

        self.current_index += 1;
        let completed = self.current_index >= self.tracks.len();
        if completed {
            self.phase = SessionPhase::Complete;
        }

        Some(Advance {
            resolved: pending,
            liked_appended,
            new_index: self.current_index,
            completed,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            current_index: self.current_index,
            total: self.tracks.len(),
            current: self.current_track().cloned(),
            liked: self.liked.clone(),
            awaiting: self.is_awaiting(),
            complete: self.is_complete(),
            ignored_inputs: self.ignored_inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            isrc: format!("ISRC{}", id),
            name: format!("Song {}", id),
            artists: vec!["Someone".to_string()],
            album_art_url: None,
            preview_url: None,
            genres: vec!["indie".to_string()],
            popularity: 50,
        }
    }

    #[test]
    fn like_then_failed_dislike_completes() {
        let mut session = DiscoverySession::new(vec![track("A"), track("B")]);

        assert!(session.decide(ActionKind::Like).is_some());
        let advance = session.resolve(true).unwrap();
        assert!(advance.liked_appended);
        assert_eq!(session.liked(), &[track("A")]);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.phase(), &SessionPhase::Idle);

        let action = session.decide(ActionKind::Dislike).unwrap();
        assert_eq!(action.isrc, "ISRCB");
        let advance = session.resolve(false).unwrap();
        assert!(advance.completed);
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.liked(), &[track("A")]);
        assert!(session.is_complete());
    }

    #[test]
    fn failed_like_advances_without_appending() {
        let mut session = DiscoverySession::new(vec![track("A"), track("B")]);
        session.decide(ActionKind::Like);
        let advance = session.resolve(false).unwrap();

        assert!(!advance.liked_appended);
        assert!(session.liked().is_empty());
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn second_decision_while_awaiting_is_ignored() {
        let mut session = DiscoverySession::new(vec![track("A"), track("B")]);
        assert!(session.decide(ActionKind::Like).is_some());
        assert!(session.decide(ActionKind::Like).is_none());
        assert!(session.decide(ActionKind::Dislike).is_none());

        session.resolve(true);
        assert!(session.resolve(true).is_none());
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.liked().len(), 1);
        assert_eq!(session.snapshot().ignored_inputs, 2);
    }

    #[test]
    fn n_tracks_need_n_advances_regardless_of_failures() {
        let tracks: Vec<Track> = (0..5).map(|i| track(&i.to_string())).collect();
        let mut session = DiscoverySession::new(tracks);
        let mut advances = 0;
        while !session.is_complete() {
            let kind = if advances % 2 == 0 {
                ActionKind::Like
            } else {
                ActionKind::Dislike
            };
            session.decide(kind).unwrap();
            session.resolve(advances % 3 != 0).unwrap();
            advances += 1;
        }
        assert_eq!(advances, 5);
        assert_eq!(session.current_index(), 5);
        assert!(session.current_track().is_none());
    }

    #[test]
    fn complete_session_accepts_no_decisions() {
        let mut session = DiscoverySession::new(vec![]);
        assert!(session.is_complete());
        assert!(session.decide(ActionKind::Like).is_none());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn resume_detection_compares_track_ids() {
        let session = DiscoverySession::new(vec![track("A"), track("B")]);
        assert!(session.is_same_session(&[track("A"), track("B")]));
        assert!(!session.is_same_session(&[track("B"), track("A")]));
        assert!(!session.is_same_session(&[track("A")]));
    }

    #[test]
    fn reset_starts_a_fresh_session() {
        let mut session = DiscoverySession::new(vec![track("A")]);
        let first_id = session.id();
        session.decide(ActionKind::Like);
        session.resolve(true);

        session.reset(vec![track("C"), track("D")]);
        assert_ne!(session.id(), first_id);
        assert_eq!(session.current_index(), 0);
        assert!(session.liked().is_empty());
        assert_eq!(session.phase(), &SessionPhase::Idle);
    }
}
