//! Observer interface for session events.
//!
//! Observers are called on the session actor's task. Callbacks must not
//! block; calling back into the [`SignalingClientHandle`](crate::SignalingClientHandle)
//! from a callback is fine because handle mutators only enqueue.

use crate::presence::PresenceEvent;
use crate::types::{
    DataMessageReceived, DataMessageSendError, RemoteVideoSourceInfo, SignalStrengthUpdate,
    SignalingClientStatus, StartInfo, VolumeUpdate,
};
use common::types::Attendee;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives session events. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait SignalingObserver: Send + Sync {
    /// The first INDEX frame arrived: the session is usable.
    fn on_signaling_client_started(&self, start_info: &StartInfo) {}

    /// The session ended. Called at most once per start.
    fn on_signaling_client_stopped(&self, status: &SignalingClientStatus) {}

    /// Answer SDP from SUBSCRIBE_ACK, to be applied by the media engine.
    fn on_remote_description_received(&self, sdp_answer: &str) {}

    fn on_remote_video_sources_available(&self, sources: &[RemoteVideoSourceInfo]) {}

    fn on_remote_video_sources_unavailable(&self, sources: &[RemoteVideoSourceInfo]) {}

    fn on_attendee_joined(&self, attendee: &Attendee) {}

    fn on_attendee_left(&self, attendee: &Attendee) {}

    /// The attendee disconnected without leaving.
    fn on_attendee_dropped(&self, attendee: &Attendee) {}

    fn on_attendee_audio_muted(&self, attendee: &Attendee) {}

    fn on_attendee_audio_unmuted(&self, attendee: &Attendee) {}

    fn on_volume_updates(&self, updates: &[VolumeUpdate]) {}

    fn on_signal_strength_changes(&self, updates: &[SignalStrengthUpdate]) {}

    fn on_data_messages_received(&self, messages: &[DataMessageReceived]) {}

    fn on_data_messages_failed_to_send(&self, errors: &[DataMessageSendError]) {}
}

/// Registered observers, shared between the handle and the session.
///
/// Each notification iterates a snapshot taken when it starts, so observers
/// added or removed from inside a callback take effect from the next
/// notification.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn SignalingObserver>>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn SignalingObserver>) {
        self.lock().push(observer);
    }

    /// Remove a previously added observer. Returns false if it was not
    /// registered.
    pub fn remove(&self, observer: &Arc<dyn SignalingObserver>) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|registered| !Arc::ptr_eq(registered, observer));
        observers.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Call `f` on every registered observer.
    pub fn notify(&self, f: impl Fn(&dyn SignalingObserver)) {
        let snapshot = self.lock().clone();
        for observer in &snapshot {
            f(observer.as_ref());
        }
    }

    pub(crate) fn notify_presence(&self, event: &PresenceEvent) {
        match event {
            PresenceEvent::AttendeeJoined(attendee) => {
                self.notify(|o| o.on_attendee_joined(attendee));
            }
            PresenceEvent::AttendeeLeft(attendee) => {
                self.notify(|o| o.on_attendee_left(attendee));
            }
            PresenceEvent::AttendeeDropped(attendee) => {
                self.notify(|o| o.on_attendee_dropped(attendee));
            }
            PresenceEvent::AttendeeMuted(attendee) => {
                self.notify(|o| o.on_attendee_audio_muted(attendee));
            }
            PresenceEvent::AttendeeUnmuted(attendee) => {
                self.notify(|o| o.on_attendee_audio_unmuted(attendee));
            }
            PresenceEvent::VolumeUpdates(updates) => {
                self.notify(|o| o.on_volume_updates(updates));
            }
            PresenceEvent::SignalStrengthChanges(updates) => {
                self.notify(|o| o.on_signal_strength_changes(updates));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn SignalingObserver>>> {
        // Observers hold no registry state, so a poisoned list is still usable
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct JoinCounter {
        joined: AtomicUsize,
    }

    impl SignalingObserver for JoinCounter {
        fn on_attendee_joined(&self, _attendee: &Attendee) {
            self.joined.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Registers another observer from inside a callback.
    struct SelfExtending {
        registry: Arc<ObserverRegistry>,
        added: Arc<JoinCounter>,
    }

    impl SignalingObserver for SelfExtending {
        fn on_attendee_joined(&self, _attendee: &Attendee) {
            self.registry.add(self.added.clone());
        }
    }

    #[test]
    fn test_add_notify_remove() {
        let registry = ObserverRegistry::new();
        let counter = Arc::new(JoinCounter::default());
        let observer: Arc<dyn SignalingObserver> = counter.clone();

        registry.add(observer.clone());
        registry.notify_presence(&PresenceEvent::AttendeeJoined(Attendee::new("a", "b")));
        assert_eq!(counter.joined.load(Ordering::SeqCst), 1);

        assert!(registry.remove(&observer));
        assert!(!registry.remove(&observer));
        assert!(registry.is_empty());

        registry.notify_presence(&PresenceEvent::AttendeeJoined(Attendee::new("a", "b")));
        assert_eq!(counter.joined.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_added_during_notification_misses_it() {
        let registry = Arc::new(ObserverRegistry::new());
        let late = Arc::new(JoinCounter::default());
        registry.add(Arc::new(SelfExtending {
            registry: registry.clone(),
            added: late.clone(),
        }));

        registry.notify_presence(&PresenceEvent::AttendeeJoined(Attendee::new("a", "b")));
        assert_eq!(late.joined.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 2);

        registry.notify_presence(&PresenceEvent::AttendeeJoined(Attendee::new("a", "b")));
        assert_eq!(late.joined.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_shows_count() {
        let registry = ObserverRegistry::new();
        registry.add(Arc::new(JoinCounter::default()));
        assert_eq!(format!("{registry:?}"), "ObserverRegistry { observers: 1 }");
    }
}
