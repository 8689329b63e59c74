//! Integration tests for `SessionActor` and `SignalingClientHandle`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use signal_proto::signal::signal_frame;
use signaling_client::config::ConfigError;
use signaling_client::types::{SignalingClientStatusType, StartInfo};
use signaling_client::{
    ClientError, SessionActor, SessionState, SignalingClientHandle, SignalingObserver,
};
use signaling_test_utils::*;
use signaling_transport::TransportEvent;

const WAIT: Duration = Duration::from_secs(1);

fn spawn() -> (
    SignalingClientHandle,
    tokio::task::JoinHandle<()>,
    Arc<MockTransportFactory>,
    Arc<RecordingObserver>,
) {
    let factory = MockTransportFactory::new();
    let (handle, task) = SessionActor::spawn(random_client_config(), factory.clone());
    let recorder = RecordingObserver::new();
    handle.add_observer(recorder.clone());
    (handle, task, factory, recorder)
}

/// Poll until `condition` holds.
async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

/// Start the session and drive it to the started notification.
async fn start_session(
    handle: &SignalingClientHandle,
    factory: &MockTransportFactory,
    recorder: &RecordingObserver,
) {
    handle.start().unwrap();
    eventually(|| factory.created() == 1).await;
    factory.inject(TransportEvent::Connected);
    eventually(|| !factory.sent_of_type(signal_frame::Type::Join).is_empty()).await;
    factory.inject_frame(join_ack_frame(3600));
    factory.inject_frame(index_frame(vec![video_source("remote-1", 11, 1)]));
    tokio::time::timeout(
        WAIT,
        recorder.wait_for(|e| matches!(e, ObservedEvent::Started(_))),
    )
    .await
    .expect("session started");
}

#[tokio::test]
async fn test_full_join_through_handle() {
    let (handle, _task, factory, recorder) = spawn();

    start_session(&handle, &factory, &recorder).await;

    assert_eq!(handle.state().await.unwrap(), SessionState::Connected);
    let started = recorder.started();
    assert_eq!(started[0].sources.len(), 1);
}

#[tokio::test]
async fn test_send_updates_reports_result() {
    let (handle, _task, factory, recorder) = spawn();

    assert!(!handle.send_updates().await.unwrap());

    start_session(&handle, &factory, &recorder).await;
    handle.set_local_description(OFFER_AUDIO_VIDEO).unwrap();
    assert!(handle.send_updates().await.unwrap());
    assert_eq!(
        factory.sent_of_type(signal_frame::Type::Subscribe).len(),
        1
    );
}

#[tokio::test]
async fn test_commands_apply_in_order() {
    let (handle, _task, factory, recorder) = spawn();
    start_session(&handle, &factory, &recorder).await;

    handle.set_mute(true).unwrap();
    handle.set_mute(false).unwrap();
    handle.set_mute(true).unwrap();
    // Round trip so every command above has been applied
    handle.state().await.unwrap();

    let muted: Vec<Option<bool>> = factory
        .sent_of_type(signal_frame::Type::AudioControl)
        .into_iter()
        .map(|frame| frame.audio_control.unwrap().muted)
        .collect();
    assert_eq!(muted, vec![Some(true), Some(false), Some(true)]);
}

#[tokio::test]
async fn test_shutdown_notifies_and_ends_task() {
    let (handle, task, factory, recorder) = spawn();
    start_session(&handle, &factory, &recorder).await;

    handle.shutdown();

    tokio::time::timeout(WAIT, task)
        .await
        .expect("actor did not stop")
        .unwrap();
    assert!(handle.is_shutdown());
    let stopped = recorder.stopped();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].kind, SignalingClientStatusType::Ok);
    assert_eq!(factory.stops(), 1);
    assert!(matches!(handle.start(), Err(ClientError::ActorGone)));
}

#[tokio::test]
async fn test_shutdown_before_start_notifies_nothing() {
    let (handle, task, _factory, recorder) = spawn();

    handle.shutdown();

    tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_dropping_all_handles_ends_task() {
    let factory = MockTransportFactory::new();
    let (handle, task) = SessionActor::spawn(test_client_config(), factory);

    drop(handle);

    tokio::time::timeout(WAIT, task)
        .await
        .expect("actor did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_transport_error_reaches_observers() {
    let (handle, _task, factory, recorder) = spawn();
    start_session(&handle, &factory, &recorder).await;

    factory.inject(TransportEvent::Error(common::error::SignalingError::client_fatal(
        "Websocket read failed",
    )));

    let event = tokio::time::timeout(
        WAIT,
        recorder.wait_for(|e| matches!(e, ObservedEvent::Stopped(_))),
    )
    .await
    .unwrap();
    match event {
        ObservedEvent::Stopped(status) => {
            assert_eq!(status.kind, SignalingClientStatusType::ClientError);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(handle.state().await.unwrap(), SessionState::Disconnected);
}

/// Stops the session from inside the started callback.
#[derive(Default)]
struct StopOnStart {
    handle: OnceLock<SignalingClientHandle>,
}

impl SignalingObserver for StopOnStart {
    fn on_signaling_client_started(&self, _start_info: &StartInfo) {
        if let Some(handle) = self.handle.get() {
            handle.stop().unwrap();
        }
    }
}

#[tokio::test]
async fn test_stop_from_observer_callback() {
    let (handle, _task, factory, recorder) = spawn();
    let stopper = Arc::new(StopOnStart::default());
    stopper.handle.set(handle.clone()).ok();
    handle.add_observer(stopper);

    start_session(&handle, &factory, &recorder).await;

    eventually(|| !factory.sent_of_type(signal_frame::Type::Leave).is_empty()).await;
    assert_eq!(handle.state().await.unwrap(), SessionState::Disconnecting);
}

#[tokio::test]
async fn test_removed_observer_is_not_called() {
    let (handle, _task, factory, recorder) = spawn();
    let other = RecordingObserver::new();
    let other_dyn: Arc<dyn SignalingObserver> = other.clone();
    handle.add_observer(other_dyn.clone());
    assert!(handle.remove_observer(&other_dyn));

    start_session(&handle, &factory, &recorder).await;

    assert!(other.events().is_empty());
}

#[tokio::test]
async fn test_mailbox_counts_processed_commands() {
    let (handle, _task, _factory, _recorder) = spawn();

    handle.set_local_description("v=0\r\n").unwrap();
    handle.state().await.unwrap();

    assert_eq!(handle.mailbox().commands_handled(), 2);
    assert_eq!(handle.mailbox().queued(), 0);
}

#[tokio::test]
async fn test_spawn_from_vars_reports_missing_variable() {
    let vars = HashMap::from([("MEETING_ID".to_string(), "meeting-1".to_string())]);

    let result = SessionActor::spawn_from_vars(&vars);

    assert!(matches!(
        result,
        Err(ClientError::Config(ConfigError::MissingEnvVar(ref name))) if name == "ATTENDEE_ID"
    ));
}

#[tokio::test]
async fn test_spawn_from_vars_reports_invalid_value() {
    let vars = HashMap::from([
        ("MEETING_ID".to_string(), "meeting-1".to_string()),
        ("ATTENDEE_ID".to_string(), "attendee-1".to_string()),
        ("JOIN_TOKEN".to_string(), "join-token".to_string()),
        ("SIGNALING_URL".to_string(), TEST_SIGNALING_URL.to_string()),
        ("SIGNALING_MUTE_ON_JOIN".to_string(), "sometimes".to_string()),
    ]);

    let result = SessionActor::spawn_from_vars(&vars);

    assert!(matches!(
        result,
        Err(ClientError::Config(ConfigError::InvalidValue(_)))
    ));
}
