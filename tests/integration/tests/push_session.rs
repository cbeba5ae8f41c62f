//! End-to-end push session tests over the real WebSocket transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use wicket_push::{
    ConnectionTarget, ExecutionContext, PageLocation, PushError, ResponseProcessor,
    SessionConfig, SessionEvent, SocketSession, StepOutcome, Topic, WebSocketConnector,
    MESSAGE_CHANNEL,
};
use wicket_push_integration_tests::{init_tracing, spawn_server};

struct RecordingProcessor {
    calls: AtomicUsize,
    loaded: mpsc::UnboundedSender<String>,
    fail: bool,
}

impl RecordingProcessor {
    fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                loaded: tx,
                fail,
            }),
            rx,
        )
    }
}

impl ResponseProcessor for RecordingProcessor {
    fn load(&self, raw: &str, ctx: &mut ExecutionContext) -> wicket_push::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PushError::parse("unparseable envelope"));
        }
        let _ = self.loaded.send(raw.to_string());
        ctx.push_step(|_ctx| StepOutcome::Continue);
        Ok(())
    }
}

fn config_for(port: u16) -> (SessionConfig, PageLocation) {
    (
        SessionConfig {
            hostname: "127.0.0.1".to_string(),
            plain_port: port.to_string(),
            secure_port: String::new(),
            context_path: String::new(),
            filter_prefix: String::new(),
            session_id: "node0abc".to_string(),
            target: ConnectionTarget::Page {
                page_id: "3".to_string(),
            },
            context: None,
            base_url: "/".to_string(),
            app_name: "it-app".to_string(),
        },
        PageLocation::insecure(""),
    )
}

async fn wait_for_idle_lane(session: &SocketSession) {
    for _ in 0..100 {
        if !session.scheduler().is_busy(MESSAGE_CHANNEL) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("message lane never released");
}

#[tokio::test]
async fn test_server_receives_canonical_connect_url() {
    init_tracing();
    let server = spawn_server(vec![]).await;
    let (processor, _loaded) = RecordingProcessor::new(false);
    let session = SocketSession::new(processor);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    let path = timeout(Duration::from_secs(5), server.request_path)
        .await
        .expect("no upgrade request")
        .unwrap();
    assert_eq!(
        path,
        "/wicket/websocket;jsessionid=node0abc\
         ?pageId=3&wicket-ajax-baseurl=%2F&wicket-app-name=it-app"
    );

    session.close().await;
}

#[tokio::test]
async fn test_opened_and_application_message_delivered() {
    init_tracing();
    let server = spawn_server(vec!["stock tick 42".to_string()]).await;
    let (processor, _loaded) = RecordingProcessor::new(false);
    let session = SocketSession::new(processor);
    let mut opened = session.subscribe(Topic::Opened);
    let mut messages = session.subscribe(Topic::Message);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    assert!(matches!(opened.try_recv(), Ok(SessionEvent::Opened)));
    let event = timeout(Duration::from_secs(5), messages.recv())
        .await
        .expect("no message event")
        .unwrap();
    match event {
        SessionEvent::Message { text } => assert_eq!(text, "stock tick 42"),
        other => panic!("expected message event, got {other:?}"),
    }

    session.close().await;
}

#[tokio::test]
async fn test_envelope_processed_once_and_lane_released() {
    init_tracing();
    let envelope = "<ajax-response><evaluate>x</evaluate></ajax-response>".to_string();
    let server = spawn_server(vec![envelope.clone()]).await;
    let (processor, mut loaded) = RecordingProcessor::new(false);
    let session = SocketSession::new(Arc::clone(&processor) as Arc<dyn ResponseProcessor>);
    let mut messages = session.subscribe(Topic::Message);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    let raw = timeout(Duration::from_secs(5), loaded.recv())
        .await
        .expect("processor never invoked")
        .unwrap();
    assert_eq!(raw, envelope);
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);

    // The envelope must not leak out as an application message, and the
    // final step must have released the lane.
    wait_for_idle_lane(&session).await;
    assert!(messages.try_recv().is_err());

    session.close().await;
}

#[tokio::test]
async fn test_envelope_parse_failure_still_releases_lane() {
    init_tracing();
    let server = spawn_server(vec!["<ajax-response>garbage".to_string()]).await;
    let (processor, _loaded) = RecordingProcessor::new(true);
    let session = SocketSession::new(Arc::clone(&processor) as Arc<dyn ResponseProcessor>);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    for _ in 0..100 {
        if processor.calls.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    wait_for_idle_lane(&session).await;

    session.close().await;
}

#[tokio::test]
async fn test_send_reaches_server_and_empty_send_does_not() {
    init_tracing();
    let mut server = spawn_server(vec![]).await;
    let (processor, _loaded) = RecordingProcessor::new(false);
    let session = SocketSession::new(processor);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    assert!(matches!(session.send("").await, Err(PushError::EmptyMessage)));
    session.send("hello server").await.unwrap();

    let frame = timeout(Duration::from_secs(5), server.client_frames.recv())
        .await
        .expect("server saw no frame")
        .unwrap();
    assert_eq!(frame, "hello server");

    session.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent_over_real_transport() {
    init_tracing();
    let server = spawn_server(vec![]).await;
    let (processor, _loaded) = RecordingProcessor::new(false);
    let session = SocketSession::new(processor);
    let (config, page) = config_for(server.port);

    session
        .initialize(&config, &page, &WebSocketConnector)
        .await
        .unwrap();

    session.close().await;
    // Second close only logs; there is no handle left to close.
    session.close().await;
    assert!(matches!(session.send("x").await, Err(PushError::NotConnected)));
}
