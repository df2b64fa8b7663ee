//! Integration tests for the WebSocket client transport.
//!
//! Each test runs a real tokio-tungstenite server on an ephemeral port so
//! the slicing, reassembly, and lifecycle code is exercised against an
//! independent WebSocket implementation.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use archlink_transport::{
        CallbackTransport, Connection, ConnectionState, ForeignCallbacks,
        Transport, TransportConfig, TransportError, TransportHandler,
        WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    #[derive(Debug, PartialEq)]
    enum Event {
        Open,
        Close,
        Error(String),
        Message(String),
    }

    /// Forwards every transport event into a channel the test can await.
    struct ChannelHandler(mpsc::UnboundedSender<Event>);

    impl TransportHandler for ChannelHandler {
        fn on_open(&self) {
            let _ = self.0.send(Event::Open);
        }
        fn on_close(&self) {
            let _ = self.0.send(Event::Close);
        }
        fn on_error(&self, error: &TransportError) {
            let _ = self.0.send(Event::Error(error.to_string()));
        }
        fn on_message(&self, message: &str) {
            let _ = self.0.send(Event::Message(message.to_owned()));
        }
    }

    /// Binds a listener on a random port; the returned task yields the
    /// server side of the first accepted WebSocket.
    async fn start_server() -> (String, tokio::task::JoinHandle<ServerWs>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio_tungstenite::accept_async(stream).await.unwrap()
        });
        (format!("ws://{addr}"), handle)
    }

    fn transport(chunk_size: usize) -> WebSocketTransport {
        WebSocketTransport::new(&TransportConfig {
            chunk_size,
            ..TransportConfig::default()
        })
        .expect("valid config")
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event should arrive")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_chunked_send_arrives_as_one_message() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = transport(8)
            .connect(&url, Arc::new(ChannelHandler(tx)))
            .await
            .expect("should connect");
        let mut server_ws = server.await.unwrap();

        assert_eq!(next_event(&mut rx).await, Event::Open);
        assert_eq!(conn.state(), ConnectionState::Open);

        let payload = r#"[{"cmd":"Say","text":"a message well over eight bytes"}]"#;
        conn.send(payload).await.expect("send should succeed");

        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), payload);
    }

    #[tokio::test]
    async fn test_server_message_is_delivered_to_handler() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _conn = transport(1024)
            .connect(&url, Arc::new(ChannelHandler(tx)))
            .await
            .unwrap();
        let mut server_ws = server.await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Open);

        server_ws
            .send(Message::text(r#"[{"cmd":"Bounced"}]"#))
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            Event::Message(r#"[{"cmd":"Bounced"}]"#.into())
        );
    }

    #[tokio::test]
    async fn test_oversized_message_is_reported_and_connection_survives() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = WebSocketTransport::new(&TransportConfig {
            max_message_size: 16,
            ..TransportConfig::default()
        })
        .unwrap();
        let conn = transport
            .connect(&url, Arc::new(ChannelHandler(tx)))
            .await
            .unwrap();
        let mut server_ws = server.await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Open);

        server_ws
            .send(Message::text(r#"[{"cmd":"Say","text":"too long"}]"#))
            .await
            .unwrap();
        server_ws.send(Message::text("[]")).await.unwrap();

        assert!(matches!(next_event(&mut rx).await, Event::Error(e) if e.contains("16 byte limit")));
        assert_eq!(next_event(&mut rx).await, Event::Message("[]".into()));
        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_concurrent_sends_never_interleave() {
        let (url, server) = start_server().await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Arc::new(
            transport(16)
                .connect(&url, Arc::new(ChannelHandler(tx)))
                .await
                .unwrap(),
        );
        let mut server_ws = server.await.unwrap();

        let a = "a".repeat(4096);
        let b = "b".repeat(4096);
        let send_a = {
            let conn = Arc::clone(&conn);
            let a = a.clone();
            tokio::spawn(async move { conn.send(&a).await })
        };
        let send_b = {
            let conn = Arc::clone(&conn);
            let b = b.clone();
            tokio::spawn(async move { conn.send(&b).await })
        };
        send_a.await.unwrap().unwrap();
        send_b.await.unwrap().unwrap();

        // Interleaved continuation frames would be a protocol error on the
        // server side, so two clean text messages prove the ordering.
        let mut received = Vec::new();
        for _ in 0..2 {
            let msg = server_ws.next().await.unwrap().expect("valid frames");
            received.push(msg.into_text().unwrap().to_string());
        }
        received.sort();
        assert_eq!(received, vec![a, b]);
    }

    #[tokio::test]
    async fn test_send_after_close_fails_with_connection_closed() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = transport(1024)
            .connect(&url, Arc::new(ChannelHandler(tx)))
            .await
            .unwrap();
        let mut server_ws = server.await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Open);

        conn.close().await.expect("close should succeed");
        assert!(matches!(
            conn.send("[]").await,
            Err(TransportError::ConnectionClosed(_))
        ));
        assert!(matches!(
            conn.close().await,
            Err(TransportError::ConnectionClosed(_))
        ));

        // Drive the server so it answers the close handshake.
        while let Some(Ok(_)) = server_ws.next().await {}

        assert_eq!(next_event(&mut rx).await, Event::Close);
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_peer_close_emits_exactly_one_close_event() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = transport(1024)
            .connect(&url, Arc::new(ChannelHandler(tx)))
            .await
            .unwrap();
        let mut server_ws = server.await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Open);

        server_ws.close(None).await.unwrap();

        assert_eq!(next_event(&mut rx).await, Event::Close);
        assert_eq!(conn.state(), ConnectionState::Closed);

        // Nothing else should follow the close event.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = transport(1024)
            .connect(&format!("ws://{addr}"), Arc::new(ChannelHandler(tx)))
            .await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn test_callback_transport_delivers_messages_and_close() {
        let (url, server) = start_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (open, message, close) = (tx.clone(), tx.clone(), tx);
        let callbacks = ForeignCallbacks::new()
            .on_open(move || {
                let _ = open.send(Event::Open);
            })
            .on_message(move |m| {
                let _ = message.send(Event::Message(m));
            })
            .on_close(move || {
                let _ = close.send(Event::Close);
            });

        let (_conn, bridge) = CallbackTransport::new(transport(1024))
            .connect(&url, callbacks)
            .await
            .unwrap();
        let mut server_ws = server.await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Open);
        assert_eq!(bridge.state(), ConnectionState::Open);

        server_ws.send(Message::text("[]")).await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Message("[]".into()));

        server_ws.close(None).await.unwrap();
        assert_eq!(next_event(&mut rx).await, Event::Close);
        assert_eq!(bridge.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_callback_transport_reports_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let callbacks = ForeignCallbacks::new().on_error(move |payload| {
            let _ = tx.send(Event::Error(payload.message));
        });
        let result = CallbackTransport::new(transport(1024))
            .connect(&format!("ws://{addr}"), callbacks)
            .await;

        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
        match next_event(&mut rx).await {
            Event::Error(message) => assert!(message.starts_with("connect failed")),
            other => panic!("expected an error event, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let result = WebSocketTransport::new(&TransportConfig {
            chunk_size: 0,
            ..TransportConfig::default()
        });
        assert!(matches!(result, Err(TransportError::InvalidConfig(_))));
    }
}
