//! Loopback tests for the WebSocket transport.

use futures_util::{SinkExt, StreamExt};
use parlor_transport::{Connection, Transport, WebSocketTransport};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn bind_local() -> (WebSocketTransport, String) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = transport.local_addr().expect("local addr");
    (transport, format!("ws://{addr}"))
}

#[tokio::test]
async fn test_accept_and_receive_binary() {
    let (mut transport, url) = bind_local().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = connect_async(url).await.expect("connect");
        ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let conn = transport.accept().await.expect("accept");
    let data = conn.recv().await.expect("recv").expect("open");
    assert_eq!(data, vec![1, 2, 3]);
    // Clean close surfaces as None.
    assert!(conn.recv().await.expect("recv").is_none());

    client.await.unwrap();
}

#[tokio::test]
async fn test_text_frames_arrive_as_bytes() {
    let (mut transport, url) = bind_local().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = connect_async(url).await.expect("connect");
        ws.send(Message::Text("{\"seq\":1}".into())).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let conn = transport.accept().await.expect("accept");
    let data = conn.recv().await.expect("recv").expect("open");
    assert_eq!(data, b"{\"seq\":1}");

    client.await.unwrap();
}

#[tokio::test]
async fn test_send_while_receive_is_parked() {
    // The split halves must allow a push while recv is waiting — the
    // server-push model depends on it.
    let (mut transport, url) = bind_local().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = connect_async(url).await.expect("connect");
        // Wait for the server's unsolicited push, then answer.
        let msg = ws.next().await.expect("frame").expect("ok");
        assert_eq!(msg.into_data(), vec![9u8]);
        ws.send(Message::Binary(vec![7].into())).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let conn = std::sync::Arc::new(transport.accept().await.expect("accept"));

    // Park a receiver, then push from another task.
    let recv_conn = std::sync::Arc::clone(&conn);
    let receiver = tokio::spawn(async move { recv_conn.recv().await });

    conn.send(&[9]).await.expect("push while recv parked");

    let received = receiver.await.unwrap().expect("recv").expect("open");
    assert_eq!(received, vec![7]);

    client.await.unwrap();
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (mut transport, url) = bind_local().await;

    let url2 = url.clone();
    let clients = tokio::spawn(async move {
        let (_a, _) = connect_async(url).await.expect("connect a");
        let (_b, _) = connect_async(url2).await.expect("connect b");
        // Hold both open until the server has accepted them.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    });

    let a = transport.accept().await.expect("accept a");
    let b = transport.accept().await.expect("accept b");
    assert_ne!(a.id(), b.id());

    clients.await.unwrap();
}
