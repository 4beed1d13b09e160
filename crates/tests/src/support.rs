//! Shared helpers: a stand-in CueStack server and polling utilities

use audiotrigger_core::domain::config::SinkConfig;
use audiotrigger_core::domain::cue::CueSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

pub const WAIT: Duration = Duration::from_secs(5);

/// Behaviour of the fake automation service per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Keep every connection open and reply OK to each message
    KeepOpen,
    /// Close each connection right after the first message
    CloseAfterFirst,
}

/// Minimal CueStack stand-in recording every text frame it receives
pub struct FakeCueStack {
    pub addr: SocketAddr,
    pub received: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl FakeCueStack {
    pub async fn start(mode: ServerMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener, mode)
    }

    /// Serve on an already bound listener
    pub fn serve(listener: TcpListener, mode: ServerMode) -> Self {
        let addr = listener.local_addr().unwrap();
        let (tx, received) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(message)) = ws.next().await {
                        if let Message::Text(text) = message {
                            let _ = tx.send(text);
                            if mode == ServerMode::CloseAfterFirst {
                                let _ = ws.close(None).await;
                                return;
                            }
                            let _ = ws
                                .send(Message::Text(r#"{"status": "OK"}"#.to_string()))
                                .await;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            received,
            task,
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            reconnect_delay_ms: 300,
            connect_timeout_ms: 1000,
        }
    }

    /// Next received message, failing the test after [`WAIT`]
    pub async fn next_message(&mut self) -> String {
        tokio::time::timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a cue")
            .expect("fake CueStack stopped")
    }

    /// Nothing else arrives within `window`
    pub async fn assert_silent(&mut self, window: Duration) {
        if let Ok(Some(message)) = tokio::time::timeout(window, self.received.recv()).await {
            panic!("unexpected message: {}", message);
        }
    }
}

impl Drop for FakeCueStack {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll until the sink reports the wanted connection state
pub async fn wait_for_connection<S: CueSink>(sink: &S, connected: bool) {
    tokio::time::timeout(WAIT, async {
        while sink.is_connected() != connected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connection state never changed");
}
