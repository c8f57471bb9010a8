use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use quillsign_core::RealtimeEvent;

/// WebSocket subscriber for the hosted service's realtime stream.
///
/// Decodes insert frames for admin-authored ticket messages into
/// [`RealtimeEvent`]s and rebroadcasts them. Connection errors end the task;
/// the poll loop covers the gap until the next start.
pub struct RealtimeSubscriber {
    url: String,
    sender: broadcast::Sender<RealtimeEvent>,
}

impl RealtimeSubscriber {
    pub fn new(url: &str, sender: broadcast::Sender<RealtimeEvent>) -> Self {
        RealtimeSubscriber {
            url: url.to_string(),
            sender,
        }
    }

    /// Run the subscription loop. Should be spawned as a tokio task.
    pub async fn run(self) {
        let (mut ws, _) = match connect_async(self.url.as_str()).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("realtime connection to {} failed: {e}", self.url);
                return;
            }
        };
        tracing::info!("realtime stream connected: {}", self.url);

        while let Some(frame) = ws.next().await {
            let message = match frame {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("realtime stream error: {e}");
                    return;
                }
            };
            match message {
                Message::Text(text) => match serde_json::from_str::<RealtimeEvent>(text.as_str()) {
                    Ok(event) => {
                        // Send errors just mean no subscribers are connected.
                        let _ = self.sender.send(event);
                    }
                    Err(e) => {
                        tracing::debug!("ignoring unrecognized realtime frame: {e}");
                    }
                },
                Message::Close(_) => {
                    tracing::info!("realtime stream closed by server");
                    return;
                }
                _ => {}
            }
        }
    }
}
