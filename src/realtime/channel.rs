use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::{ChannelOptions, ConnectionState, ReconnectPolicy};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Received frames, oldest first, bounded by the retention limit.
struct Inbox {
    frames: Mutex<VecDeque<String>>,
    capacity: Option<usize>,
    evicted: AtomicU64,
    received: watch::Sender<u64>,
}

impl Inbox {
    fn new(capacity: Option<usize>) -> Self {
        let (received, _) = watch::channel(0);
        Self {
            frames: Mutex::new(VecDeque::new()),
            capacity: capacity.filter(|c| *c > 0),
            evicted: AtomicU64::new(0),
            received,
        }
    }

    fn push(&self, frame: String) {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(capacity) = self.capacity {
            while frames.len() >= capacity {
                frames.pop_front();
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
        frames.push_back(frame);
        // Bumped under the lock so the total always matches the buffer.
        self.received.send_modify(|total| *total += 1);
    }

    fn snapshot(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn since(&self, seen: u64) -> Vec<String> {
        self.since_with_total(seen).0
    }

    /// Frames after `seen` together with the total they bring the reader to.
    /// Both are read under the frames lock, which `push` also holds.
    fn since_with_total(&self, seen: u64) -> (Vec<String>, u64) {
        let frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        let total = *self.received.borrow();
        let fresh = usize::try_from(total.saturating_sub(seen)).unwrap_or(usize::MAX);
        let skip = frames.len().saturating_sub(fresh);
        (frames.iter().skip(skip).cloned().collect(), total)
    }
}

/// Handle to one logical real-time channel.
///
/// Dropping the handle tears the socket down; frames still waiting to be
/// written are discarded.
pub struct Channel {
    endpoint: String,
    state: watch::Receiver<ConnectionState>,
    inbox: Arc<Inbox>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("received", &self.received_total())
            .finish()
    }
}

impl Channel {
    /// Open a channel to `endpoint`, authenticating with `credential`.
    ///
    /// Returns immediately; the handshake runs on a background task, so this
    /// must be called inside a tokio runtime. Without a credential no socket
    /// is attempted and the channel stays `Closed`.
    pub fn open(endpoint: &Url, credential: Option<&str>, options: ChannelOptions) -> Self {
        let inbox = Arc::new(Inbox::new(options.retention));
        let cancel = CancellationToken::new();
        // Logged without the query string so the credential never shows up.
        let label = endpoint.path().to_string();

        let Some(credential) = credential.filter(|c| !c.is_empty()) else {
            debug!(
                name: "realtime.channel.skipped",
                endpoint = %label,
                "No credential; channel left closed"
            );
            let (_, state) = watch::channel(ConnectionState::Closed);
            return Self {
                endpoint: label,
                state,
                inbox,
                outbound: None,
                cancel,
                task: None,
            };
        };

        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("token", credential);

        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(
            url,
            label.clone(),
            state_tx,
            Arc::clone(&inbox),
            outbound_rx,
            cancel.clone(),
            options.reconnect,
        ));

        Self {
            endpoint: label,
            state,
            inbox,
            outbound: Some(outbound),
            cancel,
            task: Some(task),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the state satisfies `predicate` and return it.
    ///
    /// Returns the current state if the channel can no longer change.
    pub async fn wait_until<F>(&self, mut predicate: F) -> ConnectionState
    where
        F: FnMut(ConnectionState) -> bool,
    {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| predicate(*s)).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    /// Stream of state changes, starting with the current state.
    pub fn state_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.state.clone())
    }

    /// Send a text frame.
    ///
    /// Only acts while the channel is `Open`; otherwise the payload is
    /// silently dropped.
    pub fn send(&self, payload: impl Into<String>) {
        if self.state() != ConnectionState::Open {
            debug!(
                name: "realtime.send.dropped",
                endpoint = %self.endpoint,
                state = ?self.state(),
                "Channel not open; frame dropped"
            );
            return;
        }
        if let Some(outbound) = &self.outbound {
            // The socket task may have just exited; the frame is dropped then.
            let _ = outbound.send(payload.into());
        }
    }

    /// Frames currently retained, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.inbox.snapshot()
    }

    /// Frames that arrived after the first `seen` (as counted by
    /// [`received_total`](Self::received_total)) and are still retained.
    pub fn messages_since(&self, seen: u64) -> Vec<String> {
        self.inbox.since(seen)
    }

    /// Like [`messages_since`](Self::messages_since), but also returns the
    /// count to pass as `seen` next time. Readers that poll should use this
    /// so no frame is returned twice.
    pub fn messages_since_with_total(&self, seen: u64) -> (Vec<String>, u64) {
        self.inbox.since_with_total(seen)
    }

    /// Whether the background socket task has stopped for good. A channel
    /// that never had a credential counts as finished.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Frames received over the channel's lifetime, evicted ones included.
    pub fn received_total(&self) -> u64 {
        *self.inbox.received.borrow()
    }

    /// Frames dropped by the retention limit.
    pub fn evicted(&self) -> u64 {
        self.inbox.evicted.load(Ordering::Relaxed)
    }

    /// Wait until at least `total` frames have been received.
    pub async fn wait_for_total(&self, total: u64) -> u64 {
        let mut rx = self.inbox.received.subscribe();
        match rx.wait_for(|n| *n >= total).await {
            Ok(n) => *n,
            Err(_) => self.received_total(),
        }
    }

    /// Tear the channel down and wait for the socket to be released.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        self.outbound = None;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    url: Url,
    label: String,
    state: watch::Sender<ConnectionState>,
    inbox: Arc<Inbox>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    policy: ReconnectPolicy,
) {
    let mut attempt = 0u32;

    loop {
        state.send_replace(ConnectionState::Connecting);

        let connected = tokio::select! {
            () = cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((socket, _)) => {
                attempt = 0;
                // Frames submitted while the channel was not open are not queued.
                while outbound.try_recv().is_ok() {}
                state.send_replace(ConnectionState::Open);
                info!(name: "realtime.channel.opened", endpoint = %label, "Channel open");

                let ended = pump(socket, &label, &inbox, &mut outbound, &cancel).await;
                state.send_replace(ended);
                info!(
                    name: "realtime.channel.ended",
                    endpoint = %label,
                    state = ?ended,
                    "Channel ended"
                );
            }
            Err(e) => {
                warn!(
                    name: "realtime.channel.failed",
                    endpoint = %label,
                    error = %e,
                    "Channel connection failed"
                );
                state.send_replace(ConnectionState::Error);
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        let Some(delay) = policy.delay_for(attempt) else {
            break;
        };
        attempt += 1;
        info!(
            name: "realtime.channel.reconnecting",
            endpoint = %label,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Reconnecting"
        );
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    if cancel.is_cancelled() {
        state.send_replace(ConnectionState::Closed);
    }
}

/// Shuttle frames until the socket ends; returns the resulting state.
async fn pump(
    socket: Socket,
    label: &str,
    inbox: &Inbox,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) -> ConnectionState {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return ConnectionState::Closed;
            }
            next = outbound.recv() => match next {
                Some(payload) => {
                    if let Err(e) = sink.send(WsMessage::Text(payload)).await {
                        warn!(name: "realtime.send.failed", endpoint = %label, error = %e, "Send failed");
                        return ConnectionState::Error;
                    }
                }
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return ConnectionState::Closed;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => inbox.push(text),
                Some(Ok(WsMessage::Binary(bytes))) => {
                    inbox.push(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(WsMessage::Close(_))) | None => return ConnectionState::Closed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(name: "realtime.receive.failed", endpoint = %label, error = %e, "Receive failed");
                    return ConnectionState::Error;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_evicts_oldest() {
        let inbox = Inbox::new(Some(2));
        inbox.push("a".into());
        inbox.push("b".into());
        inbox.push("c".into());
        assert_eq!(inbox.snapshot(), vec!["b", "c"]);
        assert_eq!(inbox.evicted.load(Ordering::Relaxed), 1);
        assert_eq!(*inbox.received.borrow(), 3);
    }

    #[test]
    fn test_inbox_since_skips_seen_frames() {
        let inbox = Inbox::new(None);
        for frame in ["a", "b", "c"] {
            inbox.push(frame.into());
        }
        assert_eq!(inbox.since(1), vec!["b", "c"]);
        assert!(inbox.since(3).is_empty());
    }

    #[test]
    fn test_inbox_since_after_eviction() {
        let inbox = Inbox::new(Some(2));
        for frame in ["a", "b", "c", "d"] {
            inbox.push(frame.into());
        }
        // Frames 2..4 were "c" and "d"; "b" is already gone.
        assert_eq!(inbox.since(1), vec!["c", "d"]);
    }

    #[test]
    fn test_inbox_polling_reader_sees_each_frame_once() {
        let inbox = Inbox::new(None);
        let mut printed = Vec::new();
        let mut seen = 0;

        inbox.push("a".into());
        // "b" arrives between the reader noticing "a" and reading the inbox.
        inbox.push("b".into());
        let (frames, total) = inbox.since_with_total(seen);
        printed.extend(frames);
        seen = total;

        let (frames, total) = inbox.since_with_total(seen);
        printed.extend(frames);
        assert_eq!(printed, vec!["a", "b"]);
        assert_eq!(total, 2);

        inbox.push("c".into());
        let (frames, total) = inbox.since_with_total(seen);
        assert_eq!(frames, vec!["c"]);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_channel_without_credential_stays_closed() {
        let endpoint = Url::parse("ws://127.0.0.1:9/ws/chat").unwrap();
        let channel = Channel::open(&endpoint, None, ChannelOptions::default());

        assert_eq!(channel.state(), ConnectionState::Closed);
        channel.send("ignored");
        assert!(channel.messages().is_empty());
        assert!(channel.is_finished());
        assert_eq!(channel.wait_until(|s| s == ConnectionState::Open).await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_ends_in_error() {
        // Port 9 (discard) is closed on test machines; the connect is refused.
        let endpoint = Url::parse("ws://127.0.0.1:9/ws/chat").unwrap();
        let channel = Channel::open(&endpoint, Some("tok"), ChannelOptions::default());

        let state = channel
            .wait_until(|s| matches!(s, ConnectionState::Error | ConnectionState::Closed))
            .await;
        assert_eq!(state, ConnectionState::Error);
        channel.send("dropped");
        assert_eq!(channel.received_total(), 0);
    }
}
