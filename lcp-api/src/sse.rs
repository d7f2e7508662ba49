//! Server-sent event framing for the stream endpoint.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use lcp_cache::Subscription;

/// Comment frame keeping idle intermediaries from closing the connection.
pub const HEARTBEAT_FRAME: &str = ": heartbeat\n\n";

/// Tells the client how long to wait before reconnecting.
pub fn retry_frame(retry_ms: u64) -> String {
    format!("retry: {retry_ms}\n\n")
}

/// Wraps a payload as a `message` event; every payload line gets its own `data:`.
pub fn message_frame(payload: &str) -> String {
    let mut frame = String::with_capacity(payload.len() + 24);
    frame.push_str("event: message\n");
    for line in payload.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Body of one stream connection.
///
/// Starts with the retry directive, then interleaves heartbeats with
/// broadcast frames. Ends when the subscriber is dropped by the broadcaster
/// or the server starts closing. When the client disconnects the body is
/// dropped, which drops `subscription` and unregisters it.
pub fn event_stream(
    mut subscription: Subscription,
    mut closing: watch::Receiver<bool>,
    heartbeat: Duration,
    retry_ms: u64,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        yield Ok::<_, Infallible>(Bytes::from(retry_frame(retry_ms)));

        let mut ticker = tokio::time::interval_at(Instant::now() + heartbeat, heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *closing.borrow() {
                break;
            }

            let next = tokio::select! {
                _ = ticker.tick() => Some(Bytes::from_static(HEARTBEAT_FRAME.as_bytes())),
                frame = subscription.recv() => frame.map(|f| Bytes::from(message_frame(&f))),
                _ = closing.changed() => None,
            };

            match next {
                Some(bytes) => yield Ok(bytes),
                None => break,
            }
        }

        debug!(subscriber = subscription.id(), "Event stream closed");
    }
}
