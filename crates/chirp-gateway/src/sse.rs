use std::convert::Infallible;

use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use tracing::warn;

use crate::channel::DeliveryChannel;

/// Header a reconnecting EventSource sends with the last id it saw.
const LAST_EVENT_ID: &str = "last-event-id";

/// Resume point requested by a reconnecting client, if any.
pub fn last_event_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(LAST_EVENT_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Serve a delivery channel as Server-Sent Events.
///
/// Every notification becomes one event whose id is the message id, so the
/// browser's automatic reconnect carries the resume point. A channel failure
/// is reported as a final `error` event, after which the stream ends.
pub fn event_stream(channel: DeliveryChannel) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = channel.into_stream().map(|item| {
        let event = match item {
            Ok(notification) => match serde_json::to_string(&notification) {
                Ok(json) => Event::default()
                    .id(notification.message_id.to_string())
                    .data(json),
                Err(e) => {
                    warn!("Failed to encode notification {}: {}", notification.message_id, e);
                    Event::default().event("error").data("encoding failed")
                }
            },
            Err(_) => Event::default().event("error").data("store unavailable"),
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use chirp_db::testutil::{temp_db, user};
    use http_body_util::BodyExt;
    use std::time::Duration;

    const T0: &str = "2024-01-01T10:00:00.000000+00:00";
    const FAST: Duration = Duration::from_millis(10);

    /// Next SSE frame as text, or `None` once the body has ended.
    async fn next_frame(body: &mut Body) -> Option<String> {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("no frame within 5s")?
            .unwrap();
        Some(String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap())
    }

    #[tokio::test]
    async fn events_carry_the_message_id() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let m1 = t.db.insert_message(alice, bob, "one", T0).unwrap();
        let m2 = t.db.insert_message(alice, bob, "two", T0).unwrap();

        let channel = DeliveryChannel::resume(t.db.clone(), bob, 0, FAST);
        let mut body = event_stream(channel).into_response().into_body();

        for expected in [m1, m2] {
            let frame = next_frame(&mut body).await.unwrap();
            assert!(frame.contains(&format!("id: {}\n", expected)), "{}", frame);
            assert!(frame.contains(&format!("\"message_id\":{}", expected)), "{}", frame);
            assert!(frame.contains("\"sender\":\"alice\""), "{}", frame);
            assert!(!frame.contains("event: error"), "{}", frame);
        }
    }

    #[tokio::test]
    async fn store_failure_sends_one_error_event_then_ends() {
        let t = temp_db();
        let bob = user(&t.db, "bob");
        let channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();
        let mut body = event_stream(channel).into_response().into_body();

        t.db.with_tx(|tx| {
            tx.execute_batch("DROP TABLE messages")?;
            Ok(())
        })
        .unwrap();

        let frame = next_frame(&mut body).await.unwrap();
        assert!(frame.contains("event: error\n"), "{}", frame);
        assert!(frame.contains("data: store unavailable\n"), "{}", frame);
        assert!(next_frame(&mut body).await.is_none());
    }

    #[test]
    fn parses_resume_point() {
        let mut headers = HeaderMap::new();
        assert_eq!(last_event_id(&headers), None);

        headers.insert(LAST_EVENT_ID, HeaderValue::from_static("42"));
        assert_eq!(last_event_id(&headers), Some(42));

        headers.insert(LAST_EVENT_ID, HeaderValue::from_static("abc"));
        assert_eq!(last_event_id(&headers), None);
    }
}
