//! Per-recipient message delivery.
//!
//! A channel is nothing but a cursor: the highest message id already handed
//! to the consumer. Each tick sleeps for the fixed interval, asks the store
//! for messages above the cursor, advances the cursor to the largest id
//! returned and emits the batch in ascending id order. Within one channel a
//! message is therefore emitted exactly once; a fresh channel starts from the
//! store's current maximum unless it is explicitly resumed from an older id.

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use thiserror::Error;
use tracing::{debug, warn};

use chirp_db::Database;
use chirp_types::events::MessageNotification;
use chirp_types::models::display_name;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message store unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),

    #[error("poll task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct DeliveryChannel {
    db: Arc<Database>,
    recipient: i64,
    cursor: i64,
    interval: Duration,
}

async fn blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, ChannelError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
}

impl DeliveryChannel {
    /// Opens a channel positioned after every message already addressed to
    /// `recipient`.
    pub async fn open(
        db: Arc<Database>,
        recipient: i64,
        interval: Duration,
    ) -> Result<Self, ChannelError> {
        let cursor = blocking(&db, move |db| db.max_inbound_id(recipient)).await?;
        debug!("Delivery channel for user {} opened at cursor {}", recipient, cursor);
        Ok(Self::resume(db, recipient, cursor, interval))
    }

    /// Opens a channel that will re-deliver everything after `cursor`.
    pub fn resume(db: Arc<Database>, recipient: i64, cursor: i64, interval: Duration) -> Self {
        Self {
            db,
            recipient,
            cursor: cursor.max(0),
            interval,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// One store query, no wait. Returns the messages above the cursor and
    /// moves the cursor past them.
    pub async fn poll(&mut self) -> Result<Vec<MessageNotification>, ChannelError> {
        let (recipient, cursor) = (self.recipient, self.cursor);
        let rows = blocking(&self.db, move |db| db.inbound_since(recipient, cursor)).await?;

        if let Some(max_id) = rows.iter().map(|r| r.id).max() {
            self.cursor = max_id;
        }

        Ok(rows
            .into_iter()
            .map(|row| MessageNotification {
                message_id: row.id,
                sender_id: row.sender_id,
                sender: display_name(row.sender_id, row.sender_username.as_deref(), row.sender_deleted),
            })
            .collect())
    }

    /// Sleep for the interval, then poll.
    pub async fn tick(&mut self) -> Result<Vec<MessageNotification>, ChannelError> {
        tokio::time::sleep(self.interval).await;
        self.poll().await
    }

    /// The endless notification sequence. A store failure is yielded once and
    /// ends the stream. Dropping the stream drops the pending timer, so no
    /// polling outlives the consumer.
    pub fn into_stream(self) -> impl Stream<Item = Result<MessageNotification, ChannelError>> {
        let mut channel = self;
        async_stream::stream! {
            loop {
                match channel.tick().await {
                    Ok(batch) => {
                        for notification in batch {
                            yield Ok(notification);
                        }
                    }
                    Err(e) => {
                        warn!("Delivery channel for user {} stopping: {}", channel.recipient, e);
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_db::testutil::{temp_db, user};
    use futures_util::StreamExt;

    const T0: &str = "2024-01-01T10:00:00.000000+00:00";
    const FAST: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn delivers_each_new_message_once_in_order() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let old = t.db.insert_message(alice, bob, "before connect", T0).unwrap();

        let mut channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();
        assert_eq!(channel.cursor(), old);
        assert!(channel.poll().await.unwrap().is_empty());

        let sent: Vec<i64> = (0..5)
            .map(|i| t.db.insert_message(alice, bob, &format!("m{}", i), T0).unwrap())
            .collect();
        t.db.insert_message(bob, alice, "not for bob", T0).unwrap();

        let batch = channel.tick().await.unwrap();
        let ids: Vec<i64> = batch.iter().map(|n| n.message_id).collect();
        assert_eq!(ids, sent);
        assert!(batch.iter().all(|n| n.sender == "alice" && n.sender_id == alice));
        assert_eq!(channel.cursor(), sent[4]);

        assert!(channel.tick().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resume_redelivers_unobserved_messages() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let first = t.db.insert_message(alice, bob, "seen", T0).unwrap();
        let missed = t.db.insert_message(alice, bob, "missed", T0).unwrap();

        let mut channel = DeliveryChannel::resume(t.db.clone(), bob, first, FAST);
        let ids: Vec<i64> = channel.poll().await.unwrap().iter().map(|n| n.message_id).collect();
        assert_eq!(ids, vec![missed]);
    }

    #[tokio::test]
    async fn deleted_sender_is_labelled() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let mut channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();

        t.db.insert_message(alice, bob, "bye", T0).unwrap();
        t.db.soft_delete_user(alice).unwrap();

        let batch = channel.poll().await.unwrap();
        assert_eq!(batch[0].sender, format!("Deleted User [{}]", alice));
    }

    #[tokio::test]
    async fn stream_yields_messages_as_they_arrive() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();
        let mut stream = Box::pin(channel.into_stream());

        let m1 = t.db.insert_message(alice, bob, "one", T0).unwrap();
        let m2 = t.db.insert_message(alice, bob, "two", T0).unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap().message_id, m1);
        assert_eq!(stream.next().await.unwrap().unwrap().message_id, m2);
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_polling() {
        let t = temp_db();
        let alice = user(&t.db, "alice");
        let bob = user(&t.db, "bob");
        let channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();
        let mut stream = Box::pin(channel.into_stream());

        // Nothing to deliver, so the loop keeps ticking without yielding.
        assert!(tokio::time::timeout(FAST * 3, stream.next()).await.is_err());
        assert!(Arc::strong_count(&t.db) >= 2);

        drop(stream);
        t.db.insert_message(alice, bob, "after disconnect", T0).unwrap();
        tokio::time::sleep(FAST * 10).await;

        // Only the test still holds the store: no timer or poll survived.
        assert_eq!(Arc::strong_count(&t.db), 1);
    }

    #[tokio::test]
    async fn store_failure_ends_the_stream() {
        let t = temp_db();
        let bob = user(&t.db, "bob");
        let channel = DeliveryChannel::open(t.db.clone(), bob, FAST).await.unwrap();

        t.db.with_tx(|tx| {
            tx.execute_batch("DROP TABLE messages")?;
            Ok(())
        })
        .unwrap();

        let mut stream = Box::pin(channel.into_stream());
        assert!(matches!(
            stream.next().await,
            Some(Err(ChannelError::StoreUnavailable(_)))
        ));
        assert!(stream.next().await.is_none());
    }
}
