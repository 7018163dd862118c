use std::collections::HashMap;
use std::time::{Duration, Instant};

use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;

/// Default entry lifetime; support usually answers well within a week.
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_CAPACITY: usize = 4096;

/// Where a forwarded message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub chat: ChatId,
    /// Id of the user's original message in their own chat, used to thread
    /// the support answer as a reply on the return path.
    pub message_id: MessageId,
}

struct Entry {
    origin: Origin,
    inserted_at: Instant,
}

/// Bounded map from a forwarded message id (in the support chat) back to
/// the originating user chat.
///
/// Expired entries are swept on insert; when the map is still full after
/// the sweep, the oldest entries are evicted. No background task. A miss
/// is not fatal: the router falls back to the identity tag embedded in the
/// forwarded text.
pub struct ReplyMap {
    inner: Mutex<HashMap<MessageId, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl ReplyMap {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    pub async fn record(&self, forwarded: MessageId, origin: Origin) {
        let mut map = self.inner.lock().await;

        let ttl = self.ttl;
        map.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        while map.len() >= self.capacity {
            let oldest = map
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => map.remove(&id),
                None => break,
            };
        }

        map.insert(
            forwarded,
            Entry {
                origin,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn resolve(&self, forwarded: MessageId) -> Option<Origin> {
        let map = self.inner.lock().await;
        map.get(&forwarded)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.origin)
    }
}

impl Default for ReplyMap {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(chat: i64, message: i32) -> Origin {
        Origin {
            chat: ChatId(chat),
            message_id: MessageId(message),
        }
    }

    #[tokio::test]
    async fn records_and_resolves() {
        let map = ReplyMap::default();
        map.record(MessageId(10), origin(1001, 1)).await;

        assert_eq!(map.resolve(MessageId(10)).await, Some(origin(1001, 1)));
        assert_eq!(map.resolve(MessageId(11)).await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_resolved() {
        let map = ReplyMap::new(Duration::from_millis(5), 16);
        map.record(MessageId(10), origin(1001, 1)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(map.resolve(MessageId(10)).await, None);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest_first() {
        let map = ReplyMap::new(Duration::from_secs(60), 2);

        map.record(MessageId(1), origin(100, 1)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        map.record(MessageId(2), origin(200, 2)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        map.record(MessageId(3), origin(300, 3)).await;

        assert_eq!(map.resolve(MessageId(1)).await, None);
        assert_eq!(map.resolve(MessageId(2)).await, Some(origin(200, 2)));
        assert_eq!(map.resolve(MessageId(3)).await, Some(origin(300, 3)));
    }

    #[tokio::test]
    async fn sweep_makes_room_before_evicting_live_entries() {
        let map = ReplyMap::new(Duration::from_millis(5), 2);

        map.record(MessageId(1), origin(100, 1)).await;
        map.record(MessageId(2), origin(200, 2)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        map.record(MessageId(3), origin(300, 3)).await;
        assert_eq!(map.resolve(MessageId(3)).await, Some(origin(300, 3)));
    }
}
