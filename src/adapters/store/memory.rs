use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::DetectionStorePort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

struct Record {
    detections: Vec<Detection>,
    stored_at: Instant,
}

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, Record>,
    latest: Option<Uuid>,
}

/// Request-id keyed results with TTL expiry and a capacity bound.
pub struct InMemoryDetectionStore {
    inner: RwLock<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl InMemoryDetectionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { inner: RwLock::new(Inner::default()), ttl, capacity: capacity.max(1) }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, record: &Record, now: Instant) -> bool {
        now.duration_since(record.stored_at) >= self.ttl
    }

    fn live<'a>(&self, inner: &'a Inner, id: &Uuid) -> Option<&'a Record> {
        inner.records.get(id).filter(|r| !self.expired(r, Instant::now()))
    }
}

fn poisoned() -> DomainError {
    DomainError::OperationFailed("detection store lock poisoned".into())
}

#[async_trait]
impl DetectionStorePort for InMemoryDetectionStore {
    async fn record(&self, request_id: Uuid, detections: Vec<Detection>) -> DomainResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let now = Instant::now();

        let before = inner.records.len();
        inner.records.retain(|_, r| now.duration_since(r.stored_at) < self.ttl);

        while inner.records.len() >= self.capacity {
            let oldest = inner
                .records
                .iter()
                .min_by_key(|(_, r)| r.stored_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    inner.records.remove(&id);
                }
                None => break,
            }
        }
        if inner.records.len() < before {
            debug!(evicted = before - inner.records.len(), "pruned detection records");
        }

        inner.records.insert(request_id, Record { detections, stored_at: now });
        inner.latest = Some(request_id);
        Ok(())
    }

    async fn latest(&self) -> DomainResult<Vec<Detection>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .latest
            .as_ref()
            .and_then(|id| self.live(&inner, id))
            .map(|r| r.detections.clone())
            .unwrap_or_default())
    }

    async fn get(&self, request_id: &Uuid) -> DomainResult<Option<Vec<Detection>>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(self.live(&inner, request_id).map(|r| r.detections.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dets(label: &str) -> Vec<Detection> {
        vec![Detection {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            score: 0.5,
            class_id: 0,
            label: label.into(),
        }]
    }

    #[tokio::test]
    async fn empty_store_has_no_latest() {
        let store = InMemoryDetectionStore::new(Duration::from_secs(60), 8);
        assert!(store.latest().await.unwrap().is_empty());
        assert!(store.get(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_wins_but_keyed_reads_are_stable() {
        let store = InMemoryDetectionStore::new(Duration::from_secs(60), 8);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.record(a, dets("bottle")).await.unwrap();
        store.record(b, dets("net")).await.unwrap();

        assert_eq!(store.latest().await.unwrap()[0].label, "net");
        assert_eq!(store.get(&a).await.unwrap().unwrap()[0].label, "bottle");
    }

    #[tokio::test]
    async fn records_expire() {
        let store = InMemoryDetectionStore::new(Duration::ZERO, 8);
        let id = Uuid::new_v4();
        store.record(id, dets("bottle")).await.unwrap();
        assert!(store.latest().await.unwrap().is_empty());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let store = InMemoryDetectionStore::new(Duration::from_secs(60), 2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.record(*id, dets("bottle")).await.unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(store.len(), 2);
        assert!(store.get(&ids[0]).await.unwrap().is_none());
        assert!(store.get(&ids[2]).await.unwrap().is_some());
    }
}
