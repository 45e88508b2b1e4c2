use tracing::debug;

use crate::db;
use crate::models::{Cursor, DataPoint};
use crate::services::registry_service::{DatasetHandle, Registry};
use crate::utils::clock;
use crate::utils::ChartError;

/// Append and read access to the registered datasets
#[derive(Clone)]
pub struct DatasetStore {
    registry: Registry,
}

impl DatasetStore {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Append one point stamped with the next timestamp for the dataset
    ///
    /// Appends to the same dataset are serialized by its write lock.
    pub async fn append_point(
        &self,
        name: &str,
        label: &str,
        value: &str,
    ) -> Result<DataPoint, ChartError> {
        let handle = self.registry.handle(name).await?;
        let mut state = handle.state().write().await;
        if state.removed {
            return Err(ChartError::MissingDataset(name.to_string()));
        }

        let micros = clock::next_after(state.last_micros, clock::now_micros());
        let point = DataPoint {
            timestamp: clock::micros_to_secs(micros),
            label: label.to_string(),
            value: value.to_string(),
        };

        db::dataset::insert_point(self.registry.pool(), name, point.timestamp, label, value).await?;
        state.last_micros = Some(micros);

        debug!("Appended point {} to dataset {}", point.timestamp, name);
        Ok(point)
    }

    /// Every point of a dataset, oldest first
    pub async fn read_all(&self, name: &str) -> Result<Vec<DataPoint>, ChartError> {
        let handle = self.registry.handle(name).await?;
        self.read_handle(&handle, Cursor::START).await
    }

    /// Points strictly newer than the cursor, oldest first; empty means nothing new
    pub async fn read_since(&self, name: &str, cursor: Cursor) -> Result<Vec<DataPoint>, ChartError> {
        let handle = self.registry.handle(name).await?;
        self.read_handle(&handle, cursor).await
    }

    /// Read through an already resolved handle
    pub async fn read_handle(
        &self,
        handle: &DatasetHandle,
        cursor: Cursor,
    ) -> Result<Vec<DataPoint>, ChartError> {
        let state = handle.state().read().await;
        if state.removed {
            return Err(ChartError::MissingDataset(handle.name().to_string()));
        }

        let pool = self.registry.pool();
        let rows = if cursor.is_start() {
            db::dataset::select_all(pool, handle.name()).await?
        } else {
            db::dataset::select_since(pool, handle.name(), cursor.timestamp()).await?
        };
        drop(state);

        Ok(rows
            .into_iter()
            .map(|(timestamp, label, value)| DataPoint {
                timestamp,
                label,
                value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use std::collections::HashSet;

    async fn store_with(name: &str, labels: &[&str], values: &[&str]) -> DatasetStore {
        let registry = Registry::load(memory_pool().await).await.expect("load registry");
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        registry.create_dataset(name, &labels, &values).await.expect("create");
        DatasetStore::new(registry)
    }

    #[tokio::test]
    async fn test_append_then_read_all() {
        let store = store_with("cpu", &["t0", "t1"], &["10", "20"]).await;
        let appended = store.append_point("cpu", "t2", "30").await.expect("append");

        let points = store.read_all("cpu").await.expect("read");
        assert_eq!(points.len(), 3);
        assert_eq!(points.last(), Some(&appended));
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_read_since_is_exact_subset() {
        let store = store_with("cpu", &["a", "b", "c", "d"], &["1", "2", "3", "4"]).await;
        let all = store.read_all("cpu").await.expect("read all");

        for pivot in &all {
            let since = store
                .read_since("cpu", Cursor::at(pivot.timestamp))
                .await
                .expect("read since");
            let expected: Vec<DataPoint> = all
                .iter()
                .filter(|p| p.timestamp > pivot.timestamp)
                .cloned()
                .collect();
            assert_eq!(since, expected);
        }

        let last = all.last().map(|p| p.timestamp).expect("non-empty");
        assert!(store.read_since("cpu", Cursor::at(last)).await.expect("read").is_empty());
        assert_eq!(store.read_since("cpu", Cursor::START).await.expect("read"), all);
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let store = store_with("cpu", &[], &[]).await;
        assert!(matches!(
            store.append_point("mem", "t0", "1").await,
            Err(ChartError::MissingDataset(_))
        ));
        assert!(matches!(store.read_all("mem").await, Err(ChartError::MissingDataset(_))));
        assert!(matches!(
            store.read_since("mem", Cursor::START).await,
            Err(ChartError::MissingDataset(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_timestamps_unique() {
        let store = store_with("cpu", &[], &[]).await;

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append_point("cpu", &format!("t{}", i), &i.to_string())
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("join").expect("append");
        }

        let points = store.read_all("cpu").await.expect("read");
        assert_eq!(points.len(), 50);
        let unique: HashSet<u64> = points.iter().map(|p| p.timestamp.to_bits()).collect();
        assert_eq!(unique.len(), 50);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_handle_read_after_removal_reports_missing() {
        let store = store_with("cpu", &["t0"], &["1"]).await;
        let handle = store.registry().handle("cpu").await.expect("handle");
        store.registry().remove_dataset("cpu").await.expect("remove");

        let err = store
            .read_handle(&handle, Cursor::START)
            .await
            .expect_err("removed dataset");
        assert!(matches!(err, ChartError::MissingDataset(name) if name == "cpu"));
    }
}
