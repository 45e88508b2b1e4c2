//! Dataset registry and lifecycle
//!
//! Maps dataset names to their storage handles. Creation and removal are the
//! only structural changes and go through the registry lock; appends and
//! reads only take the lock of the dataset they touch.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::db;
use crate::models::DataPoint;
use crate::utils::clock;
use crate::utils::names::validate_dataset_name;
use crate::utils::ChartError;

/// Mutable per-dataset state, guarded by the dataset's own lock
#[derive(Debug, Default)]
pub struct HandleState {
    /// Last timestamp issued for this dataset, in microseconds
    pub last_micros: Option<i64>,
    /// Set once the table has been dropped
    pub removed: bool,
}

/// Storage handle for one dataset
#[derive(Debug)]
pub struct DatasetHandle {
    name: String,
    state: RwLock<HandleState>,
}

impl DatasetHandle {
    fn new(name: &str, last_micros: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(HandleState {
                last_micros,
                removed: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writers (appends, removal) take the write side, readers the read side
    pub fn state(&self) -> &RwLock<HandleState> {
        &self.state
    }
}

#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
    datasets: Arc<RwLock<HashMap<String, Arc<DatasetHandle>>>>,
}

impl Registry {
    /// Rebuild the registry from the tables already present in storage
    pub async fn load(pool: SqlitePool) -> Result<Self, ChartError> {
        let mut datasets = HashMap::new();

        for name in db::dataset::list_datasets(&pool).await? {
            let last_micros = db::dataset::latest_timestamp(&pool, &name)
                .await?
                .map(clock::secs_to_micros);
            debug!("Recovered dataset {} (last timestamp {:?})", name, last_micros);
            datasets.insert(name.clone(), Arc::new(DatasetHandle::new(&name, last_micros)));
        }

        info!("Loaded {} dataset(s) from storage", datasets.len());

        Ok(Self {
            pool,
            datasets: Arc::new(RwLock::new(datasets)),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.datasets.read().await.contains_key(name)
    }

    /// Registered dataset names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a single dataset
    pub async fn handle(&self, name: &str) -> Result<Arc<DatasetHandle>, ChartError> {
        self.datasets
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ChartError::MissingDataset(name.to_string()))
    }

    /// Resolve every name under one lock, failing on the first missing one
    pub async fn handles(&self, names: &[String]) -> Result<Vec<Arc<DatasetHandle>>, ChartError> {
        let datasets = self.datasets.read().await;
        names
            .iter()
            .map(|name| {
                datasets
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ChartError::MissingDataset(name.clone()))
            })
            .collect()
    }

    /// Create a dataset and load one point per (label, value) pair, in order
    ///
    /// Labels and values must have the same length. The dataset either ends up
    /// with every initial point or does not exist at all.
    pub async fn create_dataset(
        &self,
        name: &str,
        labels: &[String],
        values: &[String],
    ) -> Result<Vec<DataPoint>, ChartError> {
        validate_dataset_name(name)?;

        if labels.len() != values.len() {
            return Err(ChartError::InvalidDataset(format!(
                "Dataset {} has {} labels but {} values",
                name,
                labels.len(),
                values.len()
            )));
        }

        // Readers of the new dataset wait on this guard until the table exists
        let handle = Arc::new(DatasetHandle::new(name, None));
        let mut state = handle.state.write().await;

        {
            let mut datasets = self.datasets.write().await;
            if datasets.contains_key(name) {
                warn!("Dataset with name {} already exists", name);
                return Err(ChartError::DuplicateDataset(name.to_string()));
            }
            datasets.insert(name.to_string(), Arc::clone(&handle));
        }

        let mut last_micros = None;
        let points: Vec<DataPoint> = labels
            .iter()
            .zip(values)
            .map(|(label, value)| {
                let micros = clock::next_after(last_micros, clock::now_micros());
                last_micros = Some(micros);
                DataPoint {
                    timestamp: clock::micros_to_secs(micros),
                    label: label.clone(),
                    value: value.clone(),
                }
            })
            .collect();

        let rows: Vec<(f64, &str, &str)> = points
            .iter()
            .map(|p| (p.timestamp, p.label.as_str(), p.value.as_str()))
            .collect();

        if let Err(e) = db::dataset::create_dataset(&self.pool, name, &rows).await {
            warn!("Failed to create dataset {}: {}", name, e);
            state.removed = true;
            drop(state);
            self.forget(name, &handle).await;
            return Err(e.into());
        }

        state.last_micros = last_micros;
        info!("Dataset {} created with {} point(s)", name, points.len());

        Ok(points)
    }

    /// Drop a dataset and every point in it
    ///
    /// The registry lock is only taken for lookups; waiting on in-flight
    /// appends and dropping the table happen under the dataset's own lock.
    pub async fn remove_dataset(&self, name: &str) -> Result<(), ChartError> {
        let handle = self.handle(name).await?;

        let mut state = handle.state.write().await;
        if state.removed {
            // Lost a race with another removal or a failed creation
            return Err(ChartError::MissingDataset(name.to_string()));
        }

        db::dataset::drop_dataset(&self.pool, name).await?;
        state.removed = true;
        drop(state);

        self.forget(name, &handle).await;
        info!("Dataset {} removed", name);
        Ok(())
    }

    /// Unregister `name` if it still maps to this exact handle
    async fn forget(&self, name: &str, handle: &Arc<DatasetHandle>) {
        let mut datasets = self.datasets.write().await;
        if datasets.get(name).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            datasets.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use std::time::Duration;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn registry() -> Registry {
        Registry::load(memory_pool().await).await.expect("load registry")
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_timestamps() {
        let registry = registry().await;
        let points = registry
            .create_dataset("cpu", &strings(&["t0", "t1", "t2"]), &strings(&["10", "20", "30"]))
            .await
            .expect("create");

        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(points[1].label, "t1");
        assert_eq!(points[1].value, "20");
        assert!(registry.exists("cpu").await);
    }

    #[tokio::test]
    async fn test_duplicate_create_leaves_store_unchanged() {
        let registry = registry().await;
        registry
            .create_dataset("cpu", &strings(&["t0"]), &strings(&["10"]))
            .await
            .expect("create");

        let err = registry
            .create_dataset("cpu", &strings(&["x"]), &strings(&["99"]))
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, ChartError::DuplicateDataset(name) if name == "cpu"));

        let rows = db::dataset::select_all(registry.pool(), "cpu").await.expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "t0");
    }

    #[tokio::test]
    async fn test_mismatched_lengths_are_rejected() {
        let registry = registry().await;
        let err = registry
            .create_dataset("cpu", &strings(&["t0", "t1"]), &strings(&["10"]))
            .await
            .expect_err("mismatch must fail");
        assert!(matches!(err, ChartError::InvalidDataset(_)));
        assert!(!registry.exists("cpu").await);
        assert!(db::dataset::list_datasets(registry.pool()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_missing() {
        let registry = registry().await;
        registry.create_dataset("cpu", &[], &[]).await.expect("create");

        registry.remove_dataset("cpu").await.expect("remove");
        assert!(!registry.exists("cpu").await);

        let err = registry.remove_dataset("cpu").await.expect_err("second remove");
        assert!(matches!(err, ChartError::MissingDataset(_)));
    }

    #[tokio::test]
    async fn test_handles_fail_on_any_missing_name() {
        let registry = registry().await;
        registry.create_dataset("a", &[], &[]).await.expect("create");

        assert_eq!(registry.handles(&strings(&["a"])).await.expect("resolve").len(), 1);
        let err = registry
            .handles(&strings(&["a", "b"]))
            .await
            .expect_err("b is missing");
        assert!(matches!(err, ChartError::MissingDataset(name) if name == "b"));
    }

    #[tokio::test]
    async fn test_names_are_sorted() {
        let registry = registry().await;
        for name in ["mem", "cpu", "disk"] {
            registry.create_dataset(name, &[], &[]).await.expect("create");
        }
        assert_eq!(registry.names().await, strings(&["cpu", "disk", "mem"]));
    }

    #[tokio::test]
    async fn test_names_differing_in_case_are_distinct() {
        let registry = registry().await;
        registry
            .create_dataset("cpu", &strings(&["t0"]), &strings(&["10"]))
            .await
            .expect("create cpu");
        registry
            .create_dataset("CPU", &strings(&["t0", "t1"]), &strings(&["1", "2"]))
            .await
            .expect("create CPU");

        assert!(registry.exists("cpu").await);
        assert!(registry.exists("CPU").await);
        assert_eq!(db::dataset::select_all(registry.pool(), "cpu").await.expect("select").len(), 1);
        assert_eq!(db::dataset::select_all(registry.pool(), "CPU").await.expect("select").len(), 2);

        registry.remove_dataset("CPU").await.expect("remove CPU");
        assert!(registry.exists("cpu").await);
        assert!(!registry.exists("CPU").await);
    }

    #[tokio::test]
    async fn test_stale_forget_keeps_live_handle() {
        let registry = registry().await;
        registry.create_dataset("cpu", &[], &[]).await.expect("create");
        let stale = Arc::new(DatasetHandle::new("cpu", None));

        registry.forget("cpu", &stale).await;
        assert!(registry.exists("cpu").await);

        let live = registry.handle("cpu").await.expect("handle");
        registry.forget("cpu", &live).await;
        assert!(!registry.exists("cpu").await);
    }

    #[tokio::test]
    async fn test_remove_waiting_on_a_dataset_does_not_block_others() {
        let registry = registry().await;
        registry.create_dataset("cpu", &[], &[]).await.expect("create cpu");
        registry.create_dataset("mem", &[], &[]).await.expect("create mem");

        // Stands in for an append in flight on "cpu"
        let cpu = registry.handle("cpu").await.expect("handle");
        let in_flight = cpu.state().write().await;

        let remover = registry.clone();
        let removal = tokio::spawn(async move { remover.remove_dataset("cpu").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!removal.is_finished());

        let mem = tokio::time::timeout(Duration::from_secs(1), registry.handle("mem"))
            .await
            .expect("registry must stay available")
            .expect("mem exists");
        assert_eq!(mem.name(), "mem");
        assert!(registry.exists("cpu").await);

        drop(in_flight);
        removal.await.expect("join").expect("remove");
        assert!(!registry.exists("cpu").await);
        assert!(registry.exists("mem").await);
    }

    #[tokio::test]
    async fn test_reload_recovers_datasets_and_clock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("charts.db").display());

        let last = {
            let pool = db::init_db(&url, 2).await.expect("open");
            let registry = Registry::load(pool.clone()).await.expect("load");
            let points = registry
                .create_dataset("cpu", &strings(&["t0", "t1"]), &strings(&["1", "2"]))
                .await
                .expect("create");
            pool.close().await;
            points[1].timestamp
        };

        let pool = db::init_db(&url, 2).await.expect("reopen");
        let registry = Registry::load(pool).await.expect("reload");
        assert_eq!(registry.names().await, strings(&["cpu"]));

        let handle = registry.handle("cpu").await.expect("handle");
        let state = handle.state().read().await;
        assert_eq!(state.last_micros, Some(clock::secs_to_micros(last)));
    }
}
