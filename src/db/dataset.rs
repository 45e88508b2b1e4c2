use sqlx::sqlite::{SqliteConnection, SqlitePool};

/// Prefix shared by every dataset table
pub const TABLE_PREFIX: &str = "ds_";

/// Quoted table identifier for a dataset name
///
/// Names are hex encoded: SQLite compares table names case-insensitively, so
/// "cpu" and "CPU" must not map onto the same table.
pub fn table_ident(name: &str) -> String {
    format!("\"{}{}\"", TABLE_PREFIX, hex::encode(name))
}

/// Dataset name behind a table name, if the table is one of ours
fn dataset_name(table: &str) -> Option<String> {
    let encoded = table.strip_prefix(TABLE_PREFIX)?;
    let bytes = hex::decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Create the table for a new dataset and load its initial points in one transaction
///
/// Either the table exists with every point or nothing is left behind.
pub async fn create_dataset(
    pool: &SqlitePool,
    name: &str,
    points: &[(f64, &str, &str)],
) -> Result<(), sqlx::Error> {
    let table = table_ident(name);
    let mut tx = pool.begin().await?;

    sqlx::query(&format!(
        "CREATE TABLE {} (timestamp REAL PRIMARY KEY UNIQUE NOT NULL, label TEXT NOT NULL, data TEXT NOT NULL)",
        table
    ))
    .execute(&mut *tx)
    .await?;

    for (timestamp, label, data) in points {
        insert_with(&mut *tx, &table, *timestamp, label, data).await?;
    }

    tx.commit().await
}

async fn insert_with(
    conn: &mut SqliteConnection,
    table: &str,
    timestamp: f64,
    label: &str,
    data: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO {} (timestamp, label, data) VALUES (?, ?, ?)",
        table
    ))
    .bind(timestamp)
    .bind(label)
    .bind(data)
    .execute(conn)
    .await?;

    Ok(())
}

/// Append a single point to a dataset
pub async fn insert_point(
    pool: &SqlitePool,
    name: &str,
    timestamp: f64,
    label: &str,
    data: &str,
) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    insert_with(&mut *conn, &table_ident(name), timestamp, label, data).await
}

/// Get every point of a dataset, oldest first
/// Returns: (timestamp, label, data)
pub async fn select_all(
    pool: &SqlitePool,
    name: &str,
) -> Result<Vec<(f64, String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (f64, String, String)>(&format!(
        "SELECT timestamp, label, data FROM {} ORDER BY timestamp ASC",
        table_ident(name)
    ))
    .fetch_all(pool)
    .await
}

/// Get the points strictly newer than `after`, oldest first
pub async fn select_since(
    pool: &SqlitePool,
    name: &str,
    after: f64,
) -> Result<Vec<(f64, String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (f64, String, String)>(&format!(
        "SELECT timestamp, label, data FROM {} WHERE timestamp > ? ORDER BY timestamp ASC",
        table_ident(name)
    ))
    .bind(after)
    .fetch_all(pool)
    .await
}

/// Timestamp of the newest point, if any
pub async fn latest_timestamp(pool: &SqlitePool, name: &str) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<f64>>(&format!(
        "SELECT MAX(timestamp) FROM {}",
        table_ident(name)
    ))
    .fetch_one(pool)
    .await
}

/// Drop a dataset table with all of its points
pub async fn drop_dataset(pool: &SqlitePool, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DROP TABLE {}", table_ident(name)))
        .execute(pool)
        .await?;

    Ok(())
}

/// Names of every dataset currently stored
pub async fn list_datasets(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'ds\\_%' ESCAPE '\\' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut names: Vec<String> = tables
        .iter()
        .filter_map(|table| {
            let name = dataset_name(table);
            if name.is_none() {
                tracing::warn!("Skipping table {} with an undecodable dataset name", table);
            }
            name
        })
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[test]
    fn test_table_ident_encodes_names() {
        assert_eq!(table_ident("cpu"), "\"ds_637075\"");
        assert_eq!(table_ident("a\"b"), "\"ds_612262\"");
        assert_ne!(table_ident("cpu"), table_ident("CPU"));
        assert_eq!(dataset_name("ds_637075").as_deref(), Some("cpu"));
        assert_eq!(dataset_name("ds_zz"), None);
        assert_eq!(dataset_name("other"), None);
    }

    #[tokio::test]
    async fn test_names_differing_in_case_get_separate_tables() {
        let pool = memory_pool().await;
        create_dataset(&pool, "cpu", &[(1.0, "t0", "10")]).await.expect("create cpu");
        create_dataset(&pool, "CPU", &[(1.0, "T0", "99")]).await.expect("create CPU");

        assert_eq!(
            list_datasets(&pool).await.expect("list"),
            vec!["CPU".to_string(), "cpu".to_string()]
        );
        assert_eq!(select_all(&pool, "cpu").await.expect("select")[0].2, "10");
        assert_eq!(select_all(&pool, "CPU").await.expect("select")[0].2, "99");
    }

    #[tokio::test]
    async fn test_create_select_and_drop() {
        let pool = memory_pool().await;
        create_dataset(&pool, "cpu", &[(1.0, "t0", "10"), (2.0, "t1", "20")])
            .await
            .expect("create");
        insert_point(&pool, "cpu", 3.0, "t2", "30").await.expect("insert");

        let all = select_all(&pool, "cpu").await.expect("select all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], (1.0, "t0".to_string(), "10".to_string()));

        let since = select_since(&pool, "cpu", 1.0).await.expect("select since");
        assert_eq!(since.iter().map(|r| r.0).collect::<Vec<_>>(), vec![2.0, 3.0]);

        assert_eq!(latest_timestamp(&pool, "cpu").await.expect("max"), Some(3.0));
        assert_eq!(list_datasets(&pool).await.expect("list"), vec!["cpu".to_string()]);

        drop_dataset(&pool, "cpu").await.expect("drop");
        assert!(list_datasets(&pool).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_is_rejected() {
        let pool = memory_pool().await;
        create_dataset(&pool, "cpu", &[(1.0, "t0", "10")]).await.expect("create");
        assert!(insert_point(&pool, "cpu", 1.0, "again", "11").await.is_err());
        assert_eq!(select_all(&pool, "cpu").await.expect("select").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_nothing_behind() {
        let pool = memory_pool().await;
        // Second point collides with the first, so the whole transaction rolls back
        let result = create_dataset(&pool, "cpu", &[(1.0, "t0", "10"), (1.0, "t1", "20")]).await;
        assert!(result.is_err());
        assert!(list_datasets(&pool).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_empty_dataset_has_no_latest_timestamp() {
        let pool = memory_pool().await;
        create_dataset(&pool, "empty", &[]).await.expect("create");
        assert_eq!(latest_timestamp(&pool, "empty").await.expect("max"), None);
    }
}
