use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{row_to_reading, to_u64},
    models::{CalendarDay, Reading, StoreRow},
};

impl Database {
    /// Appends a reading stamped with the current time.
    pub async fn insert_reading(&self, value: f64) -> Result<StoreRow> {
        self.insert_reading_at(None, value).await
    }

    /// Appends a reading in its own transaction. With `timestamp` omitted the
    /// schema default (insertion time) applies.
    pub async fn insert_reading_at(&self, timestamp: Option<i64>, value: f64) -> Result<StoreRow> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open insert transaction")?;

            let inserted = match timestamp {
                Some(ts) => tx.execute(
                    "INSERT INTO temperature_log (timestamp, temperature) VALUES (?1, ?2)",
                    params![ts, value],
                ),
                None => tx.execute(
                    "INSERT INTO temperature_log (temperature) VALUES (?1)",
                    params![value],
                ),
            };
            inserted.context("failed to insert reading")?;

            let id = tx.last_insert_rowid();
            let reading = tx
                .query_row(
                    "SELECT timestamp, temperature FROM temperature_log WHERE id = ?1",
                    params![id],
                    row_to_reading,
                )
                .context("failed to read back inserted reading")?;

            // Dropping `tx` on any error above rolls the insert back.
            tx.commit().context("failed to commit reading")?;

            Ok(StoreRow { id, reading })
        })
        .await
    }

    /// Most recently inserted reading, or `None` when the store is empty.
    pub async fn latest_reading(&self) -> Result<Option<Reading>> {
        self.execute(|conn| {
            conn.query_row(
                "SELECT timestamp, temperature FROM temperature_log
                 ORDER BY id DESC
                 LIMIT 1",
                [],
                row_to_reading,
            )
            .optional()
            .context("failed to query latest reading")
        })
        .await
    }

    /// Readings from `start 00:00:00` through `end 23:59:59` UTC, oldest
    /// first. An empty vector means no data in the range.
    pub async fn readings_between(
        &self,
        start: CalendarDay,
        end: CalendarDay,
    ) -> Result<Vec<Reading>> {
        let from = start.start_timestamp();
        let to = end.end_timestamp();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, temperature FROM temperature_log
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let readings = stmt
                .query_map(params![from, to], row_to_reading)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to query readings in range")?;

            Ok(readings)
        })
        .await
    }

    pub async fn count_readings(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM temperature_log", [], |row| row.get(0))?;
            to_u64(count, "count")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("readings.sqlite3")).unwrap();
        (dir, db)
    }

    fn day(input: &str) -> CalendarDay {
        CalendarDay::parse(input).unwrap()
    }

    #[tokio::test]
    async fn latest_is_none_on_empty_store() {
        let (_dir, db) = open_store();
        assert_eq!(db.latest_reading().await.unwrap(), None);
        assert_eq!(db.count_readings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn latest_follows_insertion_order_not_timestamp() {
        let (_dir, db) = open_store();
        db.insert_reading_at(Some(2_000), 20.0).await.unwrap();
        db.insert_reading_at(Some(1_000), 10.0).await.unwrap();

        let latest = db.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest, Reading { timestamp: 1_000, value: 10.0 });
    }

    #[tokio::test]
    async fn insert_without_timestamp_uses_current_time() {
        let (_dir, db) = open_store();
        let before = chrono::Utc::now().timestamp();

        let row = db.insert_reading(21.5).await.unwrap();

        assert!(row.id > 0);
        assert_eq!(row.reading.value, 21.5);
        assert!(row.reading.timestamp >= before);
        assert!(row.reading.timestamp <= chrono::Utc::now().timestamp());
    }

    #[tokio::test]
    async fn ids_increase_with_each_insert() {
        let (_dir, db) = open_store();
        let first = db.insert_reading(1.0).await.unwrap();
        let second = db.insert_reading(2.0).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn range_covers_whole_calendar_days() {
        let (_dir, db) = open_store();
        let jan_1_start = 1_704_067_200;
        let jan_1_end = jan_1_start + 86_399;

        db.insert_reading_at(Some(jan_1_start - 1), 1.0).await.unwrap();
        db.insert_reading_at(Some(jan_1_end), 3.0).await.unwrap();
        db.insert_reading_at(Some(jan_1_start), 2.0).await.unwrap();
        db.insert_reading_at(Some(jan_1_end + 1), 4.0).await.unwrap();

        let readings = db
            .readings_between(day("2024-01-01"), day("2024-01-01"))
            .await
            .unwrap();

        assert_eq!(
            readings,
            vec![
                Reading { timestamp: jan_1_start, value: 2.0 },
                Reading { timestamp: jan_1_end, value: 3.0 },
            ]
        );
    }

    #[tokio::test]
    async fn empty_range_returns_no_rows() {
        let (_dir, db) = open_store();
        db.insert_reading_at(Some(1_704_067_200), 1.0).await.unwrap();

        let readings = db
            .readings_between(day("2023-06-01"), day("2023-06-30"))
            .await
            .unwrap();
        assert!(readings.is_empty());
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let (_dir, db) = open_store();
        db.insert_reading_at(Some(1_704_067_200), 1.0).await.unwrap();

        let readings = db
            .readings_between(day("2024-01-02"), day("2024-01-01"))
            .await
            .unwrap();
        assert!(readings.is_empty());
    }

    #[tokio::test]
    async fn repeated_queries_are_identical() {
        let (_dir, db) = open_store();
        for (i, value) in [18.5, 19.0, 19.5].into_iter().enumerate() {
            db.insert_reading_at(Some(1_704_067_200 + i as i64 * 60), value)
                .await
                .unwrap();
        }

        let range = (day("2024-01-01"), day("2024-01-01"));
        let first = db.readings_between(range.0, range.1).await.unwrap();
        let second = db.readings_between(range.0, range.1).await.unwrap();
        assert_eq!(first, second);

        let latest_a = db.latest_reading().await.unwrap();
        let latest_b = db.latest_reading().await.unwrap();
        assert_eq!(latest_a, latest_b);
    }
}
