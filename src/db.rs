use crate::filter::FilterSpec;
use crate::models::Message;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;

const COLUMNS: &str = "id, thread_id, sender_name, sender_email, subject, received_on, \
     is_read, is_personal, is_social, is_promotions, is_updates, is_forums, \
     is_important, is_starred, is_trash, is_spam, is_inbox, is_replied";

/// Bound parameters per `IN (...)` statement.
const IN_CHUNK: usize = 500;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> sqlx::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> sqlx::Result<()> {
        let schema = include_str!("../schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts the row unless its id is already mirrored. Returns whether a
    /// row was written; an existing row is never overwritten.
    pub async fn upsert(&self, msg: &Message) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO emails (id, thread_id, sender_name, sender_email, subject, received_on, \
             is_read, is_personal, is_social, is_promotions, is_updates, is_forums, \
             is_important, is_starred, is_trash, is_spam, is_inbox, is_replied) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&msg.id)
        .bind(&msg.thread_id)
        .bind(&msg.sender_name)
        .bind(&msg.sender_email)
        .bind(&msg.subject)
        .bind(msg.received_on)
        .bind(msg.is_read)
        .bind(msg.is_personal)
        .bind(msg.is_social)
        .bind(msg.is_promotions)
        .bind(msg.is_updates)
        .bind(msg.is_forums)
        .bind(msg.is_important)
        .bind(msg.is_starred)
        .bind(msg.is_trash)
        .bind(msg.is_spam)
        .bind(msg.is_inbox)
        .bind(msg.is_replied)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Messages matching `filter`, newest first.
    pub async fn query(&self, filter: &FilterSpec) -> sqlx::Result<Vec<Message>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM emails"));
        filter.push_predicate(&mut qb);
        qb.push(" ORDER BY received_on DESC, id DESC");
        qb.build_query_as::<Message>().fetch_all(&self.pool).await
    }

    /// Ids of the rows `query(filter)` would return, in the same order.
    pub async fn ids_matching(&self, filter: &FilterSpec) -> sqlx::Result<Vec<String>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM emails");
        filter.push_predicate(&mut qb);
        qb.push(" ORDER BY received_on DESC, id DESC");
        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    pub async fn distinct_senders(&self) -> sqlx::Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT sender_email FROM emails ORDER BY sender_email")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    pub async fn ids_by_sender(&self, sender_email: &str) -> sqlx::Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT id FROM emails WHERE sender_email = ? ORDER BY received_on DESC, id DESC",
        )
        .bind(sender_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    pub async fn all_ids(&self) -> sqlx::Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM emails")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    pub async fn message_exists(&self, id: &str) -> sqlx::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM emails WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn count(&self) -> sqlx::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get(0))
    }

    pub async fn delete_by_ids(&self, ids: &[String]) -> sqlx::Result<u64> {
        self.update_by_ids("DELETE FROM emails WHERE id IN (", ids).await
    }

    pub async fn mark_read_by_ids(&self, ids: &[String]) -> sqlx::Result<u64> {
        self.update_by_ids("UPDATE emails SET is_read = 1 WHERE id IN (", ids)
            .await
    }

    pub async fn delete_by_sender(&self, sender_email: &str) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM emails WHERE sender_email = ?")
            .bind(sender_email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_read_by_sender(&self, sender_email: &str) -> sqlx::Result<u64> {
        let result = sqlx::query("UPDATE emails SET is_read = 1 WHERE sender_email = ?")
            .bind(sender_email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Runs `prefix <ids>)` over all ids inside one transaction, so readers
    /// see either none or all of the change.
    async fn update_by_ids(&self, prefix: &str, ids: &[String]) -> sqlx::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(prefix);
            {
                let mut separated = qb.separated(", ");
                for id in chunk {
                    separated.push_bind(id.as_str());
                }
            }
            qb.push(")");
            affected += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("mirror.db").display());
        let db = Database::new(&url).await.unwrap();
        db.run_migrations().await.unwrap();
        (dir, db)
    }

    fn message(id: &str, received_on: i64, sender: &str) -> Message {
        Message {
            id: id.to_string(),
            thread_id: format!("t-{id}"),
            sender_name: String::new(),
            sender_email: sender.to_string(),
            subject: format!("subject {id}"),
            received_on,
            is_read: false,
            is_personal: false,
            is_social: false,
            is_promotions: false,
            is_updates: false,
            is_forums: false,
            is_important: false,
            is_starred: false,
            is_trash: false,
            is_spam: false,
            is_inbox: true,
            is_replied: false,
        }
    }

    #[tokio::test]
    async fn upsert_ignores_existing_ids() {
        let (_dir, db) = open().await;
        assert!(db.upsert(&message("a", 1, "s1")).await.unwrap());
        db.mark_read_by_ids(&["a".to_string()]).await.unwrap();

        let mut stale = message("a", 1, "s1");
        stale.subject = "changed".to_string();
        assert!(!db.upsert(&stale).await.unwrap());

        let rows = db.query(&FilterSpec::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "subject a");
        assert!(rows[0].is_read, "re-sync must not undo a local mutation");
    }

    #[tokio::test]
    async fn query_orders_newest_first_with_inclusive_bounds() {
        let (_dir, db) = open().await;
        for (id, ts) in [("a", 100), ("b", 200), ("c", 300), ("d", 400)] {
            db.upsert(&message(id, ts, "s1")).await.unwrap();
        }
        let filter = FilterSpec {
            start: Some(200),
            end: Some(300),
            ..Default::default()
        };
        let ids: Vec<_> = db
            .query(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["c", "b"]);
        assert_eq!(db.ids_matching(&filter).await.unwrap(), ids);
    }

    #[tokio::test]
    async fn exclusions_and_sender_combine() {
        let (_dir, db) = open().await;
        let mut starred = message("a", 100, "s1");
        starred.is_starred = true;
        let mut important = message("b", 200, "s1");
        important.is_important = true;
        db.upsert(&starred).await.unwrap();
        db.upsert(&important).await.unwrap();
        db.upsert(&message("c", 300, "s1")).await.unwrap();
        db.upsert(&message("d", 400, "s2")).await.unwrap();

        let filter = FilterSpec {
            sender_email: Some("s1".to_string()),
            exclude_starred: true,
            exclude_important: true,
            ..Default::default()
        };
        assert_eq!(db.ids_matching(&filter).await.unwrap(), ["c"]);
    }

    #[tokio::test]
    async fn distinct_senders_are_sorted() {
        let (_dir, db) = open().await;
        db.upsert(&message("a", 1, "zed@x")).await.unwrap();
        db.upsert(&message("b", 2, "amy@x")).await.unwrap();
        db.upsert(&message("c", 3, "zed@x")).await.unwrap();
        assert_eq!(db.distinct_senders().await.unwrap(), ["amy@x", "zed@x"]);
    }

    #[tokio::test]
    async fn keyed_mutations() {
        let (_dir, db) = open().await;
        for (id, sender) in [("a", "s1"), ("b", "s1"), ("c", "s2"), ("d", "s3")] {
            db.upsert(&message(id, 1, sender)).await.unwrap();
        }

        assert_eq!(db.mark_read_by_sender("s1").await.unwrap(), 2);
        assert_eq!(db.delete_by_sender("s2").await.unwrap(), 1);
        assert_eq!(
            db.delete_by_ids(&["d".to_string(), "missing".to_string()])
                .await
                .unwrap(),
            1
        );

        let rows = db.query(&FilterSpec::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.is_read && m.sender_email == "s1"));
        assert!(!db.message_exists("c").await.unwrap());
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn large_id_sets_span_chunks() {
        let (_dir, db) = open().await;
        let ids: Vec<String> = (0..700).map(|i| format!("m{i:04}")).collect();
        for id in &ids {
            db.upsert(&message(id, 1, "bulk")).await.unwrap();
        }
        assert_eq!(db.mark_read_by_ids(&ids).await.unwrap(), 700);
        let unread = FilterSpec {
            exclude_read: true,
            ..Default::default()
        };
        assert!(db.ids_matching(&unread).await.unwrap().is_empty());
        assert_eq!(db.delete_by_ids(&ids).await.unwrap(), 700);
        assert_eq!(db.count().await.unwrap(), 0);
    }
}
