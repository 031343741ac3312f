//! End-to-end runner tests against a temporary SQLite database

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;
use tidemark_migrate::{
    Database, DatabaseConfig, MigrateError, MigrationCatalog, MigrationRollback, MigrationRunner,
    MigrationStore, RollbackOptions,
};

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    runner: MigrationRunner,
    inspect: SqlitePool,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("migrations");
        fs::create_dir_all(&root).unwrap();

        let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
        let mut config = DatabaseConfig::new(&url);
        config.max_connections = 1;

        let db = Database::connect(&config).await.unwrap();
        let runner = MigrationRunner::new(
            MigrationCatalog::new(&root),
            MigrationStore::new("migrations"),
            db,
        );
        let inspect = SqlitePool::connect(&url).await.unwrap();

        Self {
            _dir: dir,
            root,
            runner,
            inspect,
        }
    }

    fn unit(&self, dir: &str, up: &str, down: &str) {
        write_unit(&self.root, dir, up, down);
    }

    async fn applied(&self) -> BTreeSet<i64> {
        self.runner
            .store()
            .list_applied_keys(self.runner.database())
            .await
            .unwrap()
    }

    async fn table_exists(&self, name: &str) -> bool {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.inspect)
        .await
        .unwrap();
        count > 0
    }

    async fn schema(&self) -> Vec<(String, Option<String>)> {
        sqlx::query_as(
            "SELECT name, sql FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.inspect)
        .await
        .unwrap()
    }
}

fn write_unit(root: &Path, dir: &str, up: &str, down: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("up.sql"), up).unwrap();
    fs::write(path.join("down.sql"), down).unwrap();
}

fn keys(list: &[i64]) -> BTreeSet<i64> {
    list.iter().copied().collect()
}

/// Three units where each one depends on the schema of the previous
fn three_units(fixture: &Fixture) {
    // Written out of order on purpose
    fixture.unit(
        "3-AddPostsTitle",
        "ALTER TABLE posts ADD COLUMN title TEXT;",
        "ALTER TABLE posts DROP COLUMN title;",
    );
    fixture.unit(
        "1-CreateUsers",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);",
        "DROP TABLE users;",
    );
    fixture.unit(
        "2-CreatePosts",
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users (id));\n\
         CREATE INDEX posts_user_id ON posts (user_id);",
        "DROP INDEX posts_user_id;\nDROP TABLE posts;",
    );
}

#[tokio::test]
async fn test_migrate_applies_in_key_order() {
    let fixture = Fixture::new().await;
    three_units(&fixture);

    let result = fixture.runner.migrate().await.unwrap();

    assert_eq!(result.applied, vec![1, 2, 3]);
    assert!(result.skipped_empty.is_empty());
    assert_eq!(fixture.applied().await, keys(&[1, 2, 3]));
    assert!(fixture.table_exists("users").await);
    assert!(fixture.table_exists("posts").await);

    let names: Vec<_> = fixture
        .runner
        .store()
        .list_applied(fixture.runner.database())
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(names, vec!["CreateUsers", "CreatePosts", "AddPostsTitle"]);
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let fixture = Fixture::new().await;
    three_units(&fixture);

    fixture.runner.migrate().await.unwrap();
    let second = fixture.runner.migrate().await.unwrap();

    assert!(second.applied.is_empty());
    assert_eq!(second.already_applied, 3);
    assert_eq!(fixture.applied().await, keys(&[1, 2, 3]));
}

#[tokio::test]
async fn test_migrate_picks_up_new_units() {
    let fixture = Fixture::new().await;
    fixture.unit("1-CreateUsers", "CREATE TABLE users (id INTEGER);", "DROP TABLE users;");
    fixture.runner.migrate().await.unwrap();

    fixture.unit("2-CreateTags", "CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;");
    let result = fixture.runner.migrate().await.unwrap();

    assert_eq!(result.applied, vec![2]);
    assert_eq!(result.already_applied, 1);
}

#[tokio::test]
async fn test_failed_script_is_rolled_back() {
    let fixture = Fixture::new().await;
    fixture.unit("1-CreateUsers", "CREATE TABLE users (id INTEGER);", "DROP TABLE users;");
    fixture.unit(
        "2-Broken",
        "CREATE TABLE widgets (id INTEGER);\nINSERT INTO missing_table VALUES (1);",
        "DROP TABLE widgets;",
    );
    fixture.unit("3-CreateTags", "CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;");

    let result = fixture.runner.migrate().await;

    assert!(matches!(result, Err(MigrateError::Script(_))));
    // Earlier units stay committed, the failing one leaves no trace, later ones never run
    assert_eq!(fixture.applied().await, keys(&[1]));
    assert!(fixture.table_exists("users").await);
    assert!(!fixture.table_exists("widgets").await);
    assert!(!fixture.table_exists("tags").await);
}

#[tokio::test]
async fn test_failed_bookkeeping_is_rolled_back() {
    let fixture = Fixture::new().await;
    // The script claims its own key, so recording it afterwards violates uniqueness
    fixture.unit(
        "1-Conflicting",
        "CREATE TABLE widgets (id INTEGER);\n\
         INSERT INTO migrations (\"key\", name) VALUES (1, 'Conflicting');",
        "DROP TABLE widgets;",
    );

    let result = fixture.runner.migrate().await;

    assert!(matches!(result, Err(MigrateError::Bookkeeping(_))));
    assert!(fixture.applied().await.is_empty());
    assert!(!fixture.table_exists("widgets").await);
}

#[tokio::test]
async fn test_rollback_reverts_only_most_recent() {
    let fixture = Fixture::new().await;
    three_units(&fixture);
    fixture.runner.migrate().await.unwrap();

    let first = fixture.runner.rollback(RollbackOptions::default()).await.unwrap();
    assert_eq!(first.reverted, vec![3]);
    assert_eq!(fixture.applied().await, keys(&[1, 2]));

    let second = fixture.runner.rollback(RollbackOptions::default()).await.unwrap();
    assert_eq!(second.reverted, vec![2]);
    assert_eq!(fixture.applied().await, keys(&[1]));
    assert!(!fixture.table_exists("posts").await);
    assert!(fixture.table_exists("users").await);
}

#[tokio::test]
async fn test_rollback_all() {
    let fixture = Fixture::new().await;
    three_units(&fixture);
    fixture.runner.migrate().await.unwrap();

    let result = fixture
        .runner
        .rollback(RollbackOptions { all: true })
        .await
        .unwrap();

    assert_eq!(result.reverted, vec![3, 2, 1]);
    assert!(fixture.applied().await.is_empty());
    assert!(!fixture.table_exists("users").await);
    assert!(!fixture.table_exists("posts").await);
}

#[tokio::test]
async fn test_rollback_on_fresh_database_does_nothing() {
    let fixture = Fixture::new().await;
    three_units(&fixture);

    let result = fixture
        .runner
        .rollback(RollbackOptions { all: true })
        .await
        .unwrap();

    assert!(result.reverted.is_empty());
    assert!(fixture.applied().await.is_empty());
}

#[tokio::test]
async fn test_empty_up_script_stays_pending() {
    let fixture = Fixture::new().await;
    fixture.unit("1-Placeholder", "  \n", "DROP TABLE nothing;");
    fixture.unit("2-CreateUsers", "CREATE TABLE users (id INTEGER);", "DROP TABLE users;");

    let first = fixture.runner.migrate().await.unwrap();
    assert_eq!(first.applied, vec![2]);
    assert_eq!(first.skipped_empty, vec![1]);

    let second = fixture.runner.migrate().await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.skipped_empty, vec![1]);

    assert_eq!(fixture.applied().await, keys(&[2]));
}

#[tokio::test]
async fn test_missing_script_files_count_as_empty() {
    let fixture = Fixture::new().await;
    fs::create_dir_all(fixture.root.join("1-NoFiles")).unwrap();

    let result = fixture.runner.migrate().await.unwrap();

    assert!(result.applied.is_empty());
    assert_eq!(result.skipped_empty, vec![1]);
}

#[tokio::test]
async fn test_empty_down_script_does_not_stop_rollback_scan() {
    let fixture = Fixture::new().await;
    fixture.unit("1-CreateUsers", "CREATE TABLE users (id INTEGER);", "DROP TABLE users;");
    fixture.unit("2-CreateTags", "CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;");
    fixture.unit("3-Irreversible", "CREATE TABLE audit (id INTEGER);", "");
    fixture.runner.migrate().await.unwrap();

    let result = fixture.runner.rollback(RollbackOptions::default()).await.unwrap();

    assert_eq!(result.skipped_empty, vec![3]);
    assert_eq!(result.reverted, vec![2]);
    assert_eq!(fixture.applied().await, keys(&[1, 3]));
    assert!(fixture.table_exists("audit").await);
    assert!(!fixture.table_exists("tags").await);
}

#[tokio::test]
async fn test_round_trip_restores_schema() {
    let fixture = Fixture::new().await;
    three_units(&fixture);
    fixture
        .runner
        .store()
        .ensure_schema(fixture.runner.database())
        .await
        .unwrap();
    let before = fixture.schema().await;

    fixture.runner.migrate().await.unwrap();
    assert_ne!(fixture.schema().await, before);

    fixture
        .runner
        .rollback(RollbackOptions { all: true })
        .await
        .unwrap();

    assert_eq!(fixture.schema().await, before);
    assert!(fixture.applied().await.is_empty());
}

#[tokio::test]
async fn test_status_reports_pending_applied_and_missing() {
    let fixture = Fixture::new().await;
    fixture.unit("1-CreateUsers", "CREATE TABLE users (id INTEGER);", "DROP TABLE users;");
    fixture.unit("2-CreateTags", "CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;");
    fixture.runner.migrate().await.unwrap();

    fs::remove_dir_all(fixture.root.join("1-CreateUsers")).unwrap();
    fixture.unit("3-CreateAudit", "CREATE TABLE audit (id INTEGER);", "DROP TABLE audit;");

    let statuses = fixture.runner.status().await.unwrap();
    let summary: Vec<_> = statuses
        .iter()
        .map(|s| (s.key, s.name.as_str(), s.applied, s.missing))
        .collect();

    assert_eq!(
        summary,
        vec![
            (2, "CreateTags", true, false),
            (3, "CreateAudit", false, false),
            (1, "CreateUsers", true, true),
        ]
    );
}

#[tokio::test]
async fn test_missing_catalog_root_is_discovery_error() {
    let fixture = Fixture::new().await;
    fs::remove_dir_all(&fixture.root).unwrap();

    let result = fixture.runner.migrate().await;
    assert!(matches!(result, Err(MigrateError::Discovery { .. })));
}

#[tokio::test]
async fn test_connect_failure_is_connection_error() {
    let dir = TempDir::new().unwrap();
    // mode=ro refuses to create the file
    let url = format!("sqlite://{}?mode=ro", dir.path().join("absent.db").display());

    let mut config = DatabaseConfig::new(url);
    config.acquire_timeout = Duration::from_secs(2);

    let result = Database::connect(&config).await;
    assert!(matches!(result, Err(MigrateError::Connection(_))));
}
