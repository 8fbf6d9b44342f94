use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let env = std::env::var("RUST_LOG").ok();
        let filter = match env {
            Some(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            None => EnvFilter::new("info"),
        };
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    // Use ctor to run at binary init time to avoid having to call init in every test.
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}

/// Length of the text stored in the `documents` fixture row.
pub const DOCUMENT_TEXT_LEN: usize = 64 * 1024;

/// Body of the `documents` fixture row: a repeating alphabet.
pub fn document_text() -> String {
    "abcdefghijklmnopqrstuvwxyz"
        .chars()
        .cycle()
        .take(DOCUMENT_TEXT_LEN)
        .collect()
}

/// Create and populate the fixture tables used across the gateway tests.
///
/// - `test1`: two rows with integer, text, wide integer and decimal columns,
///   `test_value3` holding values just outside the 32-bit range.
/// - `test2`: same shape as `test1`, empty, for insert tests.
/// - `documents`: one row with a large text body.
/// - `events`: temporal values stored in their text encodings.
pub fn seed_fixture_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let over_max = i64::from(i32::MAX) + 2;
    let under_min = i64::from(i32::MIN) - 2;
    conn.execute_batch(&format!(
        "CREATE TABLE test1 (test_id INTEGER NOT NULL PRIMARY KEY, test_value1 VARCHAR(100), \
           test_value2 CHAR(10), test_value3 BIGINT, test_value4 FLOAT, test_value5 DECIMAL(12,4));
         INSERT INTO test1 VALUES (1, 'Hello World', 'Bla', {over_max}, 17.5, 23.1234);
         INSERT INTO test1 VALUES (2, 'A test', NULL, {under_min}, NULL, 23.1234);
         CREATE TABLE test2 (test_id INTEGER NOT NULL PRIMARY KEY, test_value1 VARCHAR(100), \
           test_value2 CHAR(10), test_value3 BIGINT, test_value4 FLOAT, test_value5 DECIMAL(12,4));
         CREATE TABLE documents (id INT, text CLOB);
         CREATE TABLE events (id INTEGER, happened_on DATE, happened_at TIME, logged_at TIMESTAMP);
         INSERT INTO events VALUES (1, '2015-06-30', '12:30:00', '2015-06-30 12:30:00.125');
         INSERT INTO events VALUES (2, NULL, NULL, 1435667400);"
    ))?;
    conn.execute(
        "INSERT INTO documents VALUES (?1, ?2)",
        rusqlite::params![1, document_text()],
    )?;
    Ok(())
}
