//! Each `SqlParam` variant must reach SQLite with the storage class and text
//! encoding the typed column accessors expect to read back.

use sqlgate_connection::{Connection, Cursor, SqlParam, SqlValue, SqliteConnection, Statement};
use tempfile::TempDir;
use time::macros::{date, datetime, time};

fn roundtrip(conn: &SqliteConnection, param: SqlParam) -> (SqlValue, String) {
    let mut stmt = conn
        .prepare_statement("SELECT ?1, typeof(?1)")
        .expect("prepare");
    stmt.bind(1, &param).expect("bind");
    let mut cursor = stmt.execute_query().expect("query");
    let mut row = cursor.next_row().expect("fetch").expect("row");
    let kind = match row.pop() {
        Some(SqlValue::Text(kind)) => kind,
        other => panic!("unexpected typeof result: {other:?}"),
    };
    (row.remove(0), kind)
}

#[test]
fn variants_bind_to_expected_storage_classes() {
    sqlgate_test_utils::init_tracing_for_tests();
    let conn = SqliteConnection::open_in_memory().expect("open");

    assert_eq!(roundtrip(&conn, SqlParam::Null), (SqlValue::Null, "null".into()));
    assert_eq!(
        roundtrip(&conn, SqlParam::Integer(-5)),
        (SqlValue::Integer(-5), "integer".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Long(i64::from(i32::MAX) + 2)),
        (SqlValue::Integer(2_147_483_649), "integer".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Float(17.5)),
        (SqlValue::Float(17.5), "real".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::OtherNumeric(3.0)),
        (SqlValue::Float(3.0), "real".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Text("Hello World".into())),
        (SqlValue::Text("Hello World".into()), "text".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Opaque(vec![1, 2, 3])),
        (SqlValue::Blob(vec![1, 2, 3]), "blob".into())
    );
}

#[test]
fn temporal_variants_bind_as_canonical_text() {
    let conn = SqliteConnection::open_in_memory().expect("open");

    assert_eq!(
        roundtrip(&conn, SqlParam::Date(date!(2015 - 06 - 30))).0,
        SqlValue::Text("2015-06-30".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Time(time!(12:30:00))).0,
        SqlValue::Text("12:30:00".into())
    );
    assert_eq!(
        roundtrip(&conn, SqlParam::Timestamp(datetime!(2015-06-30 12:30:00.125))).0,
        SqlValue::Text("2015-06-30 12:30:00.125".into())
    );
}

#[test]
fn file_databases_are_shared_between_connections() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("shared.db");

    let writer = SqliteConnection::open(&path).expect("open writer");
    writer
        .raw()
        .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
        .expect("seed");

    let reader = SqliteConnection::open(&path).expect("open reader");
    assert!(reader.description().contains("shared.db"));
    let mut stmt = reader.create_statement("SELECT id FROM t").expect("prepare");
    let mut cursor = stmt.execute_query().expect("query");
    assert_eq!(cursor.next_row().unwrap(), Some(vec![SqlValue::Integer(1)]));
    drop(cursor);
    drop(stmt);

    reader.close().expect("close reader");
    writer.close().expect("close writer");
}
