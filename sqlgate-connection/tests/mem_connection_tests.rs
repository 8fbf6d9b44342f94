use std::thread;

use sqlgate_connection::{Connection, Cursor, MemConnection, SqlParam, SqlValue, Statement};

#[test]
fn scripted_rows_are_returned_in_order() {
    sqlgate_test_utils::init_tracing_for_tests();
    let conn = MemConnection::new();
    conn.script_rows(
        "SELECT id FROM t",
        &["id"],
        vec![vec![SqlValue::Integer(1)], vec![SqlValue::Integer(2)]],
    );

    let mut stmt = conn.create_statement("SELECT id FROM t").expect("statement");
    let mut cursor = stmt.execute_query().expect("query");
    assert_eq!(cursor.column_names(), ["id"]);
    assert_eq!(cursor.next_row().unwrap(), Some(vec![SqlValue::Integer(1)]));
    assert_eq!(cursor.next_row().unwrap(), Some(vec![SqlValue::Integer(2)]));
    assert_eq!(cursor.next_row().unwrap(), None);
    drop(cursor);
    drop(stmt);

    let stats = conn.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.rows_fetched, 2);
}

#[test]
fn statements_are_released_when_execution_fails() {
    let conn = MemConnection::new();
    conn.script_failure("SELECT * FROM broken", "no such table: broken");

    {
        let mut stmt = conn.create_statement("SELECT * FROM broken").unwrap();
        assert!(stmt.execute_query().is_err());
        assert_eq!(conn.open_statements(), 1);
    }
    assert_eq!(conn.open_statements(), 0);
}

#[test]
fn bindings_are_recorded_and_unbound_placeholders_fail() {
    let conn = MemConnection::new();
    conn.script_update("UPDATE t SET v = ? WHERE id = ?", 1);

    let mut plain = conn
        .create_statement("UPDATE t SET v = ? WHERE id = ?")
        .unwrap();
    assert!(plain.execute_update().is_err());
    drop(plain);

    let mut stmt = conn
        .prepare_statement("UPDATE t SET v = ? WHERE id = ?")
        .unwrap();
    assert_eq!(stmt.parameter_count(), 2);
    stmt.bind(1, &SqlParam::from("x")).unwrap();
    stmt.bind(2, &SqlParam::from(7i64)).unwrap();
    assert_eq!(stmt.execute_update().unwrap(), 1);
    assert_eq!(
        conn.last_bindings(),
        vec![SqlParam::Text("x".into()), SqlParam::Long(7)]
    );
}

#[test]
fn clones_share_the_script_across_threads() {
    let conn = MemConnection::new();
    conn.script_rows::<&str>("SELECT * FROM q", &["id"], vec![]);

    let writer = conn.clone();
    thread::spawn(move || {
        writer.script_rows("SELECT * FROM q", &["id"], vec![vec![SqlValue::Integer(9)]]);
    })
    .join()
    .unwrap();

    let mut stmt = conn.create_statement("SELECT * FROM q").unwrap();
    let mut cursor = stmt.execute_query().unwrap();
    assert_eq!(cursor.next_row().unwrap(), Some(vec![SqlValue::Integer(9)]));
}
