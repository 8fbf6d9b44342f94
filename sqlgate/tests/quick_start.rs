use std::time::Duration;

use sqlgate::matchers::{equals, satisfies};
use sqlgate::{Error, GatewayConfig, SqlGateway, SqliteConnection, sql_params};
use time::macros::date;

fn orders_gateway(config: GatewayConfig) -> SqlGateway<SqliteConnection> {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.raw()
        .execute_batch(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer TEXT, total REAL, placed_on DATE);
             INSERT INTO orders VALUES (1, 'ada', 19.5, '2024-03-01');
             INSERT INTO orders VALUES (2, 'grace', 7.25, '2024-03-02');",
        )
        .unwrap();
    SqlGateway::new(conn, config).unwrap()
}

#[test]
fn end_to_end_through_the_umbrella_crate() {
    let gw = orders_gateway(
        GatewayConfig::default()
            .with_dml_enabled(true)
            .with_poll_timeout(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(20)),
    );
    let cols = gw.columns();
    let customer = cols.create_string_column("customer").unwrap();
    let total = cols.create_double_column("total").unwrap();
    let placed_on = cols.create_date_column("placed_on").unwrap();

    let rows = gw
        .query("SELECT * FROM orders WHERE placed_on >= ? ORDER BY id", sql_params![date!(2024 - 03 - 01)])
        .unwrap();
    assert_eq!(rows.row_count(), 2);
    gw.assert_value_matches(&rows, 1, &customer, &equals("ada")).unwrap();
    gw.assert_value_matches(&rows, 2, &total, &satisfies("below 10", |t: &f64| *t < 10.0))
        .unwrap();
    assert_eq!(
        gw.get_column_value(&rows, 2, &placed_on).unwrap(),
        Some(date!(2024 - 03 - 02))
    );

    assert_eq!(gw.delete("DELETE FROM orders WHERE id = ?", sql_params![2]).unwrap(), 1);
    gw.assert_single_row_query("SELECT * FROM orders", &[]).unwrap();

    let err = gw.update("DROP TABLE orders", &[]).unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
}
