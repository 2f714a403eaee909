//! Integration tests against a live PostgreSQL server.
//!
//! Set `TALLY_TEST_PG` to a connection string to run these, e.g.
//! `TALLY_TEST_PG='host=localhost user=postgres password=postgres dbname=demo'`.
//! Without it every test here is a no-op.

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use tally_core::backend::{MemoryBackend, ReportBackend};
use tally_core::schema::{customers_table_schema, sales_import_table, sales_records_from_table};
use tally_core::seed::SEED_SALES;
use tally_core::table::MemTable;
use tally_postgres::errors::PostgresError;
use tally_postgres::{PostgresBackend, PostgresClient, WriteMode};

// The seed tests share the sales/customers tables; take the lock while
// touching them.
static PG_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

async fn connect_or_skip() -> Option<PostgresClient> {
    let conn_str = match std::env::var("TALLY_TEST_PG") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("TALLY_TEST_PG not set, skipping");
            return None;
        }
    };
    Some(PostgresClient::connect(&conn_str).await.expect("connect"))
}

#[tokio::test]
async fn seed_is_idempotent() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };
    let _guard = PG_LOCK.lock().await;

    let summary = client.reseed().await.unwrap();
    assert_eq!(summary.customers_inserted, 10);
    assert_eq!(summary.sales_inserted, 10);
    assert_eq!(client.row_count("customers").await.unwrap(), 10);
    assert_eq!(client.row_count("sales").await.unwrap(), 10);

    // a second run inserts nothing and the counts stay put
    let summary = client.seed().await.unwrap();
    assert_eq!(summary.customers_inserted, 0);
    assert_eq!(summary.sales_inserted, 0);
    assert_eq!(client.row_count("customers").await.unwrap(), 10);
    assert_eq!(client.row_count("sales").await.unwrap(), 10);
}

#[tokio::test]
async fn pushdown_matches_memory_over_seed() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };
    let _guard = PG_LOCK.lock().await;
    client.reseed().await.unwrap();

    let pg = PostgresBackend::new(client);
    let mem = MemoryBackend::from_seed();

    let products = pg.product_revenue().await.unwrap();
    assert_eq!(products, mem.product_revenue().await.unwrap());
    assert_eq!(products[0].product_name, "Laptop");
    assert_eq!(products[0].total_revenue, 9600.00);

    assert_eq!(
        pg.regional_summary().await.unwrap(),
        mem.regional_summary().await.unwrap()
    );
    assert_eq!(
        pg.monthly_revenue().await.unwrap(),
        mem.monthly_revenue().await.unwrap()
    );
    assert_eq!(
        pg.product_catalog().await.unwrap(),
        mem.product_catalog().await.unwrap()
    );

    let customers = pg.customer_stats().await.unwrap();
    assert_eq!(customers, mem.customer_stats().await.unwrap());
    assert_eq!(customers.len(), 9);
    assert_eq!(customers[0].customer_id, 101);
    assert_eq!(customers[0].name, "John Smith");
    assert_eq!(customers[0].order_count, 1);
    assert_eq!(customers[0].total_spent, 6000.00);
    assert!(customers.iter().all(|c| c.customer_id != 110));

    // averages go through floating point division on one side and numeric
    // division on the other; compare within a tolerance
    let pg_cats = pg.category_summary().await.unwrap();
    let mem_cats = mem.category_summary().await.unwrap();
    assert_eq!(pg_cats.len(), mem_cats.len());
    for (a, b) in pg_cats.iter().zip(&mem_cats) {
        assert_eq!(a.category, b.category);
        assert_eq!(a.order_count, b.order_count);
        assert_eq!(a.total_quantity, b.total_quantity);
        assert_eq!(a.total_revenue, b.total_revenue);
        assert!((a.avg_order_value - b.avg_order_value).abs() < 1e-9);
    }
}

#[tokio::test]
async fn write_modes_round_trip() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };

    // table name private to this test, no lock needed
    let table = "sales_import_roundtrip";
    let data = sales_import_table(&SEED_SALES).unwrap();

    let written = client
        .write_table(table, &data, WriteMode::Replace)
        .await
        .unwrap();
    assert_eq!(written, 10);

    let read_back = client.read_table(table).await.unwrap();
    assert_eq!(read_back.schema(), data.schema());
    assert_eq!(read_back.num_rows(), 10);

    // chunked scan, ordered by the first column (distinct dates), must
    // reassemble the exact rows
    let mut scan = client.scan_table(table, 4).await.unwrap();
    let mut rows = Vec::new();
    while let Some(chunk) = scan.next_chunk().await.unwrap() {
        assert_eq!(chunk.schema(), data.schema());
        rows.extend_from_slice(chunk.rows());
    }
    assert_eq!(rows.as_slice(), data.rows());

    let err = client
        .write_table(table, &data, WriteMode::Fail)
        .await
        .unwrap_err();
    assert!(matches!(err, PostgresError::TableExists(_)));

    let written = client
        .write_table(table, &data, WriteMode::Append)
        .await
        .unwrap();
    assert_eq!(written, 10);
    assert_eq!(client.row_count(table).await.unwrap(), 20);

    let other = MemTable::new(customers_table_schema());
    let err = client
        .write_table(table, &other, WriteMode::Append)
        .await
        .unwrap_err();
    assert!(matches!(err, PostgresError::SchemaMismatch { .. }));
}

#[tokio::test]
async fn chunked_scan_rebuilds_typed_sales() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };
    let _guard = PG_LOCK.lock().await;
    client.reseed().await.unwrap();

    // page the stored table in small chunks and convert each one back to
    // typed records
    let mut scan = client.scan_table("sales", 4).await.unwrap();
    let mut records = Vec::new();
    while let Some(chunk) = scan.next_chunk().await.unwrap() {
        records.extend(sales_records_from_table(&chunk).unwrap());
    }

    // the generic scan and the hand-written typed query agree
    assert_eq!(records, client.fetch_sales_slice(0, 10).await.unwrap());
    assert_eq!(records, *SEED_SALES);
}

#[tokio::test]
async fn atomic_append_rolls_back_on_constraint_violation() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };
    let _guard = PG_LOCK.lock().await;
    client.reseed().await.unwrap();

    let mut rows = vec![SEED_SALES[0].clone(), SEED_SALES[1].clone()];
    rows[1].quantity = 0; // violates check (quantity > 0)

    let err = client.append_sales_atomic(&rows).await.unwrap_err();
    assert!(err.to_string().contains("quantity"), "got: {err}");
    assert_eq!(client.row_count("sales").await.unwrap(), 10);

    // a valid batch commits, with ids continuing past the seeded ones
    let inserted = client
        .append_sales_atomic(&[SEED_SALES[0].clone()])
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(client.row_count("sales").await.unwrap(), 11);
    let appended = client.fetch_sales_slice(10, 5).await.unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].id, 11);

    // leave the shared tables freshly seeded
    client.reseed().await.unwrap();
}

#[tokio::test]
async fn sales_loads_honor_the_write_mode() {
    let Some(mut client) = connect_or_skip().await else {
        return;
    };
    let _guard = PG_LOCK.lock().await;
    client.reseed().await.unwrap();

    // the default mode refuses to write into the existing table
    let err = client
        .write_sales(&SEED_SALES, WriteMode::Fail)
        .await
        .unwrap_err();
    assert!(matches!(err, PostgresError::TableExists(_)));
    assert_eq!(client.row_count("sales").await.unwrap(), 10);

    // rows are replaced wholesale; ids continue from the sequence
    let two = SEED_SALES[..2].to_vec();
    let written = client.write_sales(&two, WriteMode::Replace).await.unwrap();
    assert_eq!(written, 2);
    let sales = client.fetch_sales_slice(0, 10).await.unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].product_name, "Laptop");
    assert_eq!(sales[1].product_name, "Monitor");
    assert!(sales[0].id > 10);

    let written = client.write_sales(&two, WriteMode::Append).await.unwrap();
    assert_eq!(written, 2);
    assert_eq!(client.row_count("sales").await.unwrap(), 4);

    // leave the shared tables freshly seeded
    client.reseed().await.unwrap();
}
