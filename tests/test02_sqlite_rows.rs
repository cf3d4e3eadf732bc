#![cfg(feature = "sqlite")]

use sql_bridge::prelude::*;

async fn status_db() -> Result<Database, SqlBridgeError> {
    let mut db = Database::connect(ConnectOptions::sqlite(":memory:").with_prefix("p_")).await?;
    db.create_table(
        "status",
        &TableSchema::from_json_str(
            r#"{"time": ["int", null, 1], "station": "string|16", "temp": ["float", null]}"#,
        )?,
        CreateOptions::default(),
    )
    .await?;
    Ok(db)
}

#[tokio::test]
async fn scenario_rows_come_back_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    db.insert_row("status", &row! { "time" => 2, "station" => "A", "temp" => 21.5 }, InsertMode::Insert)
        .await?;
    db.insert_row("status", &row! { "time" => 1, "station" => "A", "temp" => 20.0 }, InsertMode::Insert)
        .await?;

    let rows = db
        .fetch_all("SELECT * FROM {status} ORDER BY time", ())
        .await?
        .expect("throwing mode");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.results[0].get("time"), Some(&RowValues::Int(1)));
    assert_eq!(rows.results[1].get("time"), Some(&RowValues::Int(2)));
    assert_eq!(rows.results[1].get("temp"), Some(&RowValues::Float(21.5)));
    assert_eq!(
        rows.get_column_names().map(|names| names.as_slice().to_vec()),
        Some(vec!["time".to_string(), "station".to_string(), "temp".to_string()])
    );
    Ok(())
}

#[tokio::test]
async fn mismatched_batch_inserts_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    let before = db.query_count();
    let err = db
        .insert(
            "status",
            &[
                row! { "time" => 1, "station" => "A" },
                row! { "time" => 2, "temp" => 3.0 },
            ],
            InsertMode::Insert,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::SchemaMismatch(_)));
    assert_eq!(db.query_count(), before);
    assert_eq!(
        db.scalar("SELECT COUNT(*) FROM {status}", ()).await?,
        Some(RowValues::Int(0))
    );
    Ok(())
}

#[tokio::test]
async fn hostile_values_are_stored_verbatim() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    let hostile = "A'); DROP TABLE p_status; --";
    db.insert_row("status", &row! { "time" => 1, "station" => hostile }, InsertMode::Insert)
        .await?;
    db.update(
        "status",
        &row! { "temp" => "1; DELETE FROM p_status" },
        &row! { "station" => hostile },
    )
    .await?;

    assert!(db.table_exists("status").await?);
    let row = db
        .fetch_one("SELECT station, temp FROM {status} WHERE time = ?", vec![RowValues::Int(1)])
        .await?
        .expect("row");
    assert_eq!(row.get("station").and_then(RowValues::as_text), Some(hostile));
    assert_eq!(
        row.get("temp").and_then(RowValues::as_text),
        Some("1; DELETE FROM p_status")
    );
    Ok(())
}

#[tokio::test]
async fn replace_overwrites_on_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    db.insert_row("status", &row! { "time" => 1, "station" => "A" }, InsertMode::Insert)
        .await?;
    db.insert_row("status", &row! { "time" => 1, "station" => "B" }, InsertMode::Replace)
        .await?;

    let keyed = db
        .fetch_keyed("SELECT time, station FROM {status}", ())
        .await?
        .unwrap_or_default();
    assert_eq!(keyed.len(), 1);
    assert_eq!(keyed["1"].get("station"), Some(&RowValues::from("B")));
    Ok(())
}

#[tokio::test]
async fn update_and_delete_by_equality() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    db.insert(
        "status",
        &[
            row! { "time" => 1, "station" => "A", "temp" => RowValues::Null },
            row! { "time" => 2, "station" => "A", "temp" => 5.0 },
            row! { "time" => 3, "station" => "B", "temp" => RowValues::Null },
        ],
        InsertMode::Insert,
    )
    .await?;
    assert_eq!(db.affected_rows(), 3);

    let changed = db
        .update(
            "status",
            &row! { "temp" => 0.0 },
            &row! { "station" => "A", "temp" => RowValues::Null },
        )
        .await?;
    assert_eq!(changed, Some(1));

    assert_eq!(db.delete("status", &row! { "station" => "A" }).await?, Some(2));
    assert_eq!(db.scalar("SELECT COUNT(*) FROM {status}", ()).await?, Some(RowValues::Int(1)));

    let err = db.delete("status", &RowMap::new()).await.unwrap_err();
    assert!(matches!(err, SqlBridgeError::EmptyOperand(_)));
    Ok(())
}

#[tokio::test]
async fn execute_reports_rows_and_insert_id() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::connect(ConnectOptions::sqlite(":memory:")).await?;
    db.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .await?;

    let outcome = db
        .execute(
            "INSERT INTO items (name) VALUES (?), (?)",
            vec![RowValues::from("a"), RowValues::from("b")],
        )
        .await?
        .expect("throwing mode");
    assert_eq!(outcome, ExecOutcome { affected_rows: 2, last_insert_id: 2 });
    assert_eq!(db.insert_id(), 2);

    let outcome = db
        .execute("UPDATE items SET name = ? WHERE id = ?", vec![RowValues::from("z"), RowValues::Int(9)])
        .await?
        .expect("throwing mode");
    assert_eq!(outcome, ExecOutcome { affected_rows: 0, last_insert_id: 0 });
    assert_eq!(db.insert_id(), 0);
    Ok(())
}

#[tokio::test]
async fn numeric_text_binds_as_integer() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::connect(ConnectOptions::sqlite(":memory:")).await?;
    db.execute_batch("CREATE TABLE n (v);").await?;
    db.execute("INSERT INTO n (v) VALUES (?), (?)", vec![RowValues::from("42"), RowValues::from("042")])
        .await?;

    let types = db
        .fetch_all("SELECT typeof(v) AS t FROM n ORDER BY rowid", ())
        .await?
        .unwrap_or_default();
    let types: Vec<&str> = types
        .iter()
        .filter_map(|row| row.get("t").and_then(RowValues::as_text))
        .collect();
    assert_eq!(types, ["integer", "text"]);
    Ok(())
}

#[tokio::test]
async fn named_parameters_bind_by_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    db.insert(
        "status",
        &[
            row! { "time" => 1, "station" => "A" },
            row! { "time" => 2, "station" => "B" },
            row! { "time" => 3, "station" => "A" },
        ],
        InsertMode::Insert,
    )
    .await?;

    let count = db
        .query("SELECT COUNT(*) FROM {status} WHERE station = :station AND time >= :from")
        .named([("from", RowValues::Int(2)), (":station", RowValues::from("A"))])
        .scalar()
        .await?;
    assert_eq!(count, Some(RowValues::Int(1)));

    let err = db
        .query("SELECT * FROM {status} WHERE station = :station")
        .named([("other", "A")])
        .fetch_all()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::ParameterError(_)));

    let err = db
        .query("SELECT * FROM {status} WHERE station = :station AND time = ?")
        .named([("station", "A")])
        .fetch_all()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::ParameterError(_)));
    Ok(())
}

#[tokio::test]
async fn fetch_one_and_scalar_on_empty_results() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    assert!(db.fetch_one("SELECT * FROM {status}", ()).await?.is_none());
    assert_eq!(db.scalar("SELECT time FROM {status}", ()).await?, None);
    let rows = db
        .fetch_all("SELECT time, station FROM {status}", ())
        .await?
        .expect("throwing mode");
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn quoted_and_qualified_names_skip_the_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    assert_eq!(db.table_name("status"), "p_status");
    assert_eq!(db.table_name("{status}"), "p_status");
    assert_eq!(db.table_name("p_status"), "p_p_status");
    assert_eq!(db.table_name("main.status"), "main.status");

    db.execute_batch("CREATE TABLE \"Raw\" (v INTEGER);").await?;
    db.insert_row("\"Raw\"", &row! { "v" => 7 }, InsertMode::Insert)
        .await?;
    assert_eq!(
        db.scalar("SELECT v FROM \"Raw\"", ()).await?,
        Some(RowValues::Int(7))
    );
    assert!(db.table_exists("main.p_status").await?);
    Ok(())
}

#[tokio::test]
async fn json_payloads_insert_as_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = status_db().await?;
    let payload: serde_json::Value =
        serde_json::from_str(r#"{"time": 5, "station": "C", "temp": 18.25}"#)?;
    db.insert_row("status", &row_from_json(&payload)?, InsertMode::Insert)
        .await?;
    let temp = db
        .query("SELECT temp FROM {status} WHERE station = ?")
        .params(vec![RowValues::from("C")])
        .scalar()
        .await?;
    assert_eq!(temp, Some(RowValues::Float(18.25)));
    Ok(())
}

#[tokio::test]
async fn prefix_leading_the_table_name_resolves_like_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::connect(ConnectOptions::sqlite(":memory:").with_prefix("solar")).await?;
    db.create_table(
        "solarpanels",
        &TableSchema::new().column("v", "int"),
        CreateOptions::default(),
    )
    .await?;
    db.insert_row("solarpanels", &row! { "v" => 3 }, InsertMode::Insert)
        .await?;

    assert_eq!(db.table_name("solarpanels"), "solarsolarpanels");
    assert_eq!(db.list_tables().await?, ["solarsolarpanels"]);
    let rows = db
        .fetch_all("SELECT * FROM {solarpanels}", ())
        .await?
        .expect("throwing mode");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.results[0].get("v"), Some(&RowValues::Int(3)));
    Ok(())
}
