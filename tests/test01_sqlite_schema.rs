#![cfg(feature = "sqlite")]

use sql_bridge::prelude::*;

async fn memory_db() -> Result<Database, SqlBridgeError> {
    Database::connect(ConnectOptions::sqlite(":memory:").with_prefix("p_")).await
}

#[tokio::test]
async fn create_table_and_normalized_columns() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;

    assert!(!db.table_exists("t").await?);
    let schema = TableSchema::new().column("a", "int").column("b", "string|32");
    db.create_table("t", &schema, CreateOptions::default()).await?;
    assert!(db.table_exists("t").await?);

    let columns = db.get_columns("t").await?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "a");
    assert_eq!(columns[0].type_name, "integer");
    assert!(!columns[0].nullable);
    assert_eq!(columns[1].name, "b");
    assert_eq!(columns[1].type_name, "string");

    assert_eq!(db.get_column_names("t").await?, vec!["a", "b"]);
    assert_eq!(db.list_tables().await?, vec!["p_t"]);

    let full = db.list_tables_full().await?.expect("throwing mode");
    assert_eq!(full.len(), 1);
    assert_eq!(
        full.get_column_names().and_then(|names| names.first().cloned()),
        Some("name".to_string())
    );
    assert_eq!(full.results[0].get("name").and_then(RowValues::as_text), Some("p_t"));
    assert!(
        full.results[0]
            .get("sql")
            .and_then(RowValues::as_text)
            .is_some_and(|sql| sql.starts_with("CREATE TABLE"))
    );
    Ok(())
}

#[tokio::test]
async fn autoincrement_keys_and_defaults_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    let schema = TableSchema::from_json_str(
        r#"{
            "id": "increment",
            "station": ["string|16", "main"],
            "temp": ["float", null],
            "note": "text"
        }"#,
    )?;
    db.create_table("sensors", &schema, CreateOptions::if_not_exists())
        .await?;

    let columns = db.get_columns("sensors").await?;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "station", "temp", "note"]);

    assert_eq!(columns[0].key, KeyRole::PrimaryAutoincrement);
    assert_eq!(columns[0].extra.as_deref(), Some("autoincrement"));
    assert_eq!(columns[1].default.as_deref(), Some("main"));
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);
    assert_eq!(columns[2].default, None);
    assert_eq!(columns[3].type_name, "text");
    Ok(())
}

#[tokio::test]
async fn every_portable_type_creates_a_table() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    let tokens = [
        "string", "string|8", "text", "int", "integer", "tinyint", "float", "double",
        "datetime", "decimal|10,2",
    ];
    let schema: TableSchema = tokens
        .iter()
        .enumerate()
        .map(|(idx, token)| (format!("c{idx}"), ColumnSpec::new(*token).nullable()))
        .collect();
    db.create_table("types", &schema, CreateOptions::default()).await?;

    for token in tokens {
        let once = db.dialect().resolve_type(token);
        assert_eq!(db.dialect().resolve_type(&once), once);
    }
    assert_eq!(db.get_columns("types").await?.len(), tokens.len());
    Ok(())
}

#[tokio::test]
async fn recreate_drops_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    let schema = TableSchema::new().column("v", "int");
    db.create_table("r", &schema, CreateOptions::default()).await?;
    db.insert_row("r", &row! { "v" => 1 }, InsertMode::Insert).await?;

    db.create_table("r", &schema, CreateOptions::recreate()).await?;
    let count = db.scalar("SELECT COUNT(*) FROM {r}", ()).await?;
    assert_eq!(count, Some(RowValues::Int(0)));

    db.drop_table("r", true).await?;
    assert!(!db.table_exists("r").await?);
    db.drop_table("r", true).await?;
    Ok(())
}

#[tokio::test]
async fn add_column_if_not_exists_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    db.create_table(
        "sensors",
        &TableSchema::new().column("station", "string|16"),
        CreateOptions::default(),
    )
    .await?;

    assert!(db.add_column_if_not_exists("sensors", "temp", "float").await?);
    let after_first = db.query_count();
    assert!(db.add_column_if_not_exists("sensors", "temp", "float").await?);
    // only the column lookup ran
    assert_eq!(db.query_count(), after_first + 1);
    assert_eq!(db.get_column_names("sensors").await?, vec!["station", "temp"]);

    let temp = &db.get_columns("sensors").await?[1];
    assert!(temp.nullable);

    assert!(db.drop_column_if_exists("sensors", "temp").await?);
    assert!(db.drop_column_if_exists("sensors", "temp").await?);
    assert_eq!(db.get_column_names("sensors").await?, vec!["station"]);
    Ok(())
}

#[tokio::test]
async fn add_column_with_default_is_not_null() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    db.create_table("s", &TableSchema::new().column("a", "int"), CreateOptions::default())
        .await?;
    db.add_column("s", "state", ColumnSpec::new("string|8").with_default("idle"))
        .await?;
    let state = &db.get_columns("s").await?[1];
    assert!(!state.nullable);
    assert_eq!(state.default.as_deref(), Some("idle"));

    db.drop_column("s", "state").await?;
    assert_eq!(db.get_column_names("s").await?, vec!["a"]);
    Ok(())
}

#[tokio::test]
async fn add_index_without_fields_runs_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    db.create_table(
        "status",
        &TableSchema::new().column("time", "int").column("station", "string|16"),
        CreateOptions::default(),
    )
    .await?;

    let before = db.query_count();
    let err = db.add_index("status", IndexKind::Index, &[]).await.unwrap_err();
    assert!(matches!(err, SqlBridgeError::EmptyOperand(_)));
    assert_eq!(db.query_count(), before);
    assert!(db.last_error().is_some());

    db.add_index("status", IndexKind::PrimaryKey, &["time", "station"])
        .await?;
    db.add_index("status", IndexKind::Index, &["station"]).await?;

    let indexes = db
        .fetch_all(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ? ORDER BY name",
            vec![RowValues::from("p_status")],
        )
        .await?
        .unwrap_or_default();
    let names: Vec<&str> = indexes
        .iter()
        .filter_map(|row| row.get("name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["p_status_station", "p_status_time_station"]);

    let dup = db
        .insert(
            "status",
            &[
                row! { "time" => 1, "station" => "A" },
                row! { "time" => 1, "station" => "A" },
            ],
            InsertMode::Insert,
        )
        .await;
    assert!(matches!(dup, Err(SqlBridgeError::Statement { .. })));
    Ok(())
}

#[tokio::test]
async fn truncate_resets_the_id_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    db.execute_batch(
        "CREATE TABLE {logs} (id INTEGER PRIMARY KEY AUTOINCREMENT, msg TEXT NOT NULL);",
    )
    .await?;
    db.insert(
        "logs",
        &[row! { "msg" => "a" }, row! { "msg" => "b" }],
        InsertMode::Insert,
    )
    .await?;
    assert_eq!(db.insert_id(), 2);

    assert_eq!(db.truncate("logs").await?, Some(2));
    db.insert_row("logs", &row! { "msg" => "c" }, InsertMode::Insert)
        .await?;
    assert_eq!(db.insert_id(), 1);
    Ok(())
}

#[tokio::test]
async fn truncate_without_sequence_table() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    db.create_table("plain", &TableSchema::new().column("v", "int"), CreateOptions::default())
        .await?;
    db.insert_row("plain", &row! { "v" => 1 }, InsertMode::Insert)
        .await?;
    assert_eq!(db.truncate("plain").await?, Some(1));
    assert_eq!(db.scalar("SELECT COUNT(*) FROM {plain}", ()).await?, Some(RowValues::Int(0)));
    Ok(())
}

#[tokio::test]
async fn empty_schema_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = memory_db().await?;
    let err = db
        .create_table("nothing", &TableSchema::new(), CreateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SqlBridgeError::EmptyOperand(_)));
    assert_eq!(db.query_count(), 0);
    Ok(())
}

#[test]
fn malformed_field_specs_are_rejected() {
    assert!(matches!(
        TableSchema::from_json_str(r#"{"a": ["int", 0, 1, "extra"]}"#),
        Err(SqlBridgeError::InvalidFieldSpec(_))
    ));
    assert!(matches!(
        TableSchema::from_json_str(r#"{"a": "int; DROP TABLE x"}"#),
        Err(SqlBridgeError::InvalidFieldSpec(_))
    ));
    assert!(TableSchema::from_json_str("[]").is_err());
}
