use sql_executor::{
    BindingType, Bindings, FetchMode, ExecOutcome, SqlExecutor, SqlValue, SqliteConnection,
    SqliteConnectionProvider,
};
use tempfile::TempDir;

async fn engine_in(dir: &TempDir) -> SqlExecutor<SqliteConnection> {
    let path = dir.path().join("test.db").to_string_lossy().into_owned();
    let provider = SqliteConnectionProvider::new(path).await.unwrap();
    SqlExecutor::new(provider.connection().await.unwrap())
}

async fn scalar(engine: &mut SqlExecutor<SqliteConnection>, query: &str, bindings: &Bindings) -> SqlValue {
    match engine.execute(query, bindings, FetchMode::Column(0)).await.unwrap() {
        ExecOutcome::Column(values) => values.into_iter().next().unwrap(),
        other => panic!("expected a column, got {other:?}"),
    }
}

#[tokio::test]
async fn like_tag_wraps_the_fragment_before_binding() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;
    let no_bindings = Bindings::new();

    engine
        .execute("CREATE TABLE t (name TEXT)", &no_bindings, FetchMode::All)
        .await
        .unwrap();
    for name in ["xabcx", "zzz", "abc"] {
        let mut bindings = Bindings::new();
        bindings.insert("name", SqlValue::Text(name.to_string()));
        engine
            .execute("INSERT INTO t VALUES (:name)", &bindings, FetchMode::All)
            .await
            .unwrap();
    }

    let mut bindings = Bindings::new();
    bindings.insert_tagged("pat", SqlValue::Text("abc".to_string()), BindingType::Like);
    let rows = engine
        .select_all("SELECT name FROM t WHERE name LIKE :pat ORDER BY name", &bindings)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("abc".to_string())));
    assert_eq!(rows[1].get("name"), Some(&SqlValue::Text("xabcx".to_string())));
}

#[tokio::test]
async fn date_and_time_tags_bind_formatted_text() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;

    let mut bindings = Bindings::new();
    bindings.insert_tagged("d", SqlValue::Int(0), BindingType::Date);
    let value = scalar(&mut engine, "SELECT :d AS d", &bindings).await;
    assert_eq!(value, SqlValue::Text("1970-01-01".to_string()));

    let mut bindings = Bindings::new();
    bindings.insert_tagged("t", SqlValue::Int(86_400), BindingType::Time);
    let value = scalar(&mut engine, "SELECT :t AS t", &bindings).await;
    assert_eq!(value, SqlValue::Text("1970-01-02 00:00:00.000000".to_string()));
}

#[tokio::test]
async fn int_tag_coerces_loose_text() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;

    let mut bindings = Bindings::new();
    bindings.insert_tagged("n", SqlValue::Text("42abc".to_string()), BindingType::Int);
    let value = scalar(&mut engine, "SELECT :n AS n", &bindings).await;
    assert_eq!(value, SqlValue::Int(42));
}

#[tokio::test]
async fn null_tag_discards_the_supplied_value() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;

    let mut bindings = Bindings::new();
    bindings.insert_tagged("v", SqlValue::Int(99), BindingType::Null);
    let value = scalar(&mut engine, "SELECT :v AS v", &bindings).await;
    assert_eq!(value, SqlValue::Null);
}

#[tokio::test]
async fn bool_tag_binds_truthiness() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;

    let mut bindings = Bindings::new();
    bindings.insert_tagged("b", SqlValue::Text("0".to_string()), BindingType::Bool);
    let value = scalar(&mut engine, "SELECT :b AS b", &bindings).await;
    // Booleans are integers in SQLite storage
    assert_eq!(value, SqlValue::Int(0));

    let mut bindings = Bindings::new();
    bindings.insert_tagged("b", SqlValue::Text("yes".to_string()), BindingType::Bool);
    let value = scalar(&mut engine, "SELECT :b AS b", &bindings).await;
    assert_eq!(value, SqlValue::Int(1));
}

#[tokio::test]
async fn lob_tag_binds_binary_data() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;
    let no_bindings = Bindings::new();

    engine
        .execute("CREATE TABLE payload (data BLOB)", &no_bindings, FetchMode::All)
        .await
        .unwrap();
    let mut bindings = Bindings::new();
    bindings.insert_tagged(
        "data",
        SqlValue::Text("raw bytes".to_string()),
        BindingType::Lob,
    );
    engine
        .execute("INSERT INTO payload VALUES (:data)", &bindings, FetchMode::All)
        .await
        .unwrap();

    let value = scalar(&mut engine, "SELECT data FROM payload", &no_bindings).await;
    assert_eq!(value, SqlValue::Blob(b"raw bytes".to_vec()));
}

#[tokio::test]
async fn bare_bindings_keep_their_native_type() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir).await;

    let mut bindings = Bindings::new();
    bindings.insert("f", SqlValue::Float(1.5));
    let value = scalar(&mut engine, "SELECT :f AS f", &bindings).await;
    assert_eq!(value, SqlValue::Float(1.5));
}
