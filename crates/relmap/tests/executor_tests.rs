//! Executor integration tests against the scripted in-memory engine.

use std::sync::Arc;

use relmap::{
    param, CacheBuilder, Configuration, Executor, ExecutorType, KeyGenerator, MappedStatement,
    Parameter, RowBounds, SqlCommandType, BATCH_UPDATE_RETURN_VALUE,
};
use relmap_core::Value;
use relmap_driver::memory::{ExecutedCommand, MemoryEngine, ScriptedResult};
use relmap_driver::{shared, ColumnInfo, ColumnType};

fn id_columns() -> Vec<ColumnInfo> {
    vec![ColumnInfo::new("id", ColumnType::Integer)]
}

fn simple_executor(
    config: &Arc<Configuration>,
    engine: &Arc<MemoryEngine>,
) -> Box<dyn Executor> {
    config.new_executor(shared(engine.transaction()), ExecutorType::Simple)
}

fn select_users(config: &Arc<Configuration>) -> Arc<MappedStatement> {
    config
        .add_statement(
            MappedStatement::builder("users.findAll", "SELECT id FROM users", SqlCommandType::Select)
                .build()
                .unwrap(),
        )
        .unwrap()
}

fn script_users(engine: &MemoryEngine) {
    engine.script_query(
        "SELECT id FROM users",
        id_columns(),
        vec![vec![Value::Int(1)], vec![Value::Int(2)]],
    );
}

// ===== Session-local caching =====

#[test]
fn test_repeated_query_hits_local_cache() {
    let engine = MemoryEngine::new();
    script_users(&engine);
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    let first = executor.query(&find, Parameter::None, RowBounds::default()).unwrap();
    let second = executor.query(&find, Parameter::None, RowBounds::default()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, vec![Value::Int(1), Value::Int(2)]);
    // Only one physical query ran.
    assert_eq!(
        engine.log(),
        vec![ExecutedCommand::Query("SELECT id FROM users".to_string())]
    );
}

#[test]
fn test_update_clears_local_cache() {
    let engine = MemoryEngine::new();
    script_users(&engine);
    engine.script_update("DELETE FROM users", 2, None);
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let delete = config
        .add_statement(
            MappedStatement::builder("users.deleteAll", "DELETE FROM users", SqlCommandType::Delete)
                .build()
                .unwrap(),
        )
        .unwrap();
    let mut executor = simple_executor(&config, &engine);

    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();
    assert_eq!(executor.update(&delete, Parameter::None).unwrap(), 2);
    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();

    let queries = engine
        .log()
        .iter()
        .filter(|c| matches!(c, ExecutedCommand::Query(_)))
        .count();
    assert_eq!(queries, 2);
}

#[test]
fn test_is_cached_and_cache_key_identity() {
    let engine = MemoryEngine::new();
    script_users(&engine);
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    let key = executor
        .create_cache_key(&find, &Parameter::None, RowBounds::default())
        .unwrap();
    assert!(!executor.is_cached(&key));

    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();
    assert!(executor.is_cached(&key));

    // Equal components rebuild an equal key.
    let again = executor
        .create_cache_key(&find, &Parameter::None, RowBounds::default())
        .unwrap();
    assert_eq!(key, again);

    executor.clear_local_cache();
    assert!(!executor.is_cached(&key));
}

#[test]
fn test_cache_key_saturates_unbounded_window() {
    let engine = MemoryEngine::new();
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    let unbounded = executor
        .create_cache_key(&find, &Parameter::None, RowBounds::default())
        .unwrap();
    let bounded = executor
        .create_cache_key(&find, &Parameter::None, RowBounds::new(0, 1))
        .unwrap();

    // The no-limit sentinel folds in as i64::MAX, not a wrapped negative.
    assert!(unbounded.to_string().contains(&i64::MAX.to_string()));
    assert!(!unbounded.to_string().contains(":-1"));
    assert_ne!(unbounded, bounded);
}

// ===== Namespace (second-level) caching =====

#[test]
fn test_namespace_cache_shared_across_executors() {
    let config = Arc::new(Configuration::new("test"));
    config.add_cache(CacheBuilder::new("users").build().unwrap()).unwrap();
    let find = config
        .add_statement(
            MappedStatement::builder("users.findAll", "SELECT id FROM users", SqlCommandType::Select)
                .cache("users")
                .build()
                .unwrap(),
        )
        .unwrap();

    let engine_a = MemoryEngine::new();
    script_users(&engine_a);
    let mut executor_a = simple_executor(&config, &engine_a);
    let rows = executor_a.query(&find, Parameter::None, RowBounds::default()).unwrap();

    // The second engine has nothing scripted; the rows must come from the
    // shared namespace cache.
    let engine_b = MemoryEngine::new();
    let mut executor_b = simple_executor(&config, &engine_b);
    let cached = executor_b.query(&find, Parameter::None, RowBounds::default()).unwrap();

    assert_eq!(rows, cached);
    assert!(engine_b.log().is_empty());
}

#[test]
fn test_flush_cache_statement_invalidates_namespace() {
    let config = Arc::new(Configuration::new("test"));
    config.add_cache(CacheBuilder::new("users").build().unwrap()).unwrap();
    let find = config
        .add_statement(
            MappedStatement::builder("users.findAll", "SELECT id FROM users", SqlCommandType::Select)
                .cache("users")
                .build()
                .unwrap(),
        )
        .unwrap();
    let find_fresh = config
        .add_statement(
            MappedStatement::builder("users.findFresh", "SELECT id FROM users", SqlCommandType::Select)
                .cache("users")
                .flush_cache(true)
                .build()
                .unwrap(),
        )
        .unwrap();

    let engine = MemoryEngine::new();
    script_users(&engine);
    let mut executor = simple_executor(&config, &engine);
    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();

    // The flushing statement clears both caches, so it queries the driver.
    executor.query(&find_fresh, Parameter::None, RowBounds::default()).unwrap();
    let queries = engine
        .log()
        .iter()
        .filter(|c| matches!(c, ExecutedCommand::Query(_)))
        .count();
    assert_eq!(queries, 2);
}

// ===== Driver-returned keys =====

#[test]
fn test_driver_keys_sole_parameter() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(7)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("name", Value::from("a")), ("id", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    let affected = executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    assert_eq!(affected, 1);
    assert_eq!(user.read().unwrap().get_property("id"), Some(&Value::Int(7)));
}

#[test]
fn test_driver_keys_assign_rows_to_sequence_elements() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        3,
        Some(ScriptedResult::new(
            id_columns(),
            vec![vec![Value::Int(10)], vec![Value::Int(11)], vec![Value::Int(12)]],
        )),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insertAll", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let users = param(Value::Array(vec![
        Value::object([("id", Value::Null)]),
        Value::object([("id", Value::Null)]),
        Value::object([("id", Value::Null)]),
    ]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&users))).unwrap();

    let guard = users.read().unwrap();
    let items = guard.as_array().unwrap();
    assert_eq!(items[0].get_property("id"), Some(&Value::Int(10)));
    assert_eq!(items[1].get_property("id"), Some(&Value::Int(11)));
    assert_eq!(items[2].get_property("id"), Some(&Value::Int(12)));
}

#[test]
fn test_driver_keys_multi_parameter_requires_qualifier() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(7)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let parameter = Parameter::map([
        ("user", param(Value::object([("id", Value::Null)]))),
        ("audit", param(Value::object([("by", Value::from("x"))]))),
    ]);
    let mut executor = simple_executor(&config, &engine);

    let err = executor.update(&insert, parameter).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_driver_keys_qualified_multi_parameter() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(7)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["user.id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("id", Value::Null)]));
    let audit = param(Value::object([("by", Value::from("x"))]));
    let parameter =
        Parameter::map([("user", Arc::clone(&user)), ("audit", Arc::clone(&audit))]);
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, parameter).unwrap();

    assert_eq!(user.read().unwrap().get_property("id"), Some(&Value::Int(7)));
    assert_eq!(audit.read().unwrap().get_property("id"), None);
}

#[test]
fn test_driver_keys_skipped_without_key_properties() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(7)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("id", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();
    assert_eq!(user.read().unwrap().get_property("id"), Some(&Value::Null));
}

#[test]
fn test_driver_keys_skipped_when_columns_fewer_than_properties() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(7)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["id", "version"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("id", Value::Null), ("version", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    // One key column cannot satisfy two properties; nothing is assigned.
    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    let guard = user.read().unwrap();
    assert_eq!(guard.get_property("id"), Some(&Value::Null));
    assert_eq!(guard.get_property("version"), Some(&Value::Null));
}

// ===== Select-key =====

fn select_key_setup(before: bool) -> (Arc<MemoryEngine>, Arc<Configuration>, Arc<MappedStatement>) {
    let engine = MemoryEngine::new();
    engine.script_query("SELECT last_id", id_columns(), vec![vec![Value::Int(42)]]);
    engine.script_update("INSERT INTO users", 1, None);

    let config = Arc::new(Configuration::new("test"));
    let key_statement = config
        .add_statement(
            MappedStatement::builder("users.insert!selectKey", "SELECT last_id", SqlCommandType::Select)
                .key_properties(["id"])
                .use_cache(false)
                .build()
                .unwrap(),
        )
        .unwrap();
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::select_key(key_statement, before))
                .build()
                .unwrap(),
        )
        .unwrap();
    (engine, config, insert)
}

#[test]
fn test_select_key_after_execution() {
    let (engine, config, insert) = select_key_setup(false);
    let user = param(Value::object([("id", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    assert_eq!(user.read().unwrap().get_property("id"), Some(&Value::Int(42)));
    assert_eq!(
        engine.log(),
        vec![
            ExecutedCommand::Update("INSERT INTO users".to_string()),
            ExecutedCommand::Query("SELECT last_id".to_string()),
        ]
    );
}

#[test]
fn test_select_key_before_execution() {
    let (engine, config, insert) = select_key_setup(true);
    let user = param(Value::object([("id", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    assert_eq!(user.read().unwrap().get_property("id"), Some(&Value::Int(42)));
    // The key query ran before the insert.
    assert_eq!(
        engine.log(),
        vec![
            ExecutedCommand::Query("SELECT last_id".to_string()),
            ExecutedCommand::Update("INSERT INTO users".to_string()),
        ]
    );
}

#[test]
fn test_select_key_cardinality_errors() {
    let (engine, config, insert) = select_key_setup(false);
    let mut executor = simple_executor(&config, &engine);

    // Zero rows: no data.
    engine.script_query("SELECT last_id", id_columns(), vec![]);
    let err = executor
        .update(&insert, Parameter::object(Value::object([("id", Value::Null)])))
        .unwrap_err();
    assert!(err.is_cardinality());

    // Two rows: ambiguous key.
    engine.script_query(
        "SELECT last_id",
        id_columns(),
        vec![vec![Value::Int(1)], vec![Value::Int(2)]],
    );
    let err = executor
        .update(&insert, Parameter::object(Value::object([("id", Value::Null)])))
        .unwrap_err();
    assert!(err.is_cardinality());
}

fn multi_key_columns(first: &str, second: &str) -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new(first, ColumnType::Integer),
        ColumnInfo::new(second, ColumnType::Integer),
    ]
}

#[test]
fn test_select_key_multi_property_by_name() {
    let engine = MemoryEngine::new();
    engine.script_query(
        "SELECT last_keys",
        multi_key_columns("id", "version"),
        vec![vec![Value::Int(42), Value::Int(3)]],
    );
    engine.script_update("INSERT INTO users", 1, None);

    let config = Arc::new(Configuration::new("test"));
    let key_statement = config
        .add_statement(
            MappedStatement::builder("users.insert!selectKey", "SELECT last_keys", SqlCommandType::Select)
                .key_properties(["id", "version"])
                .use_cache(false)
                .build()
                .unwrap(),
        )
        .unwrap();
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::select_key(key_statement, false))
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("id", Value::Null), ("version", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    // Without declared key columns, values are read by property name.
    let guard = user.read().unwrap();
    assert_eq!(guard.get_property("id"), Some(&Value::Int(42)));
    assert_eq!(guard.get_property("version"), Some(&Value::Int(3)));
}

#[test]
fn test_select_key_columns_map_onto_properties() {
    let engine = MemoryEngine::new();
    engine.script_query(
        "SELECT last_keys",
        multi_key_columns("new_id", "new_rev"),
        vec![vec![Value::Int(7), Value::Int(1)]],
    );
    engine.script_update("INSERT INTO users", 1, None);

    let config = Arc::new(Configuration::new("test"));
    let key_statement = config
        .add_statement(
            MappedStatement::builder("users.insert!selectKey", "SELECT last_keys", SqlCommandType::Select)
                .key_properties(["id", "revision"])
                .key_columns(["new_id", "new_rev"])
                .use_cache(false)
                .build()
                .unwrap(),
        )
        .unwrap();
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::select_key(key_statement, false))
                .build()
                .unwrap(),
        )
        .unwrap();
    let user = param(Value::object([("id", Value::Null), ("revision", Value::Null)]));
    let mut executor = simple_executor(&config, &engine);

    executor.update(&insert, Parameter::Object(Arc::clone(&user))).unwrap();

    // Declared key columns pair with key properties in declaration order.
    let guard = user.read().unwrap();
    assert_eq!(guard.get_property("id"), Some(&Value::Int(7)));
    assert_eq!(guard.get_property("revision"), Some(&Value::Int(1)));
}

// ===== Batch executor =====

#[test]
fn test_batch_reuses_statement_and_flush_reports_counts() {
    let engine = MemoryEngine::new();
    engine.script_update("INSERT INTO users", 1, None);
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .build()
                .unwrap(),
        )
        .unwrap();
    let mut executor = config.new_executor(shared(engine.transaction()), ExecutorType::Batch);

    assert_eq!(
        executor.update(&insert, Parameter::None).unwrap(),
        BATCH_UPDATE_RETURN_VALUE
    );
    assert_eq!(
        executor.update(&insert, Parameter::None).unwrap(),
        BATCH_UPDATE_RETURN_VALUE
    );

    // Nothing physical ran yet.
    assert_eq!(
        engine.log(),
        vec![
            ExecutedCommand::Batch("INSERT INTO users".to_string()),
            ExecutedCommand::Batch("INSERT INTO users".to_string()),
        ]
    );

    let results = executor.flush_statements().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].statement_id, "users.insert");
    assert_eq!(results[0].update_counts, vec![1, 1]);
    assert_eq!(results[0].parameters.len(), 2);
}

#[test]
fn test_batch_query_flushes_pending_updates_first() {
    let engine = MemoryEngine::new();
    engine.script_update("INSERT INTO users", 1, None);
    script_users(&engine);
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .build()
                .unwrap(),
        )
        .unwrap();
    let find = select_users(&config);
    let mut executor = config.new_executor(shared(engine.transaction()), ExecutorType::Batch);

    executor.update(&insert, Parameter::None).unwrap();
    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();

    assert_eq!(
        engine.log(),
        vec![
            ExecutedCommand::Batch("INSERT INTO users".to_string()),
            ExecutedCommand::Update("INSERT INTO users".to_string()),
            ExecutedCommand::ExecuteBatch(1),
            ExecutedCommand::Query("SELECT id FROM users".to_string()),
        ]
    );
}

#[test]
fn test_batch_rollback_discards_pending() {
    let engine = MemoryEngine::new();
    engine.script_update("INSERT INTO users", 1, None);
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .build()
                .unwrap(),
        )
        .unwrap();
    let mut executor = config.new_executor(shared(engine.transaction()), ExecutorType::Batch);

    executor.update(&insert, Parameter::None).unwrap();
    executor.rollback(true).unwrap();

    assert_eq!(engine.rollback_count(), 1);
    // The enqueued command never executed.
    assert_eq!(
        engine.log(),
        vec![ExecutedCommand::Batch("INSERT INTO users".to_string())]
    );
    assert!(executor.flush_statements().unwrap().is_empty());
}

#[test]
fn test_batch_driver_keys_assigned_on_flush() {
    let engine = MemoryEngine::new();
    engine.script_update(
        "INSERT INTO users",
        1,
        Some(ScriptedResult::new(id_columns(), vec![vec![Value::Int(5)]])),
    );
    let config = Arc::new(Configuration::new("test"));
    let insert = config
        .add_statement(
            MappedStatement::builder("users.insert", "INSERT INTO users", SqlCommandType::Insert)
                .key_generator(KeyGenerator::DriverReturned)
                .key_properties(["id"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let first = param(Value::object([("id", Value::Null)]));
    let second = param(Value::object([("id", Value::Null)]));
    let mut executor = config.new_executor(shared(engine.transaction()), ExecutorType::Batch);

    executor.update(&insert, Parameter::Object(Arc::clone(&first))).unwrap();
    executor.update(&insert, Parameter::Object(Arc::clone(&second))).unwrap();
    executor.flush_statements().unwrap();

    // The batch accumulated one key row per command, assigned in order.
    assert_eq!(first.read().unwrap().get_property("id"), Some(&Value::Int(5)));
    assert_eq!(second.read().unwrap().get_property("id"), Some(&Value::Int(5)));
}

// ===== Lifecycle =====

#[test]
fn test_flush_with_nothing_pending_is_empty() {
    let engine = MemoryEngine::new();
    let config = Arc::new(Configuration::new("test"));
    let mut executor = simple_executor(&config, &engine);

    assert!(executor.flush_statements().unwrap().is_empty());
    assert!(engine.log().is_empty());
}

#[test]
fn test_commit_reaches_transaction() {
    let engine = MemoryEngine::new();
    let config = Arc::new(Configuration::new("test"));
    let mut executor = simple_executor(&config, &engine);

    executor.commit(true).unwrap();
    executor.commit(false).unwrap();
    assert_eq!(engine.commit_count(), 1);
}

#[test]
fn test_closed_executor_rejects_operations() {
    let engine = MemoryEngine::new();
    script_users(&engine);
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    executor.close(false);
    assert!(executor.is_closed());
    assert_eq!(engine.close_count(), 1);

    let err = executor.query(&find, Parameter::None, RowBounds::default()).unwrap_err();
    assert!(err.is_state());
    assert!(executor.commit(true).unwrap_err().is_state());
}

#[test]
fn test_error_leaves_executor_usable() {
    let engine = MemoryEngine::new();
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    // Nothing scripted: the first query fails at the driver.
    assert!(executor.query(&find, Parameter::None, RowBounds::default()).is_err());

    script_users(&engine);
    let rows = executor.query(&find, Parameter::None, RowBounds::default()).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_defer_load_resolves_from_local_cache() {
    let engine = MemoryEngine::new();
    script_users(&engine);
    let config = Arc::new(Configuration::new("test"));
    let find = select_users(&config);
    let mut executor = simple_executor(&config, &engine);

    let key = executor
        .create_cache_key(&find, &Parameter::None, RowBounds::default())
        .unwrap();
    let holder = param(Value::object([("ids", Value::Null)]));

    // Not cached yet: the load waits for the query to land.
    executor
        .defer_load(key.clone(), Arc::clone(&holder), "ids".to_string())
        .unwrap();
    assert_eq!(holder.read().unwrap().get_property("ids"), Some(&Value::Null));

    executor.query(&find, Parameter::None, RowBounds::default()).unwrap();
    assert_eq!(
        holder.read().unwrap().get_property("ids"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
    );
}
