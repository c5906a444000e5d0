//! Mapped statements and result mapping metadata.
//!
//! A [`MappedStatement`] is an identified, pre-resolved executable command.
//! It is immutable after construction and owned by the
//! [`Configuration`](crate::config::Configuration) registry.

use std::sync::Arc;

use relmap_driver::ResultSetType;

use crate::error::{Error, Result};
use crate::executor::KeyGenerator;
use crate::parameter::Parameter;
use crate::type_handler::TargetType;

/// The kind of command a mapped statement executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlCommandType {
    /// A read.
    Select,
    /// An insert.
    Insert,
    /// An update.
    Update,
    /// A delete.
    Delete,
}

impl SqlCommandType {
    /// Returns `true` for the mutating command kinds.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Select)
    }
}

/// One column-to-property mapping within a result map.
#[derive(Debug, Clone)]
pub struct ResultMapping {
    /// The source column name.
    pub column: String,
    /// The target property path.
    pub property: String,
    /// The declared target type the column converts to.
    pub target_type: TargetType,
}

impl ResultMapping {
    /// Create a mapping.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        property: impl Into<String>,
        target_type: TargetType,
    ) -> Self {
        Self { column: column.into(), property: property.into(), target_type }
    }
}

/// How raw rows become mapped values.
///
/// With no explicit mappings, rows auto-map: a single-column row becomes a
/// scalar value, a multi-column row becomes an object keyed by column name.
#[derive(Debug, Clone)]
pub struct ResultMap {
    /// The result map id.
    pub id: String,
    /// Explicit column-to-property mappings; empty means auto-map.
    pub mappings: Vec<ResultMapping>,
}

impl ResultMap {
    /// An auto-mapping result map.
    #[must_use]
    pub fn auto(id: impl Into<String>) -> Self {
        Self { id: id.into(), mappings: Vec::new() }
    }

    /// A result map with explicit mappings.
    #[must_use]
    pub fn new(id: impl Into<String>, mappings: Vec<ResultMapping>) -> Self {
        Self { id: id.into(), mappings }
    }
}

/// SQL text bound to the parameter it executes with.
///
/// The simple statement handler carries inline text only; there are no
/// positional placeholders to bind.
#[derive(Debug, Clone)]
pub struct BoundSql {
    /// The executable SQL text.
    pub sql: String,
    /// The parameter the statement executes with.
    pub parameter: Parameter,
}

/// An identified, pre-resolved executable command.
#[derive(Debug)]
pub struct MappedStatement {
    id: String,
    sql: String,
    command_type: SqlCommandType,
    key_generator: KeyGenerator,
    key_properties: Vec<String>,
    key_columns: Vec<String>,
    use_cache: bool,
    flush_cache: bool,
    cache: Option<String>,
    result_map: Arc<ResultMap>,
    result_set_type: ResultSetType,
}

impl MappedStatement {
    /// Start a builder.
    #[must_use]
    pub fn builder(
        id: impl Into<String>,
        sql: impl Into<String>,
        command_type: SqlCommandType,
    ) -> MappedStatementBuilder {
        MappedStatementBuilder::new(id, sql, command_type)
    }

    /// The statement id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The command kind.
    #[must_use]
    pub const fn command_type(&self) -> SqlCommandType {
        self.command_type
    }

    /// The key generator bound to this statement.
    #[must_use]
    pub const fn key_generator(&self) -> &KeyGenerator {
        &self.key_generator
    }

    /// Target property paths for generated keys.
    #[must_use]
    pub fn key_properties(&self) -> &[String] {
        &self.key_properties
    }

    /// Source column names for generated keys, when declared.
    #[must_use]
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Whether select results participate in the namespace cache.
    #[must_use]
    pub const fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Whether executing this statement invalidates cached results first.
    #[must_use]
    pub const fn flush_cache(&self) -> bool {
        self.flush_cache
    }

    /// The namespace cache id this statement belongs to, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&str> {
        self.cache.as_deref()
    }

    /// The result map rows are mapped through.
    #[must_use]
    pub fn result_map(&self) -> &Arc<ResultMap> {
        &self.result_map
    }

    /// The declared result-set scrollability.
    #[must_use]
    pub const fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    /// Bind the SQL text to a parameter.
    #[must_use]
    pub fn bound_sql(&self, parameter: Parameter) -> BoundSql {
        BoundSql { sql: self.sql.clone(), parameter }
    }
}

/// Builder for [`MappedStatement`].
#[derive(Debug)]
pub struct MappedStatementBuilder {
    id: String,
    sql: String,
    command_type: SqlCommandType,
    key_generator: KeyGenerator,
    key_properties: Vec<String>,
    key_columns: Vec<String>,
    use_cache: bool,
    flush_cache: bool,
    cache: Option<String>,
    result_map: Option<Arc<ResultMap>>,
    result_set_type: ResultSetType,
}

impl MappedStatementBuilder {
    fn new(id: impl Into<String>, sql: impl Into<String>, command_type: SqlCommandType) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
            command_type,
            key_generator: KeyGenerator::None,
            key_properties: Vec::new(),
            key_columns: Vec::new(),
            // Selects cache by default; mutations flush by default.
            use_cache: !command_type.is_mutation(),
            flush_cache: command_type.is_mutation(),
            cache: None,
            result_map: None,
            result_set_type: ResultSetType::default(),
        }
    }

    /// Set the key generator.
    #[must_use]
    pub fn key_generator(mut self, key_generator: KeyGenerator) -> Self {
        self.key_generator = key_generator;
        self
    }

    /// Set the target property paths for generated keys.
    #[must_use]
    pub fn key_properties<S: Into<String>, I: IntoIterator<Item = S>>(mut self, props: I) -> Self {
        self.key_properties = props.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source column names for generated keys.
    #[must_use]
    pub fn key_columns<S: Into<String>, I: IntoIterator<Item = S>>(mut self, columns: I) -> Self {
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Override whether results participate in the namespace cache.
    #[must_use]
    pub const fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Override whether execution invalidates cached results first.
    #[must_use]
    pub const fn flush_cache(mut self, flush_cache: bool) -> Self {
        self.flush_cache = flush_cache;
        self
    }

    /// Attach the statement to a namespace cache.
    #[must_use]
    pub fn cache(mut self, cache_id: impl Into<String>) -> Self {
        self.cache = Some(cache_id.into());
        self
    }

    /// Set the result map.
    #[must_use]
    pub fn result_map(mut self, result_map: ResultMap) -> Self {
        self.result_map = Some(Arc::new(result_map));
        self
    }

    /// Set the declared result-set scrollability.
    #[must_use]
    pub const fn result_set_type(mut self, result_set_type: ResultSetType) -> Self {
        self.result_set_type = result_set_type;
        self
    }

    /// Build the statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if key columns are declared but their count
    /// does not match the key properties.
    pub fn build(self) -> Result<MappedStatement> {
        if !self.key_columns.is_empty() && self.key_columns.len() != self.key_properties.len() {
            return Err(Error::config(format!(
                "statement '{}': {} key columns declared for {} key properties",
                self.id,
                self.key_columns.len(),
                self.key_properties.len()
            )));
        }
        let result_map = self
            .result_map
            .unwrap_or_else(|| Arc::new(ResultMap::auto(format!("{}-auto", self.id))));
        Ok(MappedStatement {
            id: self.id,
            sql: self.sql,
            command_type: self.command_type,
            key_generator: self.key_generator,
            key_properties: self.key_properties,
            key_columns: self.key_columns,
            use_cache: self.use_cache,
            flush_cache: self.flush_cache,
            cache: self.cache,
            result_map,
            result_set_type: self.result_set_type,
        })
    }
}
