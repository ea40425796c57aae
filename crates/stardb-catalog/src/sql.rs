//! Parameter binding for hand-assembled statements

use sea_orm::{DbBackend, Statement, Value};

/// Collects bound values while SQL text is assembled, emitting the
/// placeholder syntax of the connected backend.
pub(crate) struct Params {
    backend: DbBackend,
    values: Vec<Value>,
}

impl Params {
    pub(crate) fn new(backend: DbBackend) -> Self {
        Self {
            backend,
            values: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder
    pub(crate) fn bind<V: Into<Value>>(&mut self, value: V) -> String {
        self.values.push(value.into());
        match self.backend {
            DbBackend::Postgres => format!("${}", self.values.len()),
            _ => "?".to_string(),
        }
    }

    pub(crate) fn statement(self, sql: String) -> Statement {
        Statement::from_sql_and_values(self.backend, sql, self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_placeholders_are_numbered() {
        let mut params = Params::new(DbBackend::Postgres);
        assert_eq!(params.bind(1), "$1");
        assert_eq!(params.bind("x"), "$2");
    }

    #[test]
    fn test_sqlite_placeholders_are_positional() {
        let mut params = Params::new(DbBackend::Sqlite);
        assert_eq!(params.bind(1), "?");
        assert_eq!(params.bind(2.5), "?");
        let stmt = params.statement("SELECT ?, ?".to_string());
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(2));
    }
}
