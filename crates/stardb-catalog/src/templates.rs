//! Schema Template Store
//!
//! A template document holds one tagged region per structural kind:
//!
//! ```text
//! <MEASURE>
//! CREATE TABLE "dat_{name}" ( ... );
//! </MEASURE>
//! ```
//!
//! Tags sit alone on their line. `{name}` and `{id}` inside a region are
//! replaced with the datatype's validated name and row id. The registry
//! is built once at startup and shared by reference.

use sea_orm::DbBackend;
use stardb_entities::StructKind;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::TemplateError;
use crate::ident::DatatypeName;

const POSTGRES_TEMPLATES: &str = include_str!("../schema/postgres.sql");
const SQLITE_TEMPLATES: &str = include_str!("../schema/sqlite.sql");

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateParams<'a> {
    pub name: &'a DatatypeName,
    pub id: i32,
}

/// Instantiated DDL for one datatype table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ddl(String);

impl Ddl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The individual `;`-terminated statements
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.0.split(';').map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<StructKind, String>,
}

enum Tag<'a> {
    Open(&'a str),
    Close(&'a str),
}

fn tag(line: &str) -> Option<Tag<'_>> {
    let inner = line.strip_prefix('<')?.strip_suffix('>')?;
    if inner.is_empty() {
        return None;
    }
    match inner.strip_prefix('/') {
        Some(name) => Some(Tag::Close(name)),
        None => Some(Tag::Open(inner)),
    }
}

impl TemplateRegistry {
    /// Parse a template document
    pub fn parse(document: &str) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();
        let mut open: Option<(StructKind, &str, String)> = None;

        for line in document.lines() {
            let trimmed = line.trim();
            match (tag(trimmed), open.take()) {
                (Some(Tag::Open(name)), None) => {
                    let kind = StructKind::parse(name)
                        .ok_or_else(|| TemplateError::UnknownKind(name.to_string()))?;
                    open = Some((kind, name, String::new()));
                }
                (Some(Tag::Open(_)), Some((_, name, _))) => {
                    return Err(TemplateError::Unterminated(name.to_string()));
                }
                (Some(Tag::Close(found)), Some((kind, name, body))) => {
                    if found != name {
                        return Err(TemplateError::MismatchedClose {
                            open: name.to_string(),
                            found: found.to_string(),
                        });
                    }
                    templates.insert(kind, body);
                }
                (Some(Tag::Close(found)), None) => {
                    return Err(TemplateError::MismatchedClose {
                        open: String::new(),
                        found: found.to_string(),
                    });
                }
                (None, Some((kind, name, mut body))) => {
                    body.push_str(line);
                    body.push('\n');
                    open = Some((kind, name, body));
                }
                (None, None) => {}
            }
        }

        if let Some((_, name, _)) = open {
            return Err(TemplateError::Unterminated(name.to_string()));
        }
        debug!("Parsed {} table templates", templates.len());
        Ok(Self { templates })
    }

    /// Built-in templates for the given backend
    pub fn for_backend(backend: DbBackend) -> Result<Self, TemplateError> {
        match backend {
            DbBackend::Sqlite => Self::parse(SQLITE_TEMPLATES),
            _ => Self::parse(POSTGRES_TEMPLATES),
        }
    }

    /// Read a template document from disk
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let document = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&document)
    }

    pub fn has(&self, kind: StructKind) -> bool {
        self.templates.contains_key(&kind)
    }

    /// Substitute `{name}` and `{id}` into the template for `kind`
    pub fn instantiate(
        &self,
        kind: StructKind,
        params: &TemplateParams<'_>,
    ) -> Result<Ddl, TemplateError> {
        let template = self
            .templates
            .get(&kind)
            .ok_or(TemplateError::Missing(kind))?;
        Ok(Ddl(template
            .replace("{name}", params.name.as_str())
            .replace("{id}", &params.id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
-- comment outside any region
<MEASURE>
CREATE TABLE \"dat_{name}\" (property_id INTEGER, CHECK ({id} > 0));
CREATE INDEX \"idx_{name}\" ON \"dat_{name}\" (property_id);
</MEASURE>
<LABEL>
CREATE TABLE \"dat_{name}\" (value TEXT);
</LABEL>
";

    #[test]
    fn test_parse_and_instantiate() {
        let registry = TemplateRegistry::parse(DOC).unwrap();
        assert!(registry.has(StructKind::Measure));
        assert!(registry.has(StructKind::Label));
        assert!(!registry.has(StructKind::Timeseries));

        let name = DatatypeName::parse("teff").unwrap();
        let ddl = registry
            .instantiate(StructKind::Measure, &TemplateParams { name: &name, id: 7 })
            .unwrap();
        let statements: Vec<_> = ddl.statements().collect();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "CREATE TABLE \"dat_teff\" (property_id INTEGER, CHECK (7 > 0))"
        );
        assert!(!ddl.as_str().contains("comment"));
    }

    #[test]
    fn test_missing_kind() {
        let registry = TemplateRegistry::parse(DOC).unwrap();
        let name = DatatypeName::parse("flux").unwrap();
        assert!(matches!(
            registry.instantiate(StructKind::Timeseries, &TemplateParams { name: &name, id: 1 }),
            Err(TemplateError::Missing(StructKind::Timeseries))
        ));
    }

    #[test]
    fn test_unterminated_region() {
        let err = TemplateRegistry::parse("<MEASURE>\nCREATE TABLE x (a INT);\n").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated(ref k) if k == "MEASURE"));

        let err = TemplateRegistry::parse("<MEASURE>\n<LABEL>\n</LABEL>\n").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated(ref k) if k == "MEASURE"));
    }

    #[test]
    fn test_mismatched_close() {
        let err = TemplateRegistry::parse("<MEASURE>\nx;\n</LABEL>\n").unwrap_err();
        assert!(matches!(err, TemplateError::MismatchedClose { .. }));
    }

    #[test]
    fn test_unknown_kind() {
        let err = TemplateRegistry::parse("<SPECTRUM>\nx;\n</SPECTRUM>\n").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownKind(ref k) if k == "SPECTRUM"));
    }

    #[test]
    fn test_builtin_documents_cover_every_kind() {
        for backend in [DbBackend::Sqlite, DbBackend::Postgres] {
            let registry = TemplateRegistry::for_backend(backend).unwrap();
            for kind in [StructKind::Measure, StructKind::Label, StructKind::Timeseries] {
                assert!(registry.has(kind), "{:?} lacks {}", backend, kind);
            }
        }
    }
}
