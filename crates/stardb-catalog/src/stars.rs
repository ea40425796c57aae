//! Star Identity Resolver
//!
//! Free-text object names resolve to one canonical star row through the
//! alias table. Unknown names are looked up at the name authority, and the
//! resulting star is stored with every identifier the authority returned.

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use stardb_core::compress_space;
use stardb_entities::{star, star_alias};
use tracing::{debug, info};

use crate::authority::{NameAuthority, ObjectInfo};
use crate::error::{CatalogError, CatalogResult};

/// The one object the name authority does not know about
pub const SUN: &str = "Sun";

/// Alias type of identifiers without a catalogue prefix
pub const NAME_ALIAS_TYPE: &str = "NAME";

const STRIPPED_PREFIXES: [&str; 3] = ["NAME", "*", "**"];

/// Canonical record used for the Sun
fn sun_record() -> (ObjectInfo, Vec<String>) {
    (
        ObjectInfo {
            main_id: SUN.to_string(),
            coord: "00 00 0.0 +00 00 0.0".to_string(),
            ra: 0.0,
            dec: 0.0,
        },
        vec![format!("{} {}", NAME_ALIAS_TYPE, SUN)],
    )
}

/// Split an identifier into `(alias_type, name)`
///
/// The type is the text before the first space. Identifiers of type
/// `NAME`, `*` and `**` are stored without the prefix; anything else keeps
/// its full text as the alias name. A single-word identifier has type
/// `NAME`.
pub fn split_identifier(identifier: &str) -> (String, String) {
    let identifier = compress_space(identifier);
    match identifier.split_once(' ') {
        Some((kind, rest)) if STRIPPED_PREFIXES.contains(&kind) => {
            (kind.to_string(), rest.to_string())
        }
        Some((kind, _)) => (kind.to_string(), identifier.clone()),
        None => (NAME_ALIAS_TYPE.to_string(), identifier),
    }
}

/// Find a star by any of its aliases, ignoring case and runs of
/// whitespace. A `NAME`, `*` or `**` prefix may be given or omitted.
pub(crate) async fn find_by_alias<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> CatalogResult<Option<star::Model>> {
    let compressed = compress_space(name);
    let (_, stripped) = split_identifier(&compressed);
    let full = compressed.to_lowercase();
    let stripped = stripped.to_lowercase();
    let candidates = if stripped == full {
        vec![full]
    } else {
        vec![full, stripped]
    };
    Ok(star::Entity::find()
        .inner_join(star_alias::Entity)
        .filter(
            Expr::expr(Func::lower(Expr::col((
                star_alias::Entity,
                star_alias::Column::Name,
            ))))
            .is_in(candidates),
        )
        .distinct()
        .order_by_asc(star::Column::Id)
        .one(db)
        .await?)
}

/// Outcome of [`StarResolver::resolve_or_create`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStar {
    pub star: star::Model,
    /// A new star row was inserted
    pub created: bool,
}

pub struct StarResolver<'a, C: ConnectionTrait> {
    db: &'a C,
    authority: &'a dyn NameAuthority,
}

impl<'a, C: ConnectionTrait> StarResolver<'a, C> {
    pub fn new(db: &'a C, authority: &'a dyn NameAuthority) -> Self {
        Self { db, authority }
    }

    /// Find a star by any of its aliases. Never contacts the name
    /// authority.
    pub async fn fetch(&self, name: &str) -> CatalogResult<Option<star::Model>> {
        find_by_alias(self.db, name).await
    }

    /// Find a star by its canonical name only
    pub async fn fetch_by_main_id(&self, name: &str) -> CatalogResult<Option<star::Model>> {
        Ok(star::Entity::find()
            .filter(star::Column::Name.eq(compress_space(name)))
            .one(self.db)
            .await?)
    }

    pub async fn aliases(&self, star_id: i32) -> CatalogResult<Vec<star_alias::Model>> {
        Ok(star_alias::Entity::find()
            .filter(star_alias::Column::StarId.eq(star_id))
            .all(self.db)
            .await?)
    }

    async fn add_alias(&self, star_id: i32, identifier: &str) -> CatalogResult<star_alias::Model> {
        let (alias_type, name) = split_identifier(identifier);
        Ok(star_alias::ActiveModel {
            star_id: Set(star_id),
            alias_type: Set(alias_type),
            name: Set(name),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Resolve `name` to a star, creating the star from the name authority
    /// when no alias matches.
    ///
    /// Aliases are inserted as returned by the authority; they are not
    /// checked against aliases already held by other stars.
    pub async fn resolve_or_create(&self, name: &str) -> CatalogResult<ResolvedStar> {
        let name = compress_space(name);
        if name.is_empty() {
            return Err(CatalogError::MissingRequiredField {
                operation: "resolve_star",
                field: "name",
            });
        }
        if let Some(star) = self.fetch(&name).await? {
            return Ok(ResolvedStar {
                star,
                created: false,
            });
        }

        let ids = self.authority.lookup_ids(&name).await?;
        let info = self.authority.lookup_info(&name).await?;
        let (info, ids) = match (info, ids) {
            (Some(info), Some(ids)) if !ids.is_empty() => (info, ids),
            _ if name == SUN => sun_record(),
            _ => return Err(CatalogError::UnknownObject(name)),
        };

        // Known under another name: grow its alias set
        if let Some(star) = self.fetch_by_main_id(&info.main_id).await? {
            self.add_alias(star.id, &name).await?;
            debug!("'{}' attached as alias of '{}'", name, star.name);
            return Ok(ResolvedStar {
                star,
                created: false,
            });
        }

        let star = star::ActiveModel {
            name: Set(info.main_id.clone()),
            coord: Set(info.coord.clone()),
            ra_deg: Set(info.ra),
            dec_deg: Set(info.dec),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let lowered = name.to_lowercase();
        let mut echoed = false;
        for id in &ids {
            let alias = self.add_alias(star.id, id).await?;
            if alias.name.to_lowercase() == lowered || compress_space(id).to_lowercase() == lowered
            {
                echoed = true;
            }
        }
        if !echoed {
            self.add_alias(star.id, &name).await?;
        }

        info!(
            "Inserted star '{}' for '{}' with {} aliases",
            star.name,
            name,
            ids.len() + usize::from(!echoed)
        );
        Ok(ResolvedStar {
            star,
            created: true,
        })
    }
}
