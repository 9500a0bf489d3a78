//! Reference resolution for city, township and responsible-person columns
//!
//! An identifier, when present, is authoritative: if it does not resolve the
//! row fails, with no fallback to the name column.

use super::normalize::{CaseDraft, RefInput, TownshipDraft, UserRefInput};
use super::{LookupKey, RowError};
use crate::models::City;
use crate::store::EntityStore;

/// Who is responsible for a case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responsible {
    /// Named on the row (by ID, Email or name)
    Explicit(i64),
    /// Not named: the importing caller, applied only when a case is created
    Caller,
}

/// Resolved references of a case row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRefs {
    pub city_id: Option<i64>,
    pub township_id: Option<i64>,
    pub responsible: Responsible,
}

/// Identifiers are integers; anything else can never match
fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn resolve_city<S: EntityStore + ?Sized>(
    store: &S,
    input: &RefInput,
) -> Result<Option<City>, RowError> {
    if let Some(raw) = &input.id {
        let city = match parse_id(raw) {
            Some(id) => store.city_by_id(id)?,
            None => None,
        };
        return city
            .map(Some)
            .ok_or_else(|| RowError::not_found("城市", LookupKey::Id, raw));
    }

    if let Some(name) = &input.name {
        return store
            .city_by_name(name)?
            .map(Some)
            .ok_or_else(|| RowError::not_found("城市", LookupKey::Name, name));
    }

    Ok(None)
}

/// Resolve the (required) city of a township row
pub fn resolve_township_city<S: EntityStore + ?Sized>(
    store: &S,
    draft: &TownshipDraft,
) -> Result<City, RowError> {
    resolve_city(store, &draft.city)?.ok_or(RowError::MissingRequiredField("城市或城市ID"))
}

fn resolve_responsible<S: EntityStore + ?Sized>(
    store: &S,
    input: &UserRefInput,
) -> Result<Responsible, RowError> {
    let user = if let Some(raw) = &input.id {
        let user = match parse_id(raw) {
            Some(id) => store.user_by_id(id)?,
            None => None,
        };
        user.ok_or_else(|| RowError::not_found("負責人", LookupKey::Id, raw))?
    } else if let Some(email) = &input.email {
        store
            .user_by_email(email)?
            .ok_or_else(|| RowError::not_found("負責人", LookupKey::Email, email))?
    } else if let Some(name) = &input.name {
        store
            .user_by_name(name)?
            .ok_or_else(|| RowError::not_found("負責人", LookupKey::Name, name))?
    } else {
        return Ok(Responsible::Caller);
    };

    Ok(Responsible::Explicit(user.id))
}

/// Resolve city, township and responsible person of a case row.
///
/// A township name is looked up within the resolved city when there is one.
/// An unresolved city is back-filled from the township's city.
pub fn resolve_case_refs<S: EntityStore + ?Sized>(
    store: &S,
    draft: &CaseDraft,
) -> Result<CaseRefs, RowError> {
    let city = resolve_city(store, &draft.city)?;
    let city_id = city.as_ref().map(|c| c.id);

    let township = if let Some(raw) = &draft.township.id {
        let township = match parse_id(raw) {
            Some(id) => store.township_by_id(id)?,
            None => None,
        };
        Some(township.ok_or_else(|| RowError::not_found("鄉鎮", LookupKey::Id, raw))?)
    } else if let Some(name) = &draft.township.name {
        Some(
            store
                .township_by_name(name, city_id)?
                .ok_or_else(|| RowError::not_found("鄉鎮", LookupKey::Name, name))?,
        )
    } else {
        None
    };

    let city_id = city_id.or_else(|| township.as_ref().map(|t| t.city_id));

    Ok(CaseRefs {
        city_id,
        township_id: township.map(|t| t.id),
        responsible: resolve_responsible(store, &draft.user)?,
    })
}

/// Resolve references given directly by identifier, as the case API does.
///
/// Same rules as a spreadsheet row: unknown ids fail, a township back-fills
/// its city, and no responsible person means the caller.
pub fn resolve_case_ids<S: EntityStore + ?Sized>(
    store: &S,
    city_id: Option<i64>,
    township_id: Option<i64>,
    user_id: Option<i64>,
) -> Result<CaseRefs, RowError> {
    let draft = CaseDraft {
        city: RefInput {
            id: city_id.map(|id| id.to_string()),
            name: None,
        },
        township: RefInput {
            id: township_id.map(|id| id.to_string()),
            name: None,
        },
        user: UserRefInput {
            id: user_id.map(|id| id.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    resolve_case_refs(store, &draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{NewCredential, TownshipFields, UserFields};

    fn seed_user(db: &Database) -> i64 {
        db.create_user(
            &UserFields {
                name: Some("王小明".to_string()),
                email: Some("ming@example.com".to_string()),
                ..Default::default()
            },
            &NewCredential {
                password_hash: "$argon2id$stub".to_string(),
                must_reset_password: false,
                force_unverified: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_non_integer_id_never_matches() {
        let db = Database::in_memory().unwrap();
        db.create_city("台北市").unwrap();

        let draft = CaseDraft {
            city: RefInput {
                id: Some("abc".to_string()),
                name: Some("台北市".to_string()),
            },
            ..Default::default()
        };
        let err = resolve_case_refs(&db, &draft).unwrap_err();
        assert_eq!(err.to_string(), "找不到ID為 \"abc\" 的城市");
    }

    #[test]
    fn test_township_backfills_city() {
        let db = Database::in_memory().unwrap();
        let city = db.create_city("台北市").unwrap();
        let township = db
            .create_township(&TownshipFields {
                city_id: Some(city),
                name: Some("大安區".to_string()),
                ..Default::default()
            })
            .unwrap();

        let refs = resolve_case_ids(&db, None, Some(township), None).unwrap();
        assert_eq!(refs.city_id, Some(city));
        assert_eq!(refs.township_id, Some(township));
        assert_eq!(refs.responsible, Responsible::Caller);
    }

    #[test]
    fn test_explicit_city_wins_over_township_city() {
        let db = Database::in_memory().unwrap();
        let taipei = db.create_city("台北市").unwrap();
        let taichung = db.create_city("台中市").unwrap();
        let township = db
            .create_township(&TownshipFields {
                city_id: Some(taipei),
                name: Some("大安區".to_string()),
                ..Default::default()
            })
            .unwrap();

        let refs = resolve_case_ids(&db, Some(taichung), Some(township), None).unwrap();
        assert_eq!(refs.city_id, Some(taichung));
    }

    #[test]
    fn test_responsible_person_lookup_order() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db);

        let by_email = CaseDraft {
            user: UserRefInput {
                email: Some("ming@example.com".to_string()),
                name: Some("nobody".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            resolve_case_refs(&db, &by_email).unwrap().responsible,
            Responsible::Explicit(user)
        );

        let missing = resolve_case_ids(&db, None, None, Some(user + 1)).unwrap_err();
        assert!(matches!(
            missing,
            RowError::ReferenceNotFound {
                target: "負責人",
                key: LookupKey::Id,
                ..
            }
        ));
    }
}
