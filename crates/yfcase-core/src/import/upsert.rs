//! Create / update / conflict-skip decisions
//!
//! A row whose natural key matches a stored entity only updates it when the
//! row's `ID` column equals the stored id. Otherwise the row is rejected so a
//! spreadsheet can never silently overwrite an unrelated record.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use serde::Serialize;

use super::normalize::{CaseDraft, CityDraft, TownshipDraft, UserDraft};
use super::resolve::{CaseRefs, Responsible};
use super::{DuplicateKey, ImportPolicy, LookupKey, RowError};
use crate::error::{Error, Result};
use crate::models::{CallerIdentity, CaseFields, City, NewCredential, TownshipFields};
use crate::store::EntityStore;

/// What happened to a successfully imported row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "lowercase")]
pub enum RowOutcome {
    Created(i64),
    Updated(i64),
}

impl RowOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }
}

/// Hash a password into an argon2 PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Password(e.to_string()))?;
    Ok(hash.to_string())
}

fn id_matches(row_id: &Option<String>, id: i64) -> bool {
    row_id.as_deref().map(str::trim) == Some(id.to_string().as_str())
}

fn required<'a>(value: &'a Option<String>, label: &'static str) -> std::result::Result<&'a str, RowError> {
    value
        .as_deref()
        .ok_or(RowError::MissingRequiredField(label))
}

pub fn upsert_user<S: EntityStore + ?Sized>(
    store: &S,
    draft: &UserDraft,
    policy: &ImportPolicy,
) -> std::result::Result<RowOutcome, RowError> {
    let email = required(&draft.fields.email, "電子郵件")?;

    match store.user_by_email(email)? {
        Some(existing) if id_matches(&draft.row_id, existing.id) => {
            store.merge_user(existing.id, &draft.fields)?;
            Ok(RowOutcome::Updated(existing.id))
        }
        Some(_) => Err(RowError::DuplicateNaturalKey(DuplicateKey::Email(
            email.to_string(),
        ))),
        None => {
            let credential = NewCredential {
                password_hash: hash_password(&policy.default_password)?,
                must_reset_password: policy.require_password_reset,
                force_unverified: policy.force_unverified,
            };
            let id = store.insert_user(&draft.fields, &credential)?;
            Ok(RowOutcome::Created(id))
        }
    }
}

pub fn upsert_city<S: EntityStore + ?Sized>(
    store: &S,
    draft: &CityDraft,
) -> std::result::Result<RowOutcome, RowError> {
    let name = required(&draft.name, "城市名稱")?;

    match store.city_by_name(name)? {
        Some(existing) if id_matches(&draft.row_id, existing.id) => {
            store.merge_city(existing.id, Some(name))?;
            Ok(RowOutcome::Updated(existing.id))
        }
        Some(_) => Err(RowError::DuplicateNaturalKey(DuplicateKey::CityName(
            name.to_string(),
        ))),
        None => Ok(RowOutcome::Created(store.insert_city(name)?)),
    }
}

pub fn upsert_township<S: EntityStore + ?Sized>(
    store: &S,
    draft: &TownshipDraft,
    city: &City,
) -> std::result::Result<RowOutcome, RowError> {
    let name = required(&draft.fields.name, "鄉鎮名稱")?;
    let fields = TownshipFields {
        city_id: Some(city.id),
        ..draft.fields.clone()
    };

    match store.township_by_name(name, Some(city.id))? {
        Some(existing) if id_matches(&draft.row_id, existing.id) => {
            store.merge_township(existing.id, &fields)?;
            Ok(RowOutcome::Updated(existing.id))
        }
        Some(_) => Err(RowError::DuplicateNaturalKey(DuplicateKey::Township {
            city: city.name.clone(),
            name: name.to_string(),
        })),
        None => Ok(RowOutcome::Created(store.insert_township(&fields)?)),
    }
}

pub fn upsert_case<S: EntityStore + ?Sized>(
    store: &S,
    draft: &CaseDraft,
    refs: &CaseRefs,
    caller: &CallerIdentity,
) -> std::result::Result<RowOutcome, RowError> {
    let case_number = required(&draft.fields.case_number, "案號")?;
    let explicit_user = match refs.responsible {
        Responsible::Explicit(id) => Some(id),
        Responsible::Caller => None,
    };
    let mut fields = CaseFields {
        city_id: refs.city_id,
        township_id: refs.township_id,
        user_id: explicit_user,
        ..draft.fields.clone()
    };

    match store.case_by_number(case_number)? {
        Some(existing) if id_matches(&draft.row_id, existing.id) => {
            // Omitted responsible person keeps the stored one
            store.merge_case(existing.id, &fields)?;
            Ok(RowOutcome::Updated(existing.id))
        }
        Some(_) => Err(RowError::DuplicateNaturalKey(DuplicateKey::CaseNumber(
            case_number.to_string(),
        ))),
        None => {
            if fields.user_id.is_none() {
                let caller_id = caller
                    .user_id
                    .ok_or_else(|| RowError::not_found("負責人", LookupKey::Email, &caller.email))?;
                fields.user_id = Some(caller_id);
            }
            Ok(RowOutcome::Created(store.insert_case(&fields)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn test_hash_password_is_salted_phc() {
        let a = hash_password("123456").unwrap();
        let b = hash_password("123456").unwrap();
        assert!(a.starts_with("$argon2"));
        assert_ne!(a, b);

        let parsed = PasswordHash::new(&a).unwrap();
        assert!(Argon2::default()
            .verify_password(b"123456", &parsed)
            .is_ok());
    }

    #[test]
    fn test_id_matching_trims_and_compares_text() {
        assert!(id_matches(&Some(" 12 ".to_string()), 12));
        assert!(!id_matches(&Some("12.5".to_string()), 12));
        assert!(!id_matches(&None, 12));
    }

    #[test]
    fn test_row_outcome_serializes_tagged() {
        let json = serde_json::to_value(RowOutcome::Created(3)).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "created", "id": 3}));
    }
}
