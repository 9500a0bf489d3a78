//! Database tests

use super::*;
use crate::models::*;

fn credential() -> NewCredential {
    NewCredential {
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        must_reset_password: false,
        force_unverified: false,
    }
}

fn user_fields(name: &str, email: &str) -> UserFields {
    UserFields {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_users().unwrap().is_empty());
    assert!(db.list_cities().unwrap().is_empty());

    let counts = db.counts().unwrap();
    assert_eq!(counts.cases, 0);
    assert_eq!(counts.townships, 0);
}

#[test]
fn test_user_create_defaults() {
    let db = Database::in_memory().unwrap();
    let id = db
        .create_user(&user_fields("王小明", " Ming@Example.com "), &credential())
        .unwrap();

    let user = db.get_user(id).unwrap().unwrap();
    assert_eq!(user.email, "ming@example.com");
    assert_eq!(user.role, Role::User);
    assert!(!user.is_verified);
    assert!(!user.must_reset_password);
    assert!(user.password_hash.starts_with("$argon2id"));

    // Lookup is case-insensitive
    let found = db.find_user_by_email("MING@example.com").unwrap().unwrap();
    assert_eq!(found.id, id);
}

#[test]
fn test_user_force_unverified() {
    let db = Database::in_memory().unwrap();
    let mut fields = user_fields("A", "a@example.com");
    fields.is_verified = Some(true);
    let cred = NewCredential {
        force_unverified: true,
        must_reset_password: true,
        ..credential()
    };

    let id = db.create_user(&fields, &cred).unwrap();
    let user = db.get_user(id).unwrap().unwrap();
    assert!(!user.is_verified);
    assert!(user.must_reset_password);
}

#[test]
fn test_user_sparse_update_keeps_omitted_fields() {
    let db = Database::in_memory().unwrap();
    let mut fields = user_fields("王小明", "ming@example.com");
    fields.phone = Some("02-1234".to_string());
    fields.work_area = Some(WorkArea::North);
    let id = db.create_user(&fields, &credential()).unwrap();
    let before = db.get_user(id).unwrap().unwrap();

    db.update_user(
        id,
        &UserFields {
            mobile: Some("0912".to_string()),
            role: Some(Role::Admin),
            ..Default::default()
        },
    )
    .unwrap();

    let after = db.get_user(id).unwrap().unwrap();
    assert_eq!(after.phone.as_deref(), Some("02-1234"));
    assert_eq!(after.work_area, Some(WorkArea::North));
    assert_eq!(after.mobile.as_deref(), Some("0912"));
    assert_eq!(after.role, Role::Admin);
    assert_eq!(after.password_hash, before.password_hash);
}

#[test]
fn test_user_email_unique() {
    let db = Database::in_memory().unwrap();
    db.create_user(&user_fields("A", "same@example.com"), &credential())
        .unwrap();
    let result = db.create_user(&user_fields("B", "same@example.com"), &credential());
    assert!(result.is_err());
}

#[test]
fn test_find_user_by_name_prefers_name_over_nickname() {
    let db = Database::in_memory().unwrap();
    let mut first = user_fields("小明", "first@example.com");
    first.nickname = Some("阿明".to_string());
    let first_id = db.create_user(&first, &credential()).unwrap();

    let mut second = user_fields("王大明", "second@example.com");
    second.nickname = Some("小明".to_string());
    db.create_user(&second, &credential()).unwrap();

    assert_eq!(db.find_user_by_name("小明").unwrap().unwrap().id, first_id);
    assert_eq!(db.find_user_by_name("阿明").unwrap().unwrap().id, first_id);
    assert!(db.find_user_by_name("nobody").unwrap().is_none());
}

#[test]
fn test_city_crud_and_unique_name() {
    let db = Database::in_memory().unwrap();
    let taipei = db.create_city("台北市").unwrap();
    db.create_city("高雄市").unwrap();

    assert!(db.create_city("台北市").is_err());
    assert_eq!(db.find_city_by_name("台北市").unwrap().unwrap().id, taipei);

    let names: Vec<String> = db.list_cities().unwrap().into_iter().map(|c| c.name).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_township_scoped_by_city() {
    let db = Database::in_memory().unwrap();
    let taipei = db.create_city("台北市").unwrap();
    let taichung = db.create_city("台中市").unwrap();

    let fields = |city_id: i64| TownshipFields {
        city_id: Some(city_id),
        name: Some("中正區".to_string()),
        ..Default::default()
    };
    let in_taipei = db.create_township(&fields(taipei)).unwrap();
    let in_taichung = db.create_township(&fields(taichung)).unwrap();

    // Same name in the same city is rejected
    assert!(db.create_township(&fields(taipei)).is_err());

    assert_eq!(
        db.find_township_by_name("中正區", Some(taichung))
            .unwrap()
            .unwrap()
            .id,
        in_taichung
    );
    assert_eq!(
        db.find_township_by_name("中正區", None).unwrap().unwrap().id,
        in_taipei
    );

    let listed = db.list_townships(Some(taipei)).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].city_name.as_deref(), Some("台北市"));
}

#[test]
fn test_township_offices_default_empty() {
    let db = Database::in_memory().unwrap();
    let city = db.create_city("台北市").unwrap();
    let id = db
        .create_township(&TownshipFields {
            city_id: Some(city),
            name: Some("大安區".to_string()),
            ..Default::default()
        })
        .unwrap();

    let township = db.get_township(id).unwrap().unwrap();
    assert_eq!(township.offices, TownshipOffices::default());

    db.update_township(
        id,
        &TownshipFields {
            offices: TownshipOffices {
                irs: Some("臺北國稅局".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();
    let township = db.get_township(id).unwrap().unwrap();
    assert_eq!(township.offices.irs.as_deref(), Some("臺北國稅局"));
    assert_eq!(township.name, "大安區");
}

#[test]
fn test_township_requires_city() {
    let db = Database::in_memory().unwrap();
    let result = db.create_township(&TownshipFields {
        name: Some("大安區".to_string()),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::InvalidData(_))));
}

#[test]
fn test_case_crud_with_refs() {
    let db = Database::in_memory().unwrap();
    let mut owner = user_fields("王小明", "ming@example.com");
    owner.nickname = Some("小明".to_string());
    let user_id = db.create_user(&owner, &credential()).unwrap();
    let city_id = db.create_city("台北市").unwrap();

    let id = db
        .create_case(&CaseFields {
            case_number: Some("A1".to_string()),
            city_id: Some(city_id),
            user_id: Some(user_id),
            ..Default::default()
        })
        .unwrap();

    let case = db.get_case_with_refs(id).unwrap().unwrap();
    assert_eq!(case.city_name.as_deref(), Some("台北市"));
    assert_eq!(case.township_name, None);
    let summary = case.user.unwrap();
    assert_eq!(summary.display_name(), "小明");

    db.update_case(
        id,
        &CaseFields {
            status: Some("進行中".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    let case = db.get_case(id).unwrap().unwrap();
    assert_eq!(case.status.as_deref(), Some("進行中"));
    assert_eq!(case.city_id, Some(city_id));
    assert_eq!(case.user_id, user_id);

    assert!(db.delete_case(id).unwrap());
    assert!(!db.delete_case(id).unwrap());
    assert!(db.get_case(id).unwrap().is_none());
}

#[test]
fn test_case_number_is_soft_key() {
    let db = Database::in_memory().unwrap();
    let user_id = db
        .create_user(&user_fields("A", "a@example.com"), &credential())
        .unwrap();
    let fields = CaseFields {
        case_number: Some("DUP".to_string()),
        user_id: Some(user_id),
        ..Default::default()
    };

    let first = db.create_case(&fields).unwrap();
    let second = db.create_case(&fields).unwrap();
    assert_ne!(first, second);

    // Lowest id is the match candidate
    assert_eq!(db.find_case_by_number("DUP").unwrap().unwrap().id, first);
}

#[test]
fn test_list_cases_newest_first() {
    let db = Database::in_memory().unwrap();
    let user_id = db
        .create_user(&user_fields("A", "a@example.com"), &credential())
        .unwrap();
    for number in ["C1", "C2", "C3"] {
        db.create_case(&CaseFields {
            case_number: Some(number.to_string()),
            user_id: Some(user_id),
            ..Default::default()
        })
        .unwrap();
    }

    let numbers: Vec<String> = db
        .list_cases()
        .unwrap()
        .into_iter()
        .map(|c| c.case.case_number)
        .collect();
    assert_eq!(numbers, vec!["C3", "C2", "C1"]);
}

#[test]
fn test_audit_log() {
    let db = Database::in_memory().unwrap();
    db.log_audit("admin@example.com", "import", Some("cities"), None, Some("{\"success\":2}"))
        .unwrap();
    db.log_audit("admin@example.com", "export", Some("cities"), None, None)
        .unwrap();

    let entries = db.list_audit_log(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "export");
    assert_eq!(entries[1].details.as_deref(), Some("{\"success\":2}"));
}

#[test]
fn test_encrypted_database_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encrypted.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        db.create_city("台北市").unwrap();
    }

    let db = Database::new_with_key(path, Some("correct horse")).unwrap();
    assert_eq!(db.list_cities().unwrap().len(), 1);

    assert!(Database::new_with_key(path, Some("wrong passphrase")).is_err());
}
