//! Entity store seam used by the import engine and the exporter
//!
//! The engine only needs lookups, create, sparse update and full listings.
//! `Database` is the production implementation; tests can swap in their own.

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    Case, CaseFields, CaseWithRefs, City, NewCredential, Township, TownshipFields,
    TownshipWithCity, User, UserFields,
};

/// Persistence operations for users, cities, townships and cases
pub trait EntityStore {
    fn user_by_id(&self, id: i64) -> Result<Option<User>>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Match on name, falling back to nickname
    fn user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn insert_user(&self, fields: &UserFields, credential: &NewCredential) -> Result<i64>;
    fn merge_user(&self, id: i64, fields: &UserFields) -> Result<()>;
    fn all_users(&self) -> Result<Vec<User>>;

    fn city_by_id(&self, id: i64) -> Result<Option<City>>;
    fn city_by_name(&self, name: &str) -> Result<Option<City>>;
    fn insert_city(&self, name: &str) -> Result<i64>;
    fn merge_city(&self, id: i64, name: Option<&str>) -> Result<()>;
    fn all_cities(&self) -> Result<Vec<City>>;

    fn township_by_id(&self, id: i64) -> Result<Option<Township>>;
    /// Scoped to `city_id` when given
    fn township_by_name(&self, name: &str, city_id: Option<i64>) -> Result<Option<Township>>;
    fn insert_township(&self, fields: &TownshipFields) -> Result<i64>;
    fn merge_township(&self, id: i64, fields: &TownshipFields) -> Result<()>;
    fn all_townships(&self) -> Result<Vec<TownshipWithCity>>;

    fn case_by_id(&self, id: i64) -> Result<Option<Case>>;
    fn case_by_number(&self, case_number: &str) -> Result<Option<Case>>;
    fn insert_case(&self, fields: &CaseFields) -> Result<i64>;
    fn merge_case(&self, id: i64, fields: &CaseFields) -> Result<()>;
    fn all_cases(&self) -> Result<Vec<CaseWithRefs>>;
}

impl EntityStore for Database {
    fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user(id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_by_email(email)
    }

    fn user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.find_user_by_name(name)
    }

    fn insert_user(&self, fields: &UserFields, credential: &NewCredential) -> Result<i64> {
        self.create_user(fields, credential)
    }

    fn merge_user(&self, id: i64, fields: &UserFields) -> Result<()> {
        self.update_user(id, fields)
    }

    fn all_users(&self) -> Result<Vec<User>> {
        self.list_users()
    }

    fn city_by_id(&self, id: i64) -> Result<Option<City>> {
        self.get_city(id)
    }

    fn city_by_name(&self, name: &str) -> Result<Option<City>> {
        self.find_city_by_name(name)
    }

    fn insert_city(&self, name: &str) -> Result<i64> {
        self.create_city(name)
    }

    fn merge_city(&self, id: i64, name: Option<&str>) -> Result<()> {
        self.update_city(id, name)
    }

    fn all_cities(&self) -> Result<Vec<City>> {
        self.list_cities()
    }

    fn township_by_id(&self, id: i64) -> Result<Option<Township>> {
        self.get_township(id)
    }

    fn township_by_name(&self, name: &str, city_id: Option<i64>) -> Result<Option<Township>> {
        self.find_township_by_name(name, city_id)
    }

    fn insert_township(&self, fields: &TownshipFields) -> Result<i64> {
        self.create_township(fields)
    }

    fn merge_township(&self, id: i64, fields: &TownshipFields) -> Result<()> {
        self.update_township(id, fields)
    }

    fn all_townships(&self) -> Result<Vec<TownshipWithCity>> {
        self.list_townships(None)
    }

    fn case_by_id(&self, id: i64) -> Result<Option<Case>> {
        self.get_case(id)
    }

    fn case_by_number(&self, case_number: &str) -> Result<Option<Case>> {
        self.find_case_by_number(case_number)
    }

    fn insert_case(&self, fields: &CaseFields) -> Result<i64> {
        self.create_case(fields)
    }

    fn merge_case(&self, id: i64, fields: &CaseFields) -> Result<()> {
        self.update_case(id, fields)
    }

    fn all_cases(&self) -> Result<Vec<CaseWithRefs>> {
        self.list_cases()
    }
}
