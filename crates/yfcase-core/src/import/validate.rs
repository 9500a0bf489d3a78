//! Row validation in two passes around reference resolution: required
//! fields and email format first, length ceilings last.
//! The first failing check is the row's only error.

use std::sync::OnceLock;

use regex::Regex;

use super::normalize::{Draft, TownshipDraft, UserDraft};
use crate::models::CaseFields;
use super::RowError;

/// `(label, limit, value)`: lengths count Unicode scalar values
type Bounded<'a> = (&'static str, usize, &'a Option<String>);

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn require(value: &Option<String>, label: &'static str) -> Result<(), RowError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(RowError::MissingRequiredField(label)),
    }
}

fn within_limits(fields: &[Bounded<'_>]) -> Result<(), RowError> {
    for &(field, max, value) in fields {
        if let Some(v) = value {
            if v.chars().count() > max {
                return Err(RowError::FieldTooLong { field, max });
            }
        }
    }
    Ok(())
}

/// Required fields and formats; runs before references are resolved
pub fn check_required(draft: &Draft) -> Result<(), RowError> {
    match draft {
        Draft::User(d) => user_required(d),
        Draft::City(d) => require(&d.name, "城市名稱"),
        Draft::Township(d) => township_required(d),
        Draft::Case(d) => require(&d.fields.case_number, "案號"),
    }
}

/// Length ceilings; runs once references are resolved
pub fn check_lengths(draft: &Draft) -> Result<(), RowError> {
    match draft {
        Draft::User(d) => user_lengths(d),
        Draft::City(d) => within_limits(&[("城市名稱", 30, &d.name)]),
        Draft::Township(d) => township_lengths(d),
        Draft::Case(d) => check_case_lengths(&d.fields),
    }
}

fn user_required(draft: &UserDraft) -> Result<(), RowError> {
    let f = &draft.fields;
    require(&f.name, "姓名")?;
    require(&f.email, "電子郵件")?;

    match &f.email {
        Some(email) if !is_valid_email(email) => Err(RowError::InvalidFormat("電子郵件")),
        _ => Ok(()),
    }
}

fn user_lengths(draft: &UserDraft) -> Result<(), RowError> {
    let f = &draft.fields;
    let a = &f.address;
    within_limits(&[
        ("暱稱", 100, &f.nickname),
        ("身份證字號", 20, &f.personal_id),
        ("電話", 20, &f.phone),
        ("手機", 20, &f.mobile),
        ("縣市", 20, &a.city),
        ("區", 20, &a.district),
        ("里", 20, &a.village),
        ("鄰", 10, &a.neighbor),
        ("街道", 50, &a.street),
        ("段", 10, &a.section),
        ("巷", 10, &a.lane),
        ("弄", 10, &a.alley),
        ("號", 10, &a.number),
        ("樓層", 10, &a.floor),
    ])
}

fn township_required(draft: &TownshipDraft) -> Result<(), RowError> {
    require(&draft.fields.name, "鄉鎮名稱")?;
    if draft.city.is_empty() {
        return Err(RowError::MissingRequiredField("城市或城市ID"));
    }
    Ok(())
}

fn township_lengths(draft: &TownshipDraft) -> Result<(), RowError> {
    let f = &draft.fields;
    let o = &f.offices;
    within_limits(&[
        ("鄉鎮名稱", 30, &f.name),
        ("郵遞區號", 30, &o.zip_code),
        ("地方法院", 30, &o.district_court),
        ("地政事務所", 30, &o.land_office),
        ("財政稅務局", 30, &o.finance_and_tax_bureau),
        ("警察局", 30, &o.police_station),
        ("國稅局", 30, &o.irs),
        ("戶政事務所", 30, &o.home_office),
    ])
}

/// Case length ceilings, shared with the case API
pub fn check_case_lengths(f: &CaseFields) -> Result<(), RowError> {
    let l = &f.land;
    within_limits(&[
        ("案號", 100, &f.case_number),
        ("公司", 50, &f.company),
        ("大段", 10, &l.big_section),
        ("小段", 10, &l.small_section),
        ("里", 100, &l.village),
        ("鄰", 100, &l.neighbor),
        ("街道", 100, &l.street),
        ("段", 100, &l.section),
        ("巷", 100, &l.lane),
        ("弄", 100, &l.alley),
        ("號", 100, &l.number),
        ("樓層", 100, &l.floor),
        ("狀態", 10, &f.status),
    ])
}
