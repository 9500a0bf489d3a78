//! Domain models for yfcase
//!
//! Enumerated fields carry both a machine token (stored in the database and
//! accepted by the API) and a localized display label (used in spreadsheets).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The four importable/exportable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    City,
    Township,
    Case,
}

impl EntityKind {
    pub const ALL: [Self; 4] = [Self::User, Self::City, Self::Township, Self::Case];

    /// Plural path segment used by the HTTP API and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::City => "cities",
            Self::Township => "townships",
            Self::Case => "cases",
        }
    }

    /// Sheet name for exported workbooks
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::User => "使用者",
            Self::City => "縣市",
            Self::Township => "鄉鎮里區",
            Self::Case => "基本資訊",
        }
    }

    /// Base of the exported file name (a date stamp and extension are appended)
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::User => "使用者資料",
            Self::City => "縣市資料",
            Self::Township => "鄉鎮里區資料",
            Self::Case => "基本資訊資料",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "users" => Ok(Self::User),
            "city" | "cities" => Ok(Self::City),
            "township" | "townships" => Ok(Self::Township),
            "case" | "cases" => Ok(Self::Case),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User permission level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    #[default]
    User,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Guest, Self::User, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Guest => "訪客",
            Self::User => "一般使用者",
            Self::Admin => "管理者",
        }
    }

    /// Accepts either the display label or the machine token
    pub fn from_any(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == s || r.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_any(s).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Regional work area a staff member is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkArea {
    North,
    Central,
    South,
    Kaoping,
}

impl WorkArea {
    pub const ALL: [Self; 4] = [Self::North, Self::Central, Self::South, Self::Kaoping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::Central => "central",
            Self::South => "south",
            Self::Kaoping => "kaoping",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "雙北桃竹苗",
            Self::Central => "中彰投",
            Self::South => "雲嘉南",
            Self::Kaoping => "高高屏",
        }
    }

    pub fn from_any(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|w| w.label() == s || w.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::str::FromStr for WorkArea {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_any(s).ok_or_else(|| format!("Unknown work area: {}", s))
    }
}

impl std::fmt::Display for WorkArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Public-sector or private-sector identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Public,
    Private,
}

impl IdentityType {
    pub const ALL: [Self; 2] = [Self::Public, Self::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "公",
            Self::Private => "私",
        }
    }

    pub fn from_any(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label() == s || t.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::str::FromStr for IdentityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_any(s).ok_or_else(|| format!("Unknown identity type: {}", s))
    }
}

impl std::fmt::Display for IdentityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render a boolean the way spreadsheets show it
pub fn bool_label(value: bool) -> &'static str {
    if value {
        "是"
    } else {
        "否"
    }
}

/// Parse a spreadsheet boolean (是/否 or true/false style tokens)
pub fn parse_bool_label(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "是" | "true" | "1" | "yes" | "y" => Some(true),
        "否" | "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Structured address shared by users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub city: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
    pub neighbor: Option<String>,
    pub street: Option<String>,
    pub section: Option<String>,
    pub lane: Option<String>,
    pub alley: Option<String>,
    pub number: Option<String>,
    pub floor: Option<String>,
}

/// A staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
    pub personal_id: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub role: Role,
    pub work_area: Option<WorkArea>,
    pub identity_type: Option<IdentityType>,
    pub birthday: Option<NaiveDate>,
    #[serde(flatten)]
    pub address: Address,
    pub is_verified: bool,
    pub is_logged_in: bool,
    pub must_reset_password: bool,
    /// Argon2 PHC string; never serialized
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown as the responsible person of a case
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Fields of a user draft. `None` means "not provided": on create the
/// default applies, on update the stored value is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub personal_id: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<Role>,
    pub work_area: Option<WorkArea>,
    pub identity_type: Option<IdentityType>,
    pub birthday: Option<NaiveDate>,
    pub address: Address,
    pub is_verified: Option<bool>,
    pub is_logged_in: Option<bool>,
}

/// Credential data used only when a user is created
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub password_hash: String,
    pub must_reset_password: bool,
    /// Overrides the draft's verification flag when set
    pub force_unverified: bool,
}

/// A city (reference data)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Government offices responsible for a township
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownshipOffices {
    pub zip_code: Option<String>,
    pub district_court: Option<String>,
    pub land_office: Option<String>,
    pub finance_and_tax_bureau: Option<String>,
    pub police_station: Option<String>,
    pub irs: Option<String>,
    pub home_office: Option<String>,
}

/// A township within a city
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Township {
    pub id: i64,
    pub city_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub offices: TownshipOffices,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Township fields for create and sparse update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TownshipFields {
    pub city_id: Option<i64>,
    pub name: Option<String>,
    pub offices: TownshipOffices,
}

/// Township joined with its city's name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownshipWithCity {
    #[serde(flatten)]
    pub township: Township,
    pub city_name: Option<String>,
}

/// Land address fragments of a case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandAddress {
    pub big_section: Option<String>,
    pub small_section: Option<String>,
    pub village: Option<String>,
    pub neighbor: Option<String>,
    pub street: Option<String>,
    pub section: Option<String>,
    pub lane: Option<String>,
    pub alley: Option<String>,
    pub number: Option<String>,
    pub floor: Option<String>,
}

/// A foreclosure case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: i64,
    pub case_number: String,
    pub company: Option<String>,
    pub city_id: Option<i64>,
    pub township_id: Option<i64>,
    #[serde(flatten)]
    pub land: LandAddress,
    pub status: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Case fields for create and sparse update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFields {
    pub case_number: Option<String>,
    pub company: Option<String>,
    pub city_id: Option<i64>,
    pub township_id: Option<i64>,
    #[serde(flatten)]
    pub land: LandAddress,
    pub status: Option<String>,
    pub user_id: Option<i64>,
}

/// Summary of the responsible person shown next to a case
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub nickname: Option<String>,
    pub email: String,
}

impl UserSummary {
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Case joined with the names of everything it references
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseWithRefs {
    #[serde(flatten)]
    pub case: Case,
    pub city_name: Option<String>,
    pub township_name: Option<String>,
    pub user: Option<UserSummary>,
}

/// The authenticated caller on whose behalf an import runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub email: String,
    /// Stored user matching the caller's email, if any
    pub user_id: Option<i64>,
}

impl CallerIdentity {
    pub fn new(email: impl Into<String>, user_id: Option<i64>) -> Self {
        Self {
            email: email.into(),
            user_id,
        }
    }
}
