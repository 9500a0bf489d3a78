//! Spreadsheet bulk import
//!
//! Every row runs through the same pipeline, independently of the others:
//!
//! 1. `normalize` - raw cells into a kind-specific draft
//! 2. `validate` - required fields and email format
//! 3. `resolve` - city/township/responsible-person references
//! 4. `validate` - length ceilings
//! 5. `upsert` - create, sparse update, or conflict-skip
//!
//! `batch` drives the pipeline over a whole sheet and aggregates outcomes.
//! A row either succeeds or fails with exactly one [`RowError`]; failures
//! never abort the batch.

mod batch;
pub mod normalize;
mod resolve;
mod upsert;
mod validate;

pub use batch::{import_rows, import_sheet, BatchResult, MAX_REPORTED_ERRORS};
pub use normalize::{normalize, Draft};
pub use resolve::{resolve_case_ids, CaseRefs, Responsible};
pub use upsert::{hash_password, RowOutcome};
pub use validate::check_case_lengths;

use thiserror::Error;

/// Password given to bulk-created users when nothing else is configured
pub const DEFAULT_IMPORT_PASSWORD: &str = "123456";

/// Which lookup failed during reference resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    Id,
    Name,
    Email,
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "ID"),
            Self::Name => write!(f, "名稱"),
            Self::Email => write!(f, "Email"),
        }
    }
}

/// The natural-key value that collided with an existing entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKey {
    Email(String),
    CityName(String),
    Township { city: String, name: String },
    CaseNumber(String),
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email(email) => write!(f, "電子郵件 {} 已存在", email),
            Self::CityName(name) => write!(f, "城市名稱 \"{}\" 已存在", name),
            Self::Township { city, name } => {
                write!(f, "城市 \"{}\" 下的鄉鎮名稱 \"{}\" 已存在", city, name)
            }
            Self::CaseNumber(number) => write!(f, "案號 \"{}\" 已存在", number),
        }
    }
}

/// Why a single row was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("缺少必填字段（{0}）")]
    MissingRequiredField(&'static str),

    #[error("無效的{0}格式")]
    InvalidFormat(&'static str),

    #[error("{field}超過{max}個字符")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("找不到{key}為 \"{value}\" 的{target}")]
    ReferenceNotFound {
        target: &'static str,
        key: LookupKey,
        value: String,
    },

    #[error("{0}")]
    DuplicateNaturalKey(DuplicateKey),

    #[error("{0}")]
    UnhandledStoreError(String),
}

impl RowError {
    pub(crate) fn not_found(target: &'static str, key: LookupKey, value: &str) -> Self {
        Self::ReferenceNotFound {
            target,
            key,
            value: value.to_string(),
        }
    }
}

/// Store failures inside a row become that row's error
impl From<crate::Error> for RowError {
    fn from(e: crate::Error) -> Self {
        match e {
            crate::Error::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::UnhandledStoreError("資料已存在（唯一性衝突）".to_string())
            }
            other => Self::UnhandledStoreError(other.to_string()),
        }
    }
}

/// Credential policy for users created by a bulk import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPolicy {
    pub default_password: String,
    /// Create users unverified regardless of the sheet's 已驗證 column
    pub force_unverified: bool,
    /// Flag created users so they must change their password on first login
    pub require_password_reset: bool,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            default_password: DEFAULT_IMPORT_PASSWORD.to_string(),
            force_unverified: false,
            require_password_reset: false,
        }
    }
}

impl ImportPolicy {
    pub const PASSWORD_ENV: &'static str = "YFCASE_IMPORT_DEFAULT_PASSWORD";
    pub const FORCE_UNVERIFIED_ENV: &'static str = "YFCASE_IMPORT_FORCE_UNVERIFIED";
    pub const REQUIRE_RESET_ENV: &'static str = "YFCASE_IMPORT_REQUIRE_RESET";

    /// Build the policy from `YFCASE_IMPORT_*` environment variables
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let default_password = std::env::var(Self::PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_IMPORT_PASSWORD.to_string());

        Self {
            default_password,
            force_unverified: flag(Self::FORCE_UNVERIFIED_ENV),
            require_password_reset: flag(Self::REQUIRE_RESET_ENV),
        }
    }

    pub fn uses_builtin_password(&self) -> bool {
        self.default_password == DEFAULT_IMPORT_PASSWORD
    }
}
