//! User account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Address, NewCredential, Role, User, UserFields};

const USER_COLUMNS: &str = "id, name, email, nickname, personal_id, phone, mobile, role, work_area,
     identity_type, birthday, address_city, address_district, address_village, address_neighbor,
     address_street, address_section, address_lane, address_alley, address_number, address_floor,
     is_verified, is_logged_in, must_reset_password, password_hash, created_at, updated_at";

impl Database {
    /// Helper to convert a row to User
    /// Column order follows `USER_COLUMNS`
    pub(crate) fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(7)?;
        let work_area_str: Option<String> = row.get(8)?;
        let identity_type_str: Option<String> = row.get(9)?;
        let created_at_str: String = row.get(25)?;
        let updated_at_str: String = row.get(26)?;

        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            nickname: row.get(3)?,
            personal_id: row.get(4)?,
            phone: row.get(5)?,
            mobile: row.get(6)?,
            role: role_str.parse().unwrap_or_default(),
            work_area: work_area_str.and_then(|s| s.parse().ok()),
            identity_type: identity_type_str.and_then(|s| s.parse().ok()),
            birthday: parse_date(row.get(10)?),
            address: Address {
                city: row.get(11)?,
                district: row.get(12)?,
                village: row.get(13)?,
                neighbor: row.get(14)?,
                street: row.get(15)?,
                section: row.get(16)?,
                lane: row.get(17)?,
                alley: row.get(18)?,
                number: row.get(19)?,
                floor: row.get(20)?,
            },
            is_verified: row.get::<_, i64>(21)? != 0,
            is_logged_in: row.get::<_, i64>(22)? != 0,
            must_reset_password: row.get::<_, i64>(23)? != 0,
            password_hash: row.get(24)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Find a user by email (case-insensitive)
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                params![email.trim().to_lowercase()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Find a user by display name, matching either the name or the nickname
    ///
    /// Exact name matches win over nickname matches; ties go to the lowest id.
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE name = ?1 OR nickname = ?1
                     ORDER BY CASE WHEN name = ?1 THEN 0 ELSE 1 END, id
                     LIMIT 1",
                    USER_COLUMNS
                ),
                params![name],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Create a user. Absent role defaults to `user`, absent flags to false.
    pub fn create_user(&self, fields: &UserFields, credential: &NewCredential) -> Result<i64> {
        let conn = self.conn()?;
        let role = fields.role.unwrap_or_default();
        let is_verified = !credential.force_unverified && fields.is_verified.unwrap_or(false);
        let a = &fields.address;

        conn.execute(
            r#"
            INSERT INTO users (
                name, email, nickname, personal_id, phone, mobile, role, work_area,
                identity_type, birthday, address_city, address_district, address_village,
                address_neighbor, address_street, address_section, address_lane,
                address_alley, address_number, address_floor, password_hash,
                is_verified, is_logged_in, must_reset_password
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                fields.name.as_deref().unwrap_or_default(),
                fields
                    .email
                    .as_deref()
                    .unwrap_or_default()
                    .trim()
                    .to_lowercase(),
                fields.nickname,
                fields.personal_id,
                fields.phone,
                fields.mobile,
                role.as_str(),
                fields.work_area.map(|w| w.as_str()),
                fields.identity_type.map(|t| t.as_str()),
                fields.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                a.city,
                a.district,
                a.village,
                a.neighbor,
                a.street,
                a.section,
                a.lane,
                a.alley,
                a.number,
                a.floor,
                credential.password_hash,
                is_verified,
                fields.is_logged_in.unwrap_or(false),
                credential.must_reset_password,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Sparse update: only `Some` fields overwrite. Credentials are never touched.
    pub fn update_user(&self, id: i64, fields: &UserFields) -> Result<()> {
        let conn = self.conn()?;
        let a = &fields.address;

        conn.execute(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                nickname = COALESCE(?, nickname),
                personal_id = COALESCE(?, personal_id),
                phone = COALESCE(?, phone),
                mobile = COALESCE(?, mobile),
                role = COALESCE(?, role),
                work_area = COALESCE(?, work_area),
                identity_type = COALESCE(?, identity_type),
                birthday = COALESCE(?, birthday),
                address_city = COALESCE(?, address_city),
                address_district = COALESCE(?, address_district),
                address_village = COALESCE(?, address_village),
                address_neighbor = COALESCE(?, address_neighbor),
                address_street = COALESCE(?, address_street),
                address_section = COALESCE(?, address_section),
                address_lane = COALESCE(?, address_lane),
                address_alley = COALESCE(?, address_alley),
                address_number = COALESCE(?, address_number),
                address_floor = COALESCE(?, address_floor),
                is_verified = COALESCE(?, is_verified),
                is_logged_in = COALESCE(?, is_logged_in),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                fields.name,
                fields.email.as_ref().map(|e| e.trim().to_lowercase()),
                fields.nickname,
                fields.personal_id,
                fields.phone,
                fields.mobile,
                fields.role.map(|r| r.as_str()),
                fields.work_area.map(|w| w.as_str()),
                fields.identity_type.map(|t| t.as_str()),
                fields.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                a.city,
                a.district,
                a.village,
                a.neighbor,
                a.street,
                a.section,
                a.lane,
                a.alley,
                a.number,
                a.floor,
                fields.is_verified,
                fields.is_logged_in,
                id,
            ],
        )?;

        Ok(())
    }

    /// List all users, oldest first
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at, id",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Count users with a given role
    pub fn count_users_with_role(&self, role: Role) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?",
            params![role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
