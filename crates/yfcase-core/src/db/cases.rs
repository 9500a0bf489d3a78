//! Case operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Case, CaseFields, CaseWithRefs, LandAddress, UserSummary};

const CASE_COLUMNS: &str = "k.id, k.case_number, k.company, k.city_id, k.township_id,
     k.big_section, k.small_section, k.village, k.neighbor, k.street, k.section, k.lane,
     k.alley, k.number, k.floor, k.status, k.user_id, k.created_at, k.updated_at";

impl Database {
    /// Column order follows `CASE_COLUMNS`
    pub(crate) fn row_to_case(row: &rusqlite::Row) -> rusqlite::Result<Case> {
        let created_at_str: String = row.get(17)?;
        let updated_at_str: String = row.get(18)?;
        Ok(Case {
            id: row.get(0)?,
            case_number: row.get(1)?,
            company: row.get(2)?,
            city_id: row.get(3)?,
            township_id: row.get(4)?,
            land: LandAddress {
                big_section: row.get(5)?,
                small_section: row.get(6)?,
                village: row.get(7)?,
                neighbor: row.get(8)?,
                street: row.get(9)?,
                section: row.get(10)?,
                lane: row.get(11)?,
                alley: row.get(12)?,
                number: row.get(13)?,
                floor: row.get(14)?,
            },
            status: row.get(15)?,
            user_id: row.get(16)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }

    /// Get a case by ID
    pub fn get_case(&self, id: i64) -> Result<Option<Case>> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("SELECT {} FROM cases k WHERE k.id = ?", CASE_COLUMNS),
                params![id],
                Self::row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    /// Find the first case (by id) carrying a case number
    pub fn find_case_by_number(&self, case_number: &str) -> Result<Option<Case>> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!(
                    "SELECT {} FROM cases k WHERE k.case_number = ? ORDER BY k.id LIMIT 1",
                    CASE_COLUMNS
                ),
                params![case_number],
                Self::row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    /// Create a case. Case number and responsible user are required.
    pub fn create_case(&self, fields: &CaseFields) -> Result<i64> {
        let case_number = fields
            .case_number
            .as_deref()
            .ok_or_else(|| Error::InvalidData("case requires a case number".to_string()))?;
        let user_id = fields
            .user_id
            .ok_or_else(|| Error::InvalidData("case requires a responsible user".to_string()))?;
        let l = &fields.land;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO cases (
                case_number, company, city_id, township_id, big_section, small_section,
                village, neighbor, street, section, lane, alley, number, floor, status, user_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                case_number,
                fields.company,
                fields.city_id,
                fields.township_id,
                l.big_section,
                l.small_section,
                l.village,
                l.neighbor,
                l.street,
                l.section,
                l.lane,
                l.alley,
                l.number,
                l.floor,
                fields.status,
                user_id,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Sparse update of a case
    pub fn update_case(&self, id: i64, fields: &CaseFields) -> Result<()> {
        let l = &fields.land;
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE cases SET
                case_number = COALESCE(?, case_number),
                company = COALESCE(?, company),
                city_id = COALESCE(?, city_id),
                township_id = COALESCE(?, township_id),
                big_section = COALESCE(?, big_section),
                small_section = COALESCE(?, small_section),
                village = COALESCE(?, village),
                neighbor = COALESCE(?, neighbor),
                street = COALESCE(?, street),
                section = COALESCE(?, section),
                lane = COALESCE(?, lane),
                alley = COALESCE(?, alley),
                number = COALESCE(?, number),
                floor = COALESCE(?, floor),
                status = COALESCE(?, status),
                user_id = COALESCE(?, user_id),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                fields.case_number,
                fields.company,
                fields.city_id,
                fields.township_id,
                l.big_section,
                l.small_section,
                l.village,
                l.neighbor,
                l.street,
                l.section,
                l.lane,
                l.alley,
                l.number,
                l.floor,
                fields.status,
                fields.user_id,
                id,
            ],
        )?;
        Ok(())
    }

    /// Hard-delete a case. Returns false if it did not exist.
    pub fn delete_case(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM cases WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Get one case with its reference names
    pub fn get_case_with_refs(&self, id: i64) -> Result<Option<CaseWithRefs>> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("{} WHERE k.id = ?", Self::case_with_refs_select()),
                params![id],
                Self::row_to_case_with_refs,
            )
            .optional()?;
        Ok(case)
    }

    /// List all cases with reference names, newest first
    pub fn list_cases(&self) -> Result<Vec<CaseWithRefs>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY k.created_at DESC, k.id DESC",
            Self::case_with_refs_select()
        ))?;

        let cases = stmt
            .query_map([], Self::row_to_case_with_refs)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cases)
    }

    fn case_with_refs_select() -> String {
        format!(
            "SELECT {}, c.name, t.name, u.id, u.name, u.nickname, u.email
             FROM cases k
             LEFT JOIN cities c ON c.id = k.city_id
             LEFT JOIN townships t ON t.id = k.township_id
             LEFT JOIN users u ON u.id = k.user_id",
            CASE_COLUMNS
        )
    }

    fn row_to_case_with_refs(row: &rusqlite::Row) -> rusqlite::Result<CaseWithRefs> {
        let user_id: Option<i64> = row.get(21)?;
        let user = match user_id {
            Some(id) => Some(UserSummary {
                id,
                name: row.get(22)?,
                nickname: row.get(23)?,
                email: row.get(24)?,
            }),
            None => None,
        };

        Ok(CaseWithRefs {
            case: Self::row_to_case(row)?,
            city_name: row.get(19)?,
            township_name: row.get(20)?,
            user,
        })
    }
}
