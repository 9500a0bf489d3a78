//! Township operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Township, TownshipFields, TownshipOffices, TownshipWithCity};

const TOWNSHIP_COLUMNS: &str = "t.id, t.city_id, t.name, t.zip_code, t.district_court,
     t.land_office, t.finance_and_tax_bureau, t.police_station, t.irs, t.home_office,
     t.created_at, t.updated_at";

/// Empty office columns are stored as '' and read back as None
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl Database {
    /// Column order follows `TOWNSHIP_COLUMNS`
    pub(crate) fn row_to_township(row: &rusqlite::Row) -> rusqlite::Result<Township> {
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;
        Ok(Township {
            id: row.get(0)?,
            city_id: row.get(1)?,
            name: row.get(2)?,
            offices: TownshipOffices {
                zip_code: non_empty(row.get(3)?),
                district_court: non_empty(row.get(4)?),
                land_office: non_empty(row.get(5)?),
                finance_and_tax_bureau: non_empty(row.get(6)?),
                police_station: non_empty(row.get(7)?),
                irs: non_empty(row.get(8)?),
                home_office: non_empty(row.get(9)?),
            },
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }

    /// Get a township by ID
    pub fn get_township(&self, id: i64) -> Result<Option<Township>> {
        let conn = self.conn()?;
        let township = conn
            .query_row(
                &format!("SELECT {} FROM townships t WHERE t.id = ?", TOWNSHIP_COLUMNS),
                params![id],
                Self::row_to_township,
            )
            .optional()?;
        Ok(township)
    }

    /// Find a township by name, scoped to a city when one is given.
    ///
    /// Without a city the lowest-id township of that name wins.
    pub fn find_township_by_name(&self, name: &str, city_id: Option<i64>) -> Result<Option<Township>> {
        let conn = self.conn()?;
        let township = conn
            .query_row(
                &format!(
                    "SELECT {} FROM townships t
                     WHERE t.name = ?1 AND (?2 IS NULL OR t.city_id = ?2)
                     ORDER BY t.id LIMIT 1",
                    TOWNSHIP_COLUMNS
                ),
                params![name, city_id],
                Self::row_to_township,
            )
            .optional()?;
        Ok(township)
    }

    /// Create a township. Name and city are required; absent offices are stored empty.
    pub fn create_township(&self, fields: &TownshipFields) -> Result<i64> {
        let city_id = fields
            .city_id
            .ok_or_else(|| Error::InvalidData("township requires a city".to_string()))?;
        let name = fields
            .name
            .as_deref()
            .ok_or_else(|| Error::InvalidData("township requires a name".to_string()))?;
        let o = &fields.offices;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO townships (
                city_id, name, zip_code, district_court, land_office,
                finance_and_tax_bureau, police_station, irs, home_office
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                city_id,
                name,
                o.zip_code.as_deref().unwrap_or_default(),
                o.district_court.as_deref().unwrap_or_default(),
                o.land_office.as_deref().unwrap_or_default(),
                o.finance_and_tax_bureau.as_deref().unwrap_or_default(),
                o.police_station.as_deref().unwrap_or_default(),
                o.irs.as_deref().unwrap_or_default(),
                o.home_office.as_deref().unwrap_or_default(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Sparse update of a township
    pub fn update_township(&self, id: i64, fields: &TownshipFields) -> Result<()> {
        let o = &fields.offices;
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE townships SET
                city_id = COALESCE(?, city_id),
                name = COALESCE(?, name),
                zip_code = COALESCE(?, zip_code),
                district_court = COALESCE(?, district_court),
                land_office = COALESCE(?, land_office),
                finance_and_tax_bureau = COALESCE(?, finance_and_tax_bureau),
                police_station = COALESCE(?, police_station),
                irs = COALESCE(?, irs),
                home_office = COALESCE(?, home_office),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                fields.city_id,
                fields.name,
                o.zip_code,
                o.district_court,
                o.land_office,
                o.finance_and_tax_bureau,
                o.police_station,
                o.irs,
                o.home_office,
                id,
            ],
        )?;
        Ok(())
    }

    /// List townships with their city names, ordered by township name
    pub fn list_townships(&self, city_id: Option<i64>) -> Result<Vec<TownshipWithCity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, c.name FROM townships t
             LEFT JOIN cities c ON c.id = t.city_id
             WHERE (?1 IS NULL OR t.city_id = ?1)
             ORDER BY t.name, t.id",
            TOWNSHIP_COLUMNS
        ))?;

        let townships = stmt
            .query_map(params![city_id], |row| {
                Ok(TownshipWithCity {
                    township: Self::row_to_township(row)?,
                    city_name: row.get(12)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(townships)
    }
}
