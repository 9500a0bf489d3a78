//! City operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::City;

impl Database {
    fn row_to_city(row: &rusqlite::Row) -> rusqlite::Result<City> {
        let created_at_str: String = row.get(2)?;
        let updated_at_str: String = row.get(3)?;
        Ok(City {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }

    /// Get a city by ID
    pub fn get_city(&self, id: i64) -> Result<Option<City>> {
        let conn = self.conn()?;
        let city = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM cities WHERE id = ?",
                params![id],
                Self::row_to_city,
            )
            .optional()?;
        Ok(city)
    }

    /// Find a city by its exact name
    pub fn find_city_by_name(&self, name: &str) -> Result<Option<City>> {
        let conn = self.conn()?;
        let city = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM cities WHERE name = ?",
                params![name],
                Self::row_to_city,
            )
            .optional()?;
        Ok(city)
    }

    /// Create a city
    pub fn create_city(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO cities (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Rename a city (no-op when the name is unchanged, apart from the timestamp)
    pub fn update_city(&self, id: i64, name: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE cities SET name = COALESCE(?, name), updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![name, id],
        )?;
        Ok(())
    }

    /// List all cities ordered by name
    pub fn list_cities(&self) -> Result<Vec<City>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM cities ORDER BY name, id")?;

        let cities = stmt
            .query_map([], Self::row_to_city)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cities)
    }
}
