use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use strum::IntoEnumIterator;

use crate::migrations;
use crate::models::{Preference, PreferenceKey};

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;

        log::info!("Database initialized at: {}", path.display());
        Ok(Self { conn })
    }

    /// Open a throwaway in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if schema initialization fails
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        migrations::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("wavewake");
        path.push("wavewake.db");
        path
    }

    /// Read a gesture preference, falling back to `default` when unset
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_bool(&self, key: PreferenceKey, default: bool) -> Result<bool> {
        let value: Option<i32> = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map_or(default, |v| v != 0))
    }

    /// Persist a gesture preference
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub fn set_bool(&self, key: PreferenceKey, value: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key.as_str(), i32::from(value), Utc::now().to_rfc3339()],
        )?;
        log::debug!("Preference {key} = {value}");
        Ok(())
    }

    /// All known preferences, including ones never written
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_preferences(&self) -> Result<Vec<Preference>> {
        let mut prefs = Vec::new();
        for key in PreferenceKey::iter() {
            let row: Option<(i32, String)> = self
                .conn
                .query_row(
                    "SELECT value, updated_at FROM preferences WHERE key = ?1",
                    params![key.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            prefs.push(match row {
                Some((value, updated_at)) => Preference {
                    key,
                    enabled: value != 0,
                    updated_at: DateTime::parse_from_rfc3339(&updated_at)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc)),
                },
                None => Preference {
                    key,
                    enabled: false,
                    updated_at: None,
                },
            });
        }
        Ok(prefs)
    }

    /// Read an integer system setting, falling back to `default` when unset
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_int(&self, name: &str, default: i64) -> Result<i64> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM system_settings WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(default))
    }

    /// Persist an integer system setting
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub fn set_int(&self, name: &str, value: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO system_settings (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = ?2",
            params![name, value],
        )?;
        log::debug!("System setting {name} = {value}");
        Ok(())
    }
}
