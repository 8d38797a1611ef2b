use anyhow::{Context, Result};
use models::{Category, Error, Payee};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Local store of canonical payees and categories used for enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub payees: Vec<Payee>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Resolves to `database.json` when a directory (or an extensionless missing path) was given.
pub fn database_file_path<P: AsRef<Path>>(database_path: P) -> PathBuf {
    let path = database_path.as_ref();
    if path.is_dir() || (!path.exists() && !path.to_string_lossy().ends_with(".json")) {
        path.join("database.json")
    } else {
        path.to_path_buf()
    }
}

/// Reads the store. A missing file is an empty store.
pub fn read_database<P: AsRef<Path>>(database_path: P) -> Result<Database> {
    let db_path = database_file_path(database_path);

    let mut file = match File::open(&db_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %db_path.display(), "no database yet, starting empty");
            return Ok(Database::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Cannot open database at {:?}", db_path));
        }
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    if contents.trim().is_empty() {
        return Ok(Database::default());
    }

    serde_json::from_str(&contents)
        .with_context(|| format!("Database at {:?} is not valid JSON", db_path))
}

/// Writes the store, creating parent directories as needed.
pub fn write_database<P: AsRef<Path>>(database_path: P, database: &Database) -> Result<PathBuf> {
    let db_path = database_file_path(database_path);

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(&db_path)
        .with_context(|| format!("Cannot create database file at {:?}", db_path))?;

    let formatted = serde_json::to_string_pretty(database)?;
    file.write_all(formatted.as_bytes())?;

    Ok(db_path)
}

impl Database {
    pub fn find_payee(&self, name: &str) -> Option<&Payee> {
        self.payees.iter().find(|p| same_name(&p.name, name))
    }

    pub fn find_category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| same_name(&c.name, name))
    }

    pub fn add_payee(&mut self, payee: Payee) -> models::Result<()> {
        if self.find_payee(&payee.name).is_some() {
            return Err(Error::Validation(format!("payee '{}' already exists", payee.name)));
        }
        self.payees.push(payee);
        Ok(())
    }

    pub fn remove_payee(&mut self, name: &str) -> models::Result<Payee> {
        let pos = self
            .payees
            .iter()
            .position(|p| same_name(&p.name, name))
            .ok_or_else(|| Error::NotFound(format!("payee '{name}'")))?;
        Ok(self.payees.remove(pos))
    }

    /// Replaces the payee with a copy carrying the extra synonym.
    pub fn add_payee_synonym(&mut self, name: &str, synonym: &str) -> models::Result<()> {
        let slot = self
            .payees
            .iter_mut()
            .find(|p| same_name(&p.name, name))
            .ok_or_else(|| Error::NotFound(format!("payee '{name}'")))?;
        *slot = slot.with_synonym(synonym);
        Ok(())
    }

    pub fn add_category(&mut self, category: Category) -> models::Result<()> {
        if self.find_category(&category.name).is_some() {
            return Err(Error::Validation(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        self.categories.push(category);
        Ok(())
    }

    pub fn remove_category(&mut self, name: &str) -> models::Result<Category> {
        let pos = self
            .categories
            .iter()
            .position(|c| same_name(&c.name, name))
            .ok_or_else(|| Error::NotFound(format!("category '{name}'")))?;
        Ok(self.categories.remove(pos))
    }

    pub fn add_category_synonym(&mut self, name: &str, synonym: &str) -> models::Result<()> {
        let slot = self
            .categories
            .iter_mut()
            .find(|c| same_name(&c.name, name))
            .ok_or_else(|| Error::NotFound(format!("category '{name}'")))?;
        *slot = slot.with_synonym(synonym);
        Ok(())
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let db = read_database(dir.path().join("database.json")).unwrap();
        assert_eq!(db, Database::default());
    }

    #[test]
    fn test_path_resolution() {
        let dir = tempdir().unwrap();
        assert_eq!(
            database_file_path(dir.path()),
            dir.path().join("database.json")
        );
        let file = dir.path().join("store.json");
        assert_eq!(database_file_path(&file), file);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("database.json");

        let mut db = Database::default();
        let mut payee = Payee::new("Starbucks");
        payee.expense_category = Some("Coffee".into());
        db.add_payee(payee).unwrap();
        db.add_category(Category::new("Coffee")).unwrap();
        db.add_payee_synonym("starbucks", "SBUX").unwrap();

        let written = write_database(&path, &db).unwrap();
        assert_eq!(written, path);

        let loaded = read_database(&path).unwrap();
        assert_eq!(loaded, db);
        assert_eq!(loaded.payees[0].synonyms, vec!["SBUX".to_string()]);
    }

    #[test]
    fn test_duplicate_and_missing_records() {
        let mut db = Database::default();
        db.add_category(Category::new("Groceries")).unwrap();

        assert!(matches!(
            db.add_category(Category::new("groceries")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(db.remove_payee("nobody"), Err(Error::NotFound(_))));
        assert!(matches!(
            db.add_category_synonym("Travel", "Trips"),
            Err(Error::NotFound(_))
        ));

        let removed = db.remove_category("GROCERIES").unwrap();
        assert_eq!(removed.name, "Groceries");
        assert!(db.categories.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(read_database(&path).is_err());
    }
}
