//! Payee and category records kept in the local store.
//!
//! Records are treated as immutable values: adding a synonym produces a new record
//! that replaces the old one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topup_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topup_description: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl Payee {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expense_category: None,
            expense_description: None,
            topup_category: None,
            topup_description: None,
            synonyms: Vec::new(),
        }
    }

    pub fn has_synonym(&self, synonym: &str) -> bool {
        contains_ignore_case(&self.synonyms, synonym)
    }

    /// Copy of this payee with `synonym` appended, unless it is already present.
    pub fn with_synonym(&self, synonym: &str) -> Payee {
        let mut synonyms = self.synonyms.clone();
        if !self.has_synonym(synonym) {
            synonyms.push(synonym.to_string());
        }
        Payee {
            synonyms,
            ..self.clone()
        }
    }

    /// Name followed by every synonym.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synonyms: Vec::new(),
        }
    }

    pub fn has_synonym(&self, synonym: &str) -> bool {
        contains_ignore_case(&self.synonyms, synonym)
    }

    pub fn with_synonym(&self, synonym: &str) -> Category {
        let mut synonyms = self.synonyms.clone();
        if !self.has_synonym(synonym) {
            synonyms.push(synonym.to_string());
        }
        Category {
            name: self.name.clone(),
            synonyms,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

fn contains_ignore_case(values: &[String], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    values.iter().any(|v| v.to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_synonym_returns_new_record() {
        let payee = Payee::new("Starbucks");
        let updated = payee.with_synonym("SBUX");

        assert!(payee.synonyms.is_empty());
        assert_eq!(updated.synonyms, vec!["SBUX".to_string()]);
        assert_eq!(updated.name, "Starbucks");
    }

    #[test]
    fn test_with_synonym_ignores_case_duplicates() {
        let payee = Payee::new("Starbucks").with_synonym("SBUX");
        let again = payee.with_synonym("sbux");
        assert_eq!(again.synonyms.len(), 1);

        let category = Category::new("Groceries").with_synonym("Supermarket");
        assert_eq!(category.with_synonym("SUPERMARKET").synonyms.len(), 1);
    }

    #[test]
    fn test_keys_include_name_first() {
        let category = Category::new("Groceries").with_synonym("Food");
        let keys: Vec<&str> = category.keys().collect();
        assert_eq!(keys, vec!["Groceries", "Food"]);
    }
}
