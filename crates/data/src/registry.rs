use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use models::{Error, Result, TransactionsConverter};

use bbva::BbvaXlsxParser;
use idbank::IdBankXlsxParser;
use revolut::RevolutCsvParser;
use santander::SantanderXlsxParser;
use tbank::TBankParser;
use wise::WiseCsvParser;

/// Every bank whose exports can be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    Revolut,
    Wise,
    TBank,
    IdBank,
    Bbva,
    Santander,
}

impl Bank {
    pub const ALL: [Bank; 6] = [
        Bank::Revolut,
        Bank::Wise,
        Bank::TBank,
        Bank::IdBank,
        Bank::Bbva,
        Bank::Santander,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Bank::Revolut => revolut::PARSER_NAME,
            Bank::Wise => wise::PARSER_NAME,
            Bank::TBank => tbank::PARSER_NAME,
            Bank::IdBank => idbank::PARSER_NAME,
            Bank::Bbva => bbva::PARSER_NAME,
            Bank::Santander => santander::PARSER_NAME,
        }
    }

    fn converter(&self) -> Box<dyn TransactionsConverter + Send + Sync> {
        match self {
            Bank::Revolut => Box::new(RevolutCsvParser),
            Bank::Wise => Box::new(WiseCsvParser),
            Bank::TBank => Box::new(TBankParser),
            Bank::IdBank => Box::new(IdBankXlsxParser),
            Bank::Bbva => Box::new(BbvaXlsxParser),
            Bank::Santander => Box::new(SantanderXlsxParser),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Bank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Bank::ALL
            .into_iter()
            .find(|bank| bank.key() == wanted)
            .ok_or_else(|| unknown_bank(s))
    }
}

fn unknown_bank(key: &str) -> Error {
    let supported: Vec<&str> = Bank::ALL.iter().map(Bank::key).collect();
    Error::NotFound(format!(
        "converter for bank '{key}' (supported: {})",
        supported.join(", ")
    ))
}

/// Bank key to converter map, built once per run.
pub struct ConverterRegistry {
    converters: HashMap<&'static str, Box<dyn TransactionsConverter + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        let converters = Bank::ALL
            .into_iter()
            .map(|bank| (bank.key(), bank.converter()))
            .collect();
        Self { converters }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Result<&dyn TransactionsConverter> {
        let bank: Bank = key.parse()?;
        self.converters
            .get(bank.key())
            .map(|c| c.as_ref() as &dyn TransactionsConverter)
            .ok_or_else(|| unknown_bank(key))
    }

    pub fn keys(&self) -> Vec<&'static str> {
        Bank::ALL.iter().map(Bank::key).collect()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_bank_resolves_to_its_converter() {
        let registry = ConverterRegistry::new();
        for bank in Bank::ALL {
            let converter = registry.get(bank.key()).unwrap();
            assert_eq!(converter.key(), bank.key());
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ConverterRegistry::new();
        assert_eq!(registry.get("TBank").unwrap().key(), "tbank");
        assert_eq!(registry.get(" REVOLUT ").unwrap().key(), "revolut");
        assert_eq!("IdBank".parse::<Bank>().unwrap(), Bank::IdBank);
    }

    #[test]
    fn test_unknown_bank_is_not_found() {
        let registry = ConverterRegistry::new();
        let err = registry.get("monzo").err().unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("santander"));
    }

    #[test]
    fn test_keys_are_lowercase() {
        let keys = ConverterRegistry::new().keys();
        assert_eq!(keys, vec!["revolut", "wise", "tbank", "idbank", "bbva", "santander"]);
    }
}
