//! Rewrites raw payee and category text to the canonical records of the local store.

use std::collections::HashMap;

use models::{Category, Payee, Transaction, TransactionKind};

/// Case-insensitive lookup over every name and synonym of the known records.
///
/// When two records share a key the first one registered keeps it.
pub struct Enricher<'a> {
    payees: HashMap<String, &'a Payee>,
    categories: HashMap<String, &'a Category>,
}

impl<'a> Enricher<'a> {
    pub fn new(payees: &'a [Payee], categories: &'a [Category]) -> Self {
        let mut payee_map = HashMap::new();
        for payee in payees {
            for key in payee.keys() {
                payee_map.entry(key.to_lowercase()).or_insert(payee);
            }
        }

        let mut category_map = HashMap::new();
        for category in categories {
            for key in category.keys() {
                category_map.entry(key.to_lowercase()).or_insert(category);
            }
        }

        Self {
            payees: payee_map,
            categories: category_map,
        }
    }

    pub fn find_payee(&self, raw: &str) -> Option<&'a Payee> {
        self.payees.get(&raw.to_lowercase()).copied()
    }

    pub fn find_category(&self, raw: &str) -> Option<&'a Category> {
        self.categories.get(&raw.to_lowercase()).copied()
    }

    /// Same transactions, same order. A payee match wins over a category match.
    pub fn enrich(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions
            .into_iter()
            .map(|txn| self.enrich_one(txn))
            .collect()
    }

    pub fn enrich_one(&self, mut txn: Transaction) -> Transaction {
        if let Some(payee) = self.find_payee(&txn.payee) {
            let (category, description) = match txn.kind() {
                TransactionKind::Expense => (&payee.expense_category, &payee.expense_description),
                TransactionKind::TopUp => (&payee.topup_category, &payee.topup_description),
            };
            txn.payee = payee.name.clone();
            txn.category = category.clone();
            txn.description = description.clone();
            return txn;
        }

        if let Some(category) = txn.category.as_deref().and_then(|c| self.find_category(c)) {
            txn.category = Some(category.name.clone());
        }
        txn
    }
}
