use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BooksError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyRole {
    Customer,
    Supplier,
}

impl std::fmt::Display for CounterpartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Supplier => write!(f, "supplier"),
        }
    }
}

/// An external customer or supplier that ledger records are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: String,
    pub name: String,
    pub role: CounterpartyRole,
}

/// Lookup of counterparties by id.
pub trait CounterpartyDirectory {
    fn get(&self, id: &str) -> Option<Counterparty>;
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: HashMap<String, Counterparty>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id.
    pub fn insert(&mut self, counterparty: Counterparty) {
        self.entries.insert(counterparty.id.clone(), counterparty);
    }
}

impl FromIterator<Counterparty> for InMemoryDirectory {
    fn from_iter<I: IntoIterator<Item = Counterparty>>(iter: I) -> Self {
        let mut dir = Self::new();
        for c in iter {
            dir.insert(c);
        }
        dir
    }
}

impl CounterpartyDirectory for InMemoryDirectory {
    fn get(&self, id: &str) -> Option<Counterparty> {
        self.entries.get(id).cloned()
    }
}

/// Look up `id` and check it plays `role`.
pub fn require_role<D>(directory: &D, id: &str, role: CounterpartyRole) -> Result<Counterparty>
where
    D: CounterpartyDirectory + ?Sized,
{
    let counterparty = directory
        .get(id)
        .ok_or_else(|| BooksError::EntityNotFound { id: id.into() })?;

    if counterparty.role != role {
        return Err(BooksError::WrongEntityType {
            id: id.into(),
            expected: role,
            actual: counterparty.role,
        });
    }

    Ok(counterparty)
}
