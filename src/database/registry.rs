use std::collections::HashMap;

use thiserror::Error;

use crate::database::entity::{Entity, ParentOwner};
use crate::database::models::{BookingRequest, Category, LandingPage, Lead, Quotation, TripInquiry};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table {0} does not support soft delete")]
    NotSoftDeletable(&'static str),
}

/// Static description of a table, enough to scope raw row operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub owner_column: Option<&'static str>,
    pub parent_owner: Option<ParentOwner>,
    pub soft_delete: bool,
}

impl TableInfo {
    pub fn of<E: Entity>() -> Self {
        Self {
            name: E::TABLE,
            label: E::LABEL,
            owner_column: E::owner_column(),
            parent_owner: E::parent_owner(),
            soft_delete: E::SOFT_DELETE,
        }
    }

    pub fn require_soft_delete(&self) -> Result<(), RegistryError> {
        if self.soft_delete {
            Ok(())
        } else {
            Err(RegistryError::NotSoftDeletable(self.name))
        }
    }
}

/// Lookup from user-supplied table names to known tables
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, TableInfo>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every table exposed through the API
    pub fn crm() -> Self {
        let mut registry = Self::new();
        registry
            .register::<Lead>()
            .register::<BookingRequest>()
            .register::<TripInquiry>()
            .register::<LandingPage>()
            .register::<Category>()
            .register::<Quotation>();
        registry
    }

    pub fn register<E: Entity>(&mut self) -> &mut Self {
        self.insert(TableInfo::of::<E>())
    }

    pub fn insert(&mut self, info: TableInfo) -> &mut Self {
        self.tables.insert(info.name.to_ascii_lowercase(), info);
        self
    }

    /// Case-insensitive; dashes are accepted for underscores
    pub fn resolve(&self, name: &str) -> Result<TableInfo, RegistryError> {
        let key = name.trim().to_ascii_lowercase().replace('-', "_");
        self.tables
            .get(&key)
            .copied()
            .ok_or_else(|| RegistryError::UnknownTable(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tables.values().map(|t| t.name).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        let registry = TableRegistry::crm();
        let info = registry.resolve("Booking-Requests").unwrap();
        assert_eq!(info.name, "booking_requests");
        assert_eq!(info.owner_column, Some("user_id"));
        assert!(info.soft_delete);
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let registry = TableRegistry::crm();
        assert!(matches!(registry.resolve("users"), Err(RegistryError::UnknownTable(_))));
        assert!(matches!(registry.resolve("api_keys"), Err(RegistryError::UnknownTable(_))));
    }

    #[test]
    fn only_owned_tables_carry_ownership() {
        let registry = TableRegistry::crm();
        let categories = registry.resolve("categories").unwrap();
        assert_eq!(categories.owner_column, None);
        assert_eq!(categories.parent_owner, None);

        let quotations = registry.resolve("quotations").unwrap();
        assert!(quotations.require_soft_delete().is_err());
        let parent = quotations.parent_owner.unwrap();
        assert_eq!((parent.link_column, parent.table, parent.owner_column), ("lead_id", "leads", "user_id"));
    }

    #[test]
    fn lists_registered_tables() {
        assert_eq!(
            TableRegistry::crm().names(),
            vec!["booking_requests", "categories", "landing_pages", "leads", "quotations", "trip_inquiries"]
        );
    }
}
