pub mod entity;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod registry;
pub mod service;
pub mod session;

pub use entity::{ColumnValue, Entity, OwnedEntity, ParentOwner, TemporalColumn};
pub use manager::{DatabaseError, DatabaseManager};
pub use query_builder::{EntityQuery, JoinQuery};
pub use registry::{RegistryError, TableInfo, TableRegistry};
pub use session::{OwnershipScope, TenantSession};
