pub mod crud;
pub mod global_delete;
pub mod public;
pub mod reports;
pub mod system;
