pub mod api_key;
pub mod health;
pub mod migrate;
