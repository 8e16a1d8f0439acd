pub mod error;
#[allow(clippy::module_inception)]
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::{is_identifier, quote_identifier, Filter};
pub use types::*;
