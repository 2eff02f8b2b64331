//! SQL rendering utilities
//!
//! Identifier sanitization, condition/order-by rendering, DDL generation,
//! and typed parameter binding.

pub(crate) mod bind;
pub mod condition;
pub mod ddl;
pub mod sanitize;

pub use condition::{render_filter, render_order_by};
pub use ddl::DdlGenerator;
pub use sanitize::{RESERVED_KEYWORDS, quote_identifier, validate_identifier};
