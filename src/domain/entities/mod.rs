pub mod column;
pub mod error;
pub mod query;
pub mod row;
