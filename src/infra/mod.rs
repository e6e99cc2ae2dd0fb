pub mod import;
pub mod sqlite;
pub mod storage;
