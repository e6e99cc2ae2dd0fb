pub mod cell;
pub mod dashboard;
pub mod form;
pub mod moderation;
pub mod table;
