pub mod backend;
pub mod notifier;
