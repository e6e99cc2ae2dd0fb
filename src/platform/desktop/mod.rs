pub mod blocking;
pub mod debounce;
