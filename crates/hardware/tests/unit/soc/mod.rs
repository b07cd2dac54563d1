/// Arena construction, lookup, and broadcast calls.
pub mod platform;
