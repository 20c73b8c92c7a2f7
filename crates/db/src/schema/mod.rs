/// On-disk record formats.
pub mod types;
