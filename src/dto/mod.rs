//! DTO modules that bridge services with callers.

pub mod dashboard;
