//! HTTP handlers for accounts, catalog reads, and entity writes.

pub mod account;
pub mod catalog;
pub mod entity;
