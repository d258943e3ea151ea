pub mod access;
pub mod catalog;
pub mod concurrency;
pub mod config;
pub mod database;
pub mod error;
pub mod storage;
pub mod transaction;
