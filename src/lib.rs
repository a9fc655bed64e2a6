pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod fs_util;
pub mod hierarchy;
pub mod output;
pub mod parser;
pub mod records;
pub mod reference;
