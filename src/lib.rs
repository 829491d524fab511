pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod gmail;
pub mod labels;
pub mod models;
pub mod mutation;
pub mod report;
pub mod retry;
pub mod sync;
