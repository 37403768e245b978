pub mod account;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod notify;
pub mod payment;
pub mod req;
pub mod res;
pub mod server;
pub mod utils;
