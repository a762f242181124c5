pub mod availability;
pub mod blocks;
pub mod catalog;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod ports;
pub mod pricing;
pub mod reference;
pub mod slots;
pub mod store;
pub mod time;
pub mod validate;
pub mod wal;
