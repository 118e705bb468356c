pub mod config;
pub mod counters;
pub mod csv_log;
pub mod dashboard;
pub mod error;
pub mod pollers;
pub mod samples;
pub mod snmp_source;
pub mod store;
pub mod tokens;
pub mod vendor;
