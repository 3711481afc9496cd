/// Sales Portal
///
/// Web front end for reseller sales agents: login against the CRM, browse
/// sellable products, submit account intake forms and work through their
/// own accounts.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod crm;
pub mod error;
pub mod record_store;
pub mod server;
pub mod session;
