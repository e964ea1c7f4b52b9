//! Odoo record store over XML-RPC

pub mod client;
pub mod xmlrpc;

pub use client::{ModelInfo, OdooClient};
