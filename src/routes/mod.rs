//! Route modules for PageScan Server

pub mod engines;
pub mod extract;
pub mod health;
