/*!
Core merge-and-decide modules for the player audit
*/

pub mod config;
pub mod error;
pub mod policy;
pub mod registry;
pub mod report;
