//! Workbench - small web workshops on one server
//!
//! Greetings, template pages, a feedback form, a staff library admin, a
//! login-protected to-do list, a photo gallery and a JSON API for accounts,
//! profiles and tasks.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod templates;
