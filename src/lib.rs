//! Document lifecycle tracker: generate product documentation with a language
//! model, route it through human review, and bundle reviewed documents into
//! licensing packages while recording what every generation cost.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod models;
pub mod review_files;
pub mod workflow;
