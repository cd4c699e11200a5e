//! Calculator service: solves handwritten math drawings with a multimodal
//! model.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
