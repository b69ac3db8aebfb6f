pub mod api_models;
pub mod config;
pub mod frame;
pub mod handler;
pub mod internal;
pub mod model;
pub mod monitor;
