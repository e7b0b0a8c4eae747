pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod image_modifier;
pub mod image_processing;
pub mod pipeline;
