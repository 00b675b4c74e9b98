mod auth_service;
mod catalog_service;
pub mod data_loader;

pub use auth_service::*;
pub use catalog_service::*;
pub use data_loader::DataLoader;
