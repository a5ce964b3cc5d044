pub mod resource;
pub mod service;
