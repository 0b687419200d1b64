pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod service;
