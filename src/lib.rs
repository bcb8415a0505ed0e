pub mod api;
pub mod autocomplete;
pub mod config;
pub mod controller;
pub mod http_client;
pub mod logo;
pub mod predictions;
pub mod provider;
pub mod state;
pub mod votes;
