pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod dispatcher;
pub mod error;
pub mod providers;
pub mod router;
pub mod routes;
pub mod state;
