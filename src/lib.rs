pub mod activity;
pub mod camper;
pub mod config;
pub mod db;
pub mod entity;
pub mod environment;
pub mod errors;
pub mod io;
pub mod routes;
pub mod signup;
