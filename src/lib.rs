pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
pub mod tenant;
pub mod time_utils;
pub mod web;
