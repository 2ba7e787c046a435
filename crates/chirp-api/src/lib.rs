pub mod account;
pub mod admin;
pub mod auth;
pub mod context;
pub mod error;
pub mod feed;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod polls;
pub mod posts;
pub mod render;
pub mod routes;
pub mod state;
pub mod users;
