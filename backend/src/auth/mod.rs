pub mod jwt;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod user_store;
