pub mod admin;
pub mod attendance;
pub mod auth;
pub mod clock;
pub mod error;
pub mod gate;
pub mod health;
pub mod identity;
pub mod routes;
pub mod sessions;
pub mod state;
