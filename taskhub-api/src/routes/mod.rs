/// API route handlers

pub mod auth;
pub mod health;
pub mod me;
pub mod todos;
pub mod users;
