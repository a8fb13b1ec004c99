pub mod auth;
pub mod authz_admin;
pub mod complaints;
pub mod health;
pub mod students;
