pub mod authz;
pub mod complaint;
pub mod student;
pub mod user;
