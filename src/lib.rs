#[macro_use]
extern crate log;
extern crate argon2;

pub mod domain;
pub mod infrastructure;
pub mod presentation;
