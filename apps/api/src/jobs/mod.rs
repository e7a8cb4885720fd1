// Job application tracking: CRUD over the `jobs` table.

pub mod handlers;
pub mod repository;
