//! `SeaORM` entity definitions.

pub mod applications;
pub mod users;
