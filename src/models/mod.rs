pub mod case;
pub mod user;
pub mod validation;
