pub mod prelude;

pub mod cases;
pub mod user_cases;
pub mod users;
