mod cases;
mod users;

pub use cases::cmd_list_cases;
pub use users::cmd_list_users;
