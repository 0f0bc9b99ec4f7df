pub use super::cases::Entity as Cases;
pub use super::user_cases::Entity as UserCases;
pub use super::users::Entity as Users;
