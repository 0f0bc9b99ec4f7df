use serde::Serialize;

/// User data without the password hash or reset token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Who is asking for a password change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordChangeIdentity {
    /// A signed-in user.
    Authenticated(String),

    /// An anonymous caller holding a reset token from the e-mailed link.
    ResetToken(String),
}
