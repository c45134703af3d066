pub mod email_verification_token;
pub mod password_reset_token;
pub mod reset_request_log;
pub mod session;
pub mod user;

pub use email_verification_token::EmailVerificationToken;
pub use password_reset_token::PasswordResetToken;
pub use reset_request_log::ResetRequestLogEntry;
pub use session::Session;
pub use user::User;
