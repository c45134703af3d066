pub mod email_verification_token;
pub mod password_reset_token;
pub mod reset_request_log;
pub mod session;
pub mod user;

pub use email_verification_token::EmailVerificationTokenRepository;
pub use password_reset_token::PasswordResetTokenRepository;
pub use reset_request_log::ResetRequestLogRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
