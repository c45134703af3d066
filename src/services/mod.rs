pub mod auth;
pub mod email;
pub mod email_verification;
pub mod password_reset;
pub mod rate_limit;
pub mod token;

pub use auth::AuthService;
pub use email::EmailClient;
pub use email_verification::EmailVerificationService;
pub use password_reset::PasswordResetService;
pub use rate_limit::ResetRateLimiter;
