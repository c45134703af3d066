pub mod email_verification;
pub mod health;
pub mod login;
pub mod password_reset;
pub mod register;

pub use email_verification::{request_email_verification, verify_email_get, verify_email_post};
pub use health::health_check;
pub use login::login;
pub use password_reset::{request_password_reset, reset_password};
pub use register::register;
