pub mod auth;
pub mod citamed;
pub mod cli;
pub mod mailer;
pub mod otp;
pub mod users;
