//! 具体渠道实现

pub mod sendgrid;

pub use sendgrid::{SendGridConfig, SendGridMailer};
