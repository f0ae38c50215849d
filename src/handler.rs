pub mod admin;
pub mod auth;
pub mod catalog;
pub mod messages;
pub mod offers;
pub mod payments;
pub mod profiles;
pub mod reviews;
pub mod system;
pub mod tasks;
pub mod uploads;
