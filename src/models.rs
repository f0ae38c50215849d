pub mod catalogmodel;
pub mod messagemodel;
pub mod offermodel;
pub mod paymentmodel;
pub mod profilemodel;
pub mod reviewmodel;
pub mod taskmodel;
