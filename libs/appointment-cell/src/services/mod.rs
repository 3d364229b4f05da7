pub mod booking;
pub mod confirmation;
pub mod notification;
