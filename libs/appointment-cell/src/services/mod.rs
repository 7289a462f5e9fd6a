pub mod booking;
pub mod conflict;
pub mod hours;
pub mod slots;
pub mod store;
