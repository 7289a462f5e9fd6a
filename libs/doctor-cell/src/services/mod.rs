pub mod catalog;
pub mod doctor;
