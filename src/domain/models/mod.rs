pub mod announcement;
pub mod auth;
pub mod booking;
pub mod event;
pub mod job;
pub mod notification;
pub mod review;
pub mod user;
