pub mod admin;
pub mod announcement;
pub mod auth;
pub mod booking;
pub mod event;
pub mod health;
pub mod notification;
pub mod organizer;
pub mod review;
