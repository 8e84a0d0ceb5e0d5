pub mod booking;
pub mod catalog;
pub mod config;
pub mod line_bot;
pub mod line_login;
pub mod line_messaging;
pub mod review;
pub mod reward;
pub mod sessions;
pub mod sweet_import;
pub mod user;
