pub mod admins;
pub mod audit;
pub mod qr_sessions;
pub mod schedule;
pub mod services;
pub mod sessions;
pub mod users;
