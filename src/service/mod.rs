pub mod admins;
pub mod config;
pub mod events;
pub mod phone_numbers;
pub mod session;
pub mod submissions;
