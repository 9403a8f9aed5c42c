pub mod admin;
pub mod health;
pub mod phone_numbers;
pub mod session;
pub mod submissions;
