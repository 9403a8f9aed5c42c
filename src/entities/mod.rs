pub mod admin_users;
pub mod phone_numbers;
pub mod submissions;
