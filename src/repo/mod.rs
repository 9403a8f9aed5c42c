//! Repositories over the JSON collections.
//!
//! Each collection is a single JSON object keyed by record id. Mutations that
//! must observe the current state (create-or-merge, claims, first-admin
//! checks) go through closures that run inside the store lock.

pub mod admin_users;
pub mod phone_numbers;
pub mod submissions;

use crate::error::AppError;

/// A mutation run while the collection is locked.
pub type Mutation<In, Out> = Box<dyn FnOnce(In) -> Result<Out, AppError> + Send>;
