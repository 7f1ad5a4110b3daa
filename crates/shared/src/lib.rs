//! Wire types shared between the clinic front end and its backend API.

mod envelope;
mod models;

pub use envelope::*;
pub use models::*;
