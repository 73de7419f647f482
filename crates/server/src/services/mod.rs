//! External collaborators: payment gateway and blob storage.

pub mod checkout;
pub mod uploads;
