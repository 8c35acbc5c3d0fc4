//! Request authentication

pub mod session;
