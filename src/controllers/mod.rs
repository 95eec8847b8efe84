//! The two request frontends, both backed by the same
//! [`crate::services::AdmissionController`].

pub mod http;
pub mod ws;
