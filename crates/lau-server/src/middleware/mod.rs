//! Request middleware.

pub(crate) mod rpc;
pub(crate) mod security;
