//! Fixed-size kernel structures and attribute constants.

pub mod addr;
pub mod link;
pub mod route;
pub mod tc;
