pub mod jwt;
pub mod lifecycle;
pub mod portal;
pub mod provider;
pub mod session;
pub mod source;
