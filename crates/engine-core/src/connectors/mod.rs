pub mod artifact;
pub mod notify;
pub mod source;
