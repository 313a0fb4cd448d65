pub mod commit;
pub mod delta;
pub mod error;
pub mod extract;
pub mod watermark;
