pub mod image;
pub mod sensor;
pub mod window;
pub mod zone;
