pub mod info;
pub mod replace;
