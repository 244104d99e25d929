pub mod channels;
pub mod info;
pub mod stream;
