pub mod email;
pub mod push;
