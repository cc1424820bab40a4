pub mod status;
pub mod write;
