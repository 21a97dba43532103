pub mod init;
pub mod spans;
pub mod tick_id;
