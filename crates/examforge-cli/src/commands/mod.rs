pub mod compare;
pub mod init;
pub mod report;
pub mod result;
pub mod take;
pub mod validate;
