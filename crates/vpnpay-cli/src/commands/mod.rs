pub mod init;
pub mod open;
pub mod refund;
pub mod session;
pub mod settle;
pub mod status;
pub mod voucher;
