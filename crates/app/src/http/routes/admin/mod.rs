pub mod dispatch;
pub mod scan;
