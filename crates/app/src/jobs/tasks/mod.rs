pub mod comment_scan;
pub mod reply_dispatch;
