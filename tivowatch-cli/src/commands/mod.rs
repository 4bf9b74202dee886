pub mod logs;
pub mod run;
pub mod shares;
pub mod status;
pub mod watch;
