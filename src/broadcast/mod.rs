//! Подсистема рассылок: шов доставки и фоновый планировщик.

pub mod scheduler;
pub mod sink;

pub use scheduler::{run_iteration, start_scheduler};
pub use sink::{BroadcastSink, SendOutcome, TelegramSink};
