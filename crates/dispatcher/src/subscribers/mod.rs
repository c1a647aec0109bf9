//! Subscriber implementations

mod log;

pub use self::log::LogSubscriber;
