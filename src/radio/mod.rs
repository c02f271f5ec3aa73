//! UWB radio abstraction

pub mod traits;

pub use traits::{RadioError, ResponseWindow, RxFrame, TxSchedule, UwbRadio};
