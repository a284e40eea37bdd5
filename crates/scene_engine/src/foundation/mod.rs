//! Foundation: math types, fixed-step timing and logging set-up

pub mod logging;
pub mod math;
pub mod time;
