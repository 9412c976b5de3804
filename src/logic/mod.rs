// src/logic/mod.rs
//! Timer behaviour and the device control loop

pub mod controller;
pub mod state_machine;

pub use controller::DeviceContext;
pub use state_machine::{TimerState, TimerStateMachine};
