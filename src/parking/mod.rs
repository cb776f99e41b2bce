pub mod controller;
pub mod machine;

pub use controller::{HapticStyle, ParkingController, ParkingEvent, ParkingSnapshot};
pub use machine::{EndReason, ParkingDeps, ParkingMachine, RecoveryOutcome, StartRequest, TickOutcome};
