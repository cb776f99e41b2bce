pub mod session;
pub mod state;

pub use session::{LocationSnapshot, ParkingSession};
pub use state::{ActiveDetails, ActiveSession, ParkingState, TimeStatus};
