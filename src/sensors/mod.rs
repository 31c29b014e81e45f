//! Sensor module - operator button, PIR gate and demo inputs

mod traits;
mod switch;
mod motion;
mod simulator;

pub use traits::{Indicator, InputPins, Level};
pub use switch::{ArmDisarmController, ModeChanged};
pub use motion::{MotionEvent, MotionGate, MotionLatch};
pub use simulator::{LogIndicator, SimulatedInputs};
