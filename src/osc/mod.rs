mod control;
mod naive;
mod oscillator;
pub mod oscillator_math;
mod ramp;

pub use control::{ControlError, ControlHandle, ParameterUpdate};
pub use oscillator::{ConfigError, OscillatorBuilder, OscillatorCore, DEFAULT_RAMP_SECONDS};
pub use ramp::ParameterId;

pub mod prelude {
    pub use super::{OscillatorBuilder, OscillatorCore, ParameterId};
}

#[cfg(debug_assertions)]
pub mod debug {
    pub use super::naive::NaiveSquare;
}
