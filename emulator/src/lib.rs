pub mod access;
pub mod bootstrap;
pub mod dma;
pub mod emulator;
pub mod emulator_state;
pub mod error;
pub mod io;
pub mod listing;

pub use emulator::{Emulator, ExecRet, Step, StepFlags};
pub use emulator_state::{Chan, Channel, EmulatorState};
pub use error::{StepError, Unsupported};
pub use io::Bus;
