pub mod admission;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod help;
pub mod pool;

pub use admission::{Admission, AdmissionController, CooldownState};
pub use command::{Command, CommandContext, CommandTable};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{CommandError, RegistrationError};
pub use pool::WorkerPool;
