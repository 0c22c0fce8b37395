//! Core value types: paths, errors, field state, submit outcomes

pub mod error;
pub mod outcome;
pub mod path;
pub mod state;

pub use error::{ActionError, CheckError, ErrorKind, FieldError, SchemaError};
pub use outcome::SubmitOutcome;
pub use path::{FieldPath, ModelRef, PathParseError, Segment};
pub use state::FieldState;
