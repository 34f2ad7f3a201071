//! Error types for recoverable (runtime) and fatal (critical) failures.

#[doc(inline)]
pub use critical::CriticalError;
#[doc(inline)]
pub use runtime::RuntimeError;

mod critical;
mod runtime;
