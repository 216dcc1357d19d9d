//! Maps transport-level I/O failures into the runtime's shared error type.

use mindroid_core::MindroidError;
use std::io;

/// Wraps an `io::Error` into a `MindroidError::TransactionFailure`,
/// tagging it with the operation that failed, the way
/// `spark-transport-tcp`'s `map_io_error` tags `CoreError` with an
/// `OperationKind`.
pub fn map_io_error(operation: &'static str) -> impl FnOnce(io::Error) -> MindroidError + 'static {
    move |error| MindroidError::transaction_failure(format!("{operation}: {error}"))
}
