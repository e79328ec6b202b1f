//! Error handling utilities

use crate::error::QueryError;
use tracing::error;

/// Report a fatal error and exit.
///
/// Query errors print their user message and exit with their own code;
/// anything else prints the message and exits with 1. With `verbose >= 1`
/// the full cause chain follows.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);

    let exit_code = match error.chain().find_map(|cause| cause.downcast_ref::<QueryError>()) {
        Some(query_err) => {
            eprintln!("Error: {}", query_err.user_message());
            query_err.exit_code()
        }
        None => {
            eprintln!("Error: {error}");
            1
        }
    };

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code)
}
