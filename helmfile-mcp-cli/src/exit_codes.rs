//! Process exit codes

/// Command completed and the response was a success
pub const EXIT_SUCCESS: i32 = 0;

/// Startup failure, or the response was an error
pub const EXIT_ERROR: i32 = 1;
