use smi_lsl::BridgeError;

pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 1;
pub const EXECUTION_ERROR: i32 = 2;
pub const SDK_NOT_FOUND: i32 = 3;
pub const CONNECTION_ERROR: i32 = 4;

/// Exit code for a library error
pub fn for_error(error: &BridgeError) -> i32 {
    match error {
        BridgeError::LibraryNotFound(_) | BridgeError::LibraryLoad(_) => SDK_NOT_FOUND,
        BridgeError::Connection(_) => CONNECTION_ERROR,
        BridgeError::InvalidConfig(_) => INPUT_ERROR,
        _ => EXECUTION_ERROR,
    }
}
