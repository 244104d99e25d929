use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw return value of an iViewX API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnCode(pub i32);

impl ReturnCode {
    pub const SUCCESS: ReturnCode = ReturnCode(1);
    pub const NO_VALID_DATA: ReturnCode = ReturnCode(2);
    pub const CALIBRATION_ABORTED: ReturnCode = ReturnCode(3);
    pub const COULD_NOT_CONNECT: ReturnCode = ReturnCode(100);
    pub const NOT_CONNECTED: ReturnCode = ReturnCode(101);
    pub const NOT_CALIBRATED: ReturnCode = ReturnCode(102);
    pub const NOT_VALIDATED: ReturnCode = ReturnCode(103);
    pub const WRONG_PARAMETER: ReturnCode = ReturnCode(112);
    pub const FUNC_NOT_LOADED: ReturnCode = ReturnCode(401);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Symbolic SDK name, if the code is documented.
    pub fn name(self) -> Option<&'static str> {
        lookup(self.0).map(|(name, _)| name)
    }

    /// Human-readable explanation of the code.
    pub fn describe(self) -> &'static str {
        lookup(self.0)
            .map(|(_, text)| text)
            .unwrap_or("unknown iViewX return code")
    }

    /// Convert into a `Result`, tagging failures with the API call name.
    pub fn check(self, call: &'static str) -> crate::Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(crate::BridgeError::Sdk { call, code: self })
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({}): {}", name, self.0, self.describe()),
            None => write!(f, "{}: {}", self.0, self.describe()),
        }
    }
}

fn lookup(code: i32) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        1 => ("RET_SUCCESS", "intended functionality has been fulfilled"),
        2 => ("RET_NO_VALID_DATA", "no new data available"),
        3 => ("RET_CALIBRATION_ABORTED", "calibration was aborted"),
        100 => ("ERR_COULD_NOT_CONNECT", "failed to establish connection"),
        101 => ("ERR_NOT_CONNECTED", "no connection established"),
        102 => ("ERR_NOT_CALIBRATED", "system is not calibrated"),
        103 => ("ERR_NOT_VALIDATED", "system is not validated"),
        104 => (
            "ERR_EYETRACKING_APPLICATION_NOT_RUNNING",
            "no eye tracking application running",
        ),
        105 => (
            "ERR_WRONG_COMMUNICATION_PARAMETER",
            "wrong port settings",
        ),
        111 => ("ERR_WRONG_DEVICE", "eye tracking device required for this function is not connected"),
        112 => ("ERR_WRONG_PARAMETER", "parameter out of range"),
        113 => ("ERR_WRONG_CALIBRATION_METHOD", "eye tracking device required for this calibration method is not connected"),
        114 => ("ERR_CALIBRATION_TIMEOUT", "calibration timed out"),
        115 => ("ERR_TRACKING_NOT_STABLE", "eye tracking is not stable"),
        121 => ("ERR_CREATE_SOCKET", "failed to create sockets"),
        122 => ("ERR_CONNECT_SOCKET", "failed to connect sockets"),
        123 => ("ERR_BIND_SOCKET", "failed to bind sockets"),
        124 => ("ERR_DELETE_SOCKET", "failed to delete sockets"),
        131 => ("ERR_NO_RESPONSE_FROM_IVIEWX", "no response from iViewX; check iViewX connection settings (IP addresses, ports) or last command"),
        132 => ("ERR_INVALID_IVIEWX_VERSION", "iViewX version could not be resolved"),
        133 => ("ERR_WRONG_IVIEWX_VERSION", "wrong version of iViewX"),
        171 => ("ERR_ACCESS_TO_FILE", "failed to access log file"),
        181 => ("ERR_SOCKET_CONNECTION", "socket error during data transfer"),
        191 => ("ERR_EMPTY_DATA_BUFFER", "recording buffer is empty"),
        192 => ("ERR_RECORDING_DATA_BUFFER", "recording is activated"),
        193 => ("ERR_FULL_DATA_BUFFER", "data buffer is full"),
        194 => ("ERR_IVIEWX_IS_NOT_READY", "iViewX is not ready"),
        201 => ("ERR_IVIEWX_NOT_FOUND", "no installed SMI eye tracking application detected"),
        202 => ("ERR_IVIEWX_PATH_NOT_FOUND", "could not access eye tracking application path"),
        203 => ("ERR_IVIEWX_ACCESS_DENIED", "access to eye tracking application denied"),
        204 => ("ERR_IVIEWX_ACCESS_INCOMPLETE", "access to eye tracking application incomplete"),
        205 => ("ERR_IVIEWX_OUT_OF_MEMORY", "eye tracking application ran out of memory"),
        211 => ("ERR_CAMERA_NOT_FOUND", "camera could not be found"),
        212 => ("ERR_WRONG_CAMERA", "wrong camera"),
        213 => ("ERR_WRONG_CAMERA_PORT", "wrong camera port"),
        220 => ("ERR_COULD_NOT_OPEN_PORT", "could not open port"),
        221 => ("ERR_COULD_NOT_CLOSE_PORT", "could not close port"),
        222 => ("ERR_AOI_ACCESS", "failed to access AOI data"),
        223 => ("ERR_AOI_NOT_DEFINED", "no defined AOI found"),
        250 => ("ERR_FEATURE_NOT_LICENSED", "feature not licensed"),
        300 => ("ERR_DEPRECATED_FUNCTION", "function is deprecated"),
        400 => ("ERR_INITIALIZATION", "initialization failed"),
        401 => ("ERR_FUNC_NOT_LOADED", "function not loaded"),
        _ => return None,
    };
    Some(entry)
}
