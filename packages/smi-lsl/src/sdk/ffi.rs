// iViewX SDK binding
//
// The vendor library is loaded at runtime so the bridge builds and runs
// (with the simulated tracker) on machines without the SDK installed.
// Struct layouts mirror iViewXAPI.h; every exported function uses the
// `system` calling convention (stdcall on 32-bit Windows).

use super::{require_connected, EventHandler, EyeTracker, ReturnCode, SampleHandler};
use crate::error::{BridgeError, Result};
use crate::types::{
    Accuracy, CalibrationSettings, DeviceKind, Endpoints, Eye, EyeData, GazeEvent, GazeSample,
    SystemInfo, Version,
};
use libloading::Library;
use parking_lot::RwLock;
use std::ffi::{c_char, c_int, c_longlong, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable holding the full path of the SDK library
pub const LIBRARY_ENV_VAR: &str = "IVIEWX_SDK_PATH";

/// Environment variable holding the SDK install root (library under `bin/`)
pub const LIBRARY_HOME_ENV_VAR: &str = "IVIEWX_HOME";

/// Directories searched when no explicit location is configured
pub const DEFAULT_LIBRARY_PATHS: &[&str] = &[
    "C:\\Program Files (x86)\\SMI\\iView X SDK\\bin",
    "C:\\Program Files\\SMI\\iView X SDK\\bin",
    "/usr/local/lib",
    "/usr/lib",
    ".",
];

const TARGET_FILENAME_LEN: usize = 256;

/// Platform file name of the SDK library
pub fn default_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        if cfg!(target_pointer_width = "64") {
            "iViewXAPI64.dll"
        } else {
            "iViewXAPI.dll"
        }
    } else {
        "libiViewXAPI.so"
    }
}

/// Locate the SDK library.
///
/// Search order:
/// 1. `explicit_path` (no fallback when given)
/// 2. `$IVIEWX_SDK_PATH`
/// 3. `$IVIEWX_HOME/bin/<library>`
/// 4. `DEFAULT_LIBRARY_PATHS`
pub fn find_library(explicit_path: Option<&str>) -> Option<PathBuf> {
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(path)
    }

    if let Some(path) = explicit_path {
        let p = expand_path(path);
        return p.exists().then_some(p);
    }

    if let Ok(env_path) = std::env::var(LIBRARY_ENV_VAR) {
        let p = expand_path(&env_path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(home_path) = std::env::var(LIBRARY_HOME_ENV_VAR) {
        let p = expand_path(&home_path)
            .join("bin")
            .join(default_library_name());
        if p.exists() {
            return Some(p);
        }
    }

    DEFAULT_LIBRARY_PATHS
        .iter()
        .map(|dir| expand_path(dir).join(default_library_name()))
        .find(|p| p.exists())
}

/// Same as `find_library()` but returns an error if not found.
pub fn require_library(explicit_path: Option<&str>) -> Result<PathBuf> {
    find_library(explicit_path).ok_or_else(|| {
        BridgeError::LibraryNotFound(format!(
            "'{}' not found. Set ${} or ${}, pass --sdk-path, or install to one of: {:?}",
            explicit_path.unwrap_or(default_library_name()),
            LIBRARY_ENV_VAR,
            LIBRARY_HOME_ENV_VAR,
            DEFAULT_LIBRARY_PATHS
        ))
    })
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CSystemInfo {
    pub samplerate: c_int,
    pub iv_major_version: c_int,
    pub iv_minor_version: c_int,
    pub iv_buildnumber: c_int,
    pub api_major_version: c_int,
    pub api_minor_version: c_int,
    pub api_buildnumber: c_int,
    pub et_device: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CEyeData {
    pub gaze_x: f64,
    pub gaze_y: f64,
    pub diam: f64,
    pub eye_position_x: f64,
    pub eye_position_y: f64,
    pub eye_position_z: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CSample {
    pub timestamp: c_longlong,
    pub left_eye: CEyeData,
    pub right_eye: CEyeData,
    pub plane_number: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CEvent {
    pub event_type: c_char,
    pub eye: c_char,
    pub start_time: c_longlong,
    pub end_time: c_longlong,
    pub duration: c_longlong,
    pub position_x: f64,
    pub position_y: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CAccuracy {
    pub deviation_lx: f64,
    pub deviation_ly: f64,
    pub deviation_rx: f64,
    pub deviation_ry: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CCalibration {
    pub method: c_int,
    pub visualization: c_int,
    pub display_device: c_int,
    pub speed: c_int,
    pub auto_accept: c_int,
    pub foreground_brightness: c_int,
    pub background_brightness: c_int,
    pub target_shape: c_int,
    pub target_size: c_int,
    pub target_filename: [c_char; TARGET_FILENAME_LEN],
}

impl From<&CEyeData> for EyeData {
    fn from(raw: &CEyeData) -> Self {
        Self {
            gaze_x: raw.gaze_x,
            gaze_y: raw.gaze_y,
            diameter: raw.diam,
            position_x: raw.eye_position_x,
            position_y: raw.eye_position_y,
            position_z: raw.eye_position_z,
        }
    }
}

impl From<&CSample> for GazeSample {
    fn from(raw: &CSample) -> Self {
        Self {
            timestamp_us: raw.timestamp,
            left: EyeData::from(&raw.left_eye),
            right: EyeData::from(&raw.right_eye),
            plane_number: raw.plane_number,
        }
    }
}

impl From<&CEvent> for GazeEvent {
    fn from(raw: &CEvent) -> Self {
        Self {
            event_type: raw.event_type as u8 as char,
            eye: Eye::from(raw.eye as u8 as char),
            start_time_us: raw.start_time,
            end_time_us: raw.end_time,
            duration_us: raw.duration,
            position_x: raw.position_x,
            position_y: raw.position_y,
        }
    }
}

impl From<&CSystemInfo> for SystemInfo {
    fn from(raw: &CSystemInfo) -> Self {
        Self {
            sample_rate: raw.samplerate,
            iview_version: Version {
                major: raw.iv_major_version,
                minor: raw.iv_minor_version,
                build: raw.iv_buildnumber,
            },
            api_version: Version {
                major: raw.api_major_version,
                minor: raw.api_minor_version,
                build: raw.api_buildnumber,
            },
            device: DeviceKind::from_raw(raw.et_device),
        }
    }
}

impl From<&CAccuracy> for Accuracy {
    fn from(raw: &CAccuracy) -> Self {
        Self {
            deviation_lx: raw.deviation_lx,
            deviation_ly: raw.deviation_ly,
            deviation_rx: raw.deviation_rx,
            deviation_ry: raw.deviation_ry,
        }
    }
}

impl From<&CalibrationSettings> for CCalibration {
    fn from(settings: &CalibrationSettings) -> Self {
        // Truncated to leave room for the terminating NUL
        let mut target_filename = [0 as c_char; TARGET_FILENAME_LEN];
        for (dst, src) in target_filename
            .iter_mut()
            .zip(settings.target_filename.bytes().take(TARGET_FILENAME_LEN - 1))
        {
            *dst = src as c_char;
        }

        Self {
            method: settings.method,
            visualization: settings.visualization,
            display_device: settings.display_device,
            speed: settings.speed,
            auto_accept: c_int::from(settings.auto_accept),
            foreground_brightness: settings.foreground_brightness,
            background_brightness: settings.background_brightness,
            target_shape: settings.target_shape,
            target_size: settings.target_size,
            target_filename,
        }
    }
}

type SampleCallback = extern "system" fn(CSample) -> c_int;
type EventCallback = extern "system" fn(CEvent) -> c_int;

type ConnectFn = unsafe extern "system" fn(*const c_char, c_int, *const c_char, c_int) -> c_int;
type SetLoggerFn = unsafe extern "system" fn(c_int, *const c_char) -> c_int;
type GetSystemInfoFn = unsafe extern "system" fn(*mut CSystemInfo) -> c_int;
type SetupCalibrationFn = unsafe extern "system" fn(*mut CCalibration) -> c_int;
type NoArgFn = unsafe extern "system" fn() -> c_int;
type GetAccuracyFn = unsafe extern "system" fn(*mut CAccuracy, c_int) -> c_int;
type SetSampleCallbackFn = unsafe extern "system" fn(Option<SampleCallback>) -> c_int;
type SetEventCallbackFn = unsafe extern "system" fn(Option<EventCallback>) -> c_int;

// The SDK callbacks carry no user pointer, so the active handlers live here.
static SAMPLE_HANDLER: RwLock<Option<SampleHandler>> = parking_lot::const_rwlock(None);
static EVENT_HANDLER: RwLock<Option<EventHandler>> = parking_lot::const_rwlock(None);
static REGISTRY_CLAIMED: AtomicBool = AtomicBool::new(false);

extern "system" fn sample_trampoline(raw: CSample) -> c_int {
    let sample = GazeSample::from(&raw);
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(handler) = SAMPLE_HANDLER.read().as_ref() {
            handler(&sample);
        }
    }));
    if delivered.is_err() {
        log::error!("Sample handler panicked at timestamp {}", sample.timestamp_us);
    }
    0
}

extern "system" fn event_trampoline(raw: CEvent) -> c_int {
    let event = GazeEvent::from(&raw);
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(handler) = EVENT_HANDLER.read().as_ref() {
            handler(&event);
        }
    }));
    if delivered.is_err() {
        log::error!("Event handler panicked at start time {}", event.start_time_us);
    }
    0
}

/// Exported functions, copied out of the library at load time
struct Api {
    connect: ConnectFn,
    set_logger: SetLoggerFn,
    get_system_info: GetSystemInfoFn,
    setup_calibration: SetupCalibrationFn,
    calibrate: NoArgFn,
    validate: NoArgFn,
    get_accuracy: GetAccuracyFn,
    set_sample_callback: SetSampleCallbackFn,
    set_event_callback: SetEventCallbackFn,
    disconnect: NoArgFn,
}

/// # Safety
/// `T` must match the exported function's signature.
unsafe fn symbol<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|e| BridgeError::LibraryLoad(format!("missing symbol `{}`: {}", name, e)))
}

/// Runtime-loaded iViewX SDK
///
/// Owns the process-wide callback registry for as long as it lives.
pub struct IViewX {
    path: PathBuf,
    api: Api,
    connected: bool,
    sample_registered: bool,
    event_registered: bool,
    // Declared last: the function pointers in `api` are only valid while loaded
    _lib: Library,
}

impl IViewX {
    /// Load the SDK library from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(BridgeError::LibraryNotFound(path.display().to_string()));
        }

        if REGISTRY_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::CallbacksInUse);
        }

        match Self::open(&path) {
            Ok((lib, api)) => {
                log::info!("Loaded iViewX SDK from {}", path.display());
                Ok(Self {
                    path,
                    api,
                    connected: false,
                    sample_registered: false,
                    event_registered: false,
                    _lib: lib,
                })
            }
            Err(e) => {
                REGISTRY_CLAIMED.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    fn open(path: &Path) -> Result<(Library, Api)> {
        // SAFETY: Loading the vendor library runs its initializers; it is trusted.
        let lib = unsafe { Library::new(path) }
            .map_err(|e| BridgeError::LibraryLoad(format!("{}: {}", path.display(), e)))?;

        // SAFETY: Signatures follow iViewXAPI.h.
        let api = unsafe {
            Api {
                connect: symbol(&lib, "iV_Connect")?,
                set_logger: symbol(&lib, "iV_SetLogger")?,
                get_system_info: symbol(&lib, "iV_GetSystemInfo")?,
                setup_calibration: symbol(&lib, "iV_SetupCalibration")?,
                calibrate: symbol(&lib, "iV_Calibrate")?,
                validate: symbol(&lib, "iV_Validate")?,
                get_accuracy: symbol(&lib, "iV_GetAccuracy")?,
                set_sample_callback: symbol(&lib, "iV_SetSampleCallback")?,
                set_event_callback: symbol(&lib, "iV_SetEventCallback")?,
                disconnect: symbol(&lib, "iV_Disconnect")?,
            }
        };

        Ok((lib, api))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

}

fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| BridgeError::InvalidConfig(format!("{} contains a NUL byte", what)))
}

impl EyeTracker for IViewX {
    fn name(&self) -> &str {
        "iViewX"
    }

    fn connect(&mut self, endpoints: &Endpoints) -> Result<()> {
        let send_ip = c_string(&endpoints.send_ip, "send address")?;
        let receive_ip = c_string(&endpoints.receive_ip, "receive address")?;

        log::info!(
            "Connecting to iViewX: send {}:{}, receive {}:{}",
            endpoints.send_ip,
            endpoints.send_port,
            endpoints.receive_ip,
            endpoints.receive_port
        );

        // SAFETY: Both strings outlive the call.
        let code = ReturnCode(unsafe {
            (self.api.connect)(
                send_ip.as_ptr(),
                c_int::from(endpoints.send_port),
                receive_ip.as_ptr(),
                c_int::from(endpoints.receive_port),
            )
        });
        if !code.is_success() {
            return Err(BridgeError::Connection(code));
        }

        self.connected = true;
        Ok(())
    }

    fn set_logger(&mut self, level: i32, path: &Path) -> Result<()> {
        let filename = c_string(&path.to_string_lossy(), "log file path")?;
        // SAFETY: `filename` outlives the call.
        ReturnCode(unsafe { (self.api.set_logger)(level, filename.as_ptr()) }).check("iV_SetLogger")
    }

    fn system_info(&mut self) -> Result<SystemInfo> {
        require_connected(self.connected, "iV_GetSystemInfo")?;
        let mut raw = CSystemInfo::default();
        // SAFETY: `raw` is a valid, writable SystemInfoStruct.
        ReturnCode(unsafe { (self.api.get_system_info)(&mut raw) }).check("iV_GetSystemInfo")?;
        Ok(SystemInfo::from(&raw))
    }

    fn setup_calibration(&mut self, settings: &CalibrationSettings) -> Result<()> {
        require_connected(self.connected, "iV_SetupCalibration")?;
        let mut raw = CCalibration::from(settings);
        // SAFETY: `raw` is a valid CalibrationStruct.
        ReturnCode(unsafe { (self.api.setup_calibration)(&mut raw) }).check("iV_SetupCalibration")
    }

    fn calibrate(&mut self) -> Result<()> {
        require_connected(self.connected, "iV_Calibrate")?;
        // SAFETY: No arguments.
        ReturnCode(unsafe { (self.api.calibrate)() }).check("iV_Calibrate")
    }

    fn validate(&mut self) -> Result<()> {
        require_connected(self.connected, "iV_Validate")?;
        // SAFETY: No arguments.
        ReturnCode(unsafe { (self.api.validate)() }).check("iV_Validate")
    }

    fn accuracy(&mut self) -> Result<Accuracy> {
        require_connected(self.connected, "iV_GetAccuracy")?;
        let mut raw = CAccuracy::default();
        // SAFETY: `raw` is a valid, writable AccuracyStruct; 0 disables visualization.
        ReturnCode(unsafe { (self.api.get_accuracy)(&mut raw, 0) }).check("iV_GetAccuracy")?;
        Ok(Accuracy::from(&raw))
    }

    fn set_sample_handler(&mut self, handler: Option<SampleHandler>) -> Result<()> {
        let install = handler.is_some();
        *SAMPLE_HANDLER.write() = handler;

        // Once registered the trampoline stays installed; an empty slot makes it a no-op.
        if install && !self.sample_registered {
            // SAFETY: The trampoline matches pDLLSetSample and lives for the whole process.
            ReturnCode(unsafe { (self.api.set_sample_callback)(Some(sample_trampoline)) })
                .check("iV_SetSampleCallback")?;
            self.sample_registered = true;
        }
        Ok(())
    }

    fn set_event_handler(&mut self, handler: Option<EventHandler>) -> Result<()> {
        let install = handler.is_some();
        *EVENT_HANDLER.write() = handler;

        if install && !self.event_registered {
            // SAFETY: The trampoline matches pDLLSetEvent and lives for the whole process.
            ReturnCode(unsafe { (self.api.set_event_callback)(Some(event_trampoline)) })
                .check("iV_SetEventCallback")?;
            self.event_registered = true;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        // SAFETY: No arguments.
        ReturnCode(unsafe { (self.api.disconnect)() }).check("iV_Disconnect")
    }
}

impl Drop for IViewX {
    fn drop(&mut self) {
        SAMPLE_HANDLER.write().take();
        EVENT_HANDLER.write().take();
        if let Err(e) = self.disconnect() {
            log::warn!("Disconnect during teardown failed: {}", e);
        }
        REGISTRY_CLAIMED.store(false, Ordering::Release);
    }
}
