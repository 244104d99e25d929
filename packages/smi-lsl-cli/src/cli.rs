use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "smi-lsl",
    version,
    about = "Stream SMI iViewX eye-tracking data to Lab Streaming Layer",
    long_about = "Connects to an SMI iViewX eye tracker, runs an interactive calibration and \
                  publishes raw gaze samples and fixation/saccade events as LSL streams.\n\
                  Requires the iViewX SDK library. Set $IVIEWX_SDK_PATH or use --sdk-path."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect, calibrate and stream gaze data until stopped
    Stream(StreamArgs),
    /// Show SDK library resolution and build information
    Info(InfoArgs),
    /// List the channel layout of both streams
    Channels(ChannelsArgs),
}

/// Where mapped records are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Lab Streaming Layer outlets (requires the lsl-support feature)
    Lsl,
    /// Newline-delimited JSON on stdout or --output
    Json,
}

#[derive(Args)]
pub struct StreamArgs {
    /// Path to the iViewX SDK library
    #[arg(long, env = "IVIEWX_SDK_PATH")]
    pub sdk_path: Option<String>,

    /// Address iViewX listens on
    #[arg(long, env = "SMI_LSL_SEND_IP", default_value = "127.0.0.1")]
    pub send_ip: String,

    #[arg(long, env = "SMI_LSL_SEND_PORT", default_value_t = 4444)]
    pub send_port: u16,

    /// Address this machine receives data on
    #[arg(long, env = "SMI_LSL_RECEIVE_IP", default_value = "127.0.0.1")]
    pub receive_ip: String,

    #[arg(long, env = "SMI_LSL_RECEIVE_PORT", default_value_t = 5555)]
    pub receive_port: u16,

    /// Largest accepted calibration deviation in degrees
    #[arg(long, env = "SMI_LSL_MIN_ACCURACY", default_value_t = smi_lsl::calibration::DEFAULT_MIN_ACCURACY)]
    pub min_accuracy: f64,

    /// Give up calibrating after this many rounds
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Start streaming without calibrating
    #[arg(long, default_value_t = false)]
    pub skip_calibration: bool,

    /// Run the first calibration round under manual control
    #[arg(long, default_value_t = false)]
    pub manual: bool,

    /// Use a simulated tracker instead of the SDK
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Sample rate of the simulated tracker in Hz
    #[arg(long, default_value_t = 60, requires = "simulate")]
    pub sim_rate: i32,

    /// Output sink (default: lsl when compiled in, json otherwise)
    #[arg(long, value_enum, env = "SMI_LSL_SINK")]
    pub sink: Option<SinkKind>,

    /// File for the json sink (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Outlet chunk size in samples
    #[arg(long, default_value_t = smi_lsl::streams::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: i32,

    /// Outlet buffer in seconds
    #[arg(long, default_value_t = smi_lsl::streams::DEFAULT_MAX_BUFFERED)]
    pub max_buffer: i32,

    /// Device model advertised in the stream metadata
    #[arg(long, default_value = "RED")]
    pub model: String,

    /// SDK log file
    #[arg(long, default_value = smi_lsl::config::DEFAULT_SDK_LOG_FILE)]
    pub log_file: String,

    /// SDK log level
    #[arg(long, default_value_t = smi_lsl::config::DEFAULT_SDK_LOG_LEVEL)]
    pub log_level: i32,

    /// Do not read the console; stop with Ctrl+C only
    #[arg(long, default_value_t = false)]
    pub no_stdin: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the iViewX SDK library
    #[arg(long, env = "IVIEWX_SDK_PATH")]
    pub sdk_path: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ChannelsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write the JSON layout to a file instead of stdout
    #[arg(short, long, requires = "json")]
    pub output: Option<String>,
}
