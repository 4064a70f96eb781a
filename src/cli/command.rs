use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use sacd::process::disc::AreaPreference;
use sacd::process::transcode::OutputMode;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ngit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    "\nbuilt: ",
    env!("BUILD_TIMESTAMP"),
    "\nsacd: ",
    env!("SACD_VERSION"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting SACD disc images and extracting DSD audio",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract tracks from an SACD image, or convert a DSF/DFF file.
    Extract(ExtractArgs),

    /// Print disc, area and track information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Input SACD image (.iso) or DSF/DFF file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path. Without it the input is processed but nothing is written.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Audio area to read from a disc image.
    #[arg(long, value_enum, default_value_t = Area::Auto)]
    pub area: Area,

    /// Track number (1-based). All tracks when omitted.
    #[arg(long, value_name = "N")]
    pub track: Option<usize>,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = ExtractMode::Dff)]
    pub mode: ExtractMode,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input SACD image (.iso) or DSF/DFF file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Audio area to describe.
    #[arg(long, value_enum, default_value_t = Area::Auto)]
    pub area: Area,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Area {
    /// Stereo area when present, multichannel otherwise.
    Auto,
    /// Two channel area.
    Stereo,
    /// Multichannel area.
    Multichannel,
}

impl From<Area> for AreaPreference {
    fn from(area: Area) -> Self {
        match area {
            Area::Auto => AreaPreference::Auto,
            Area::Stereo => AreaPreference::Stereo,
            Area::Multichannel => AreaPreference::MultiChannel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExtractMode {
    /// DSDIFF file. DST areas are stored as DST frames without decoding.
    Dff,
    /// Raw native DSD: 32-bit words per channel, MSB first.
    Native,
    /// DSD over PCM in a 24-bit Wave64 file.
    Dop,
}

impl ExtractMode {
    /// Transcoder output mode, `None` when payloads are written as stored.
    pub fn output_mode(self) -> Option<OutputMode> {
        match self {
            ExtractMode::Dff => None,
            ExtractMode::Native => Some(OutputMode::Native),
            ExtractMode::Dop => Some(OutputMode::Dop),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExtractMode::Dff => "dff",
            ExtractMode::Native => "dsd",
            ExtractMode::Dop => "wav",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ReportFormat {
    /// Aligned text tables.
    Text,
    /// YAML document.
    Yaml,
}
