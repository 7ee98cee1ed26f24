use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{
    fs,
    io::{self, ErrorKind},
};

use screengrab::{CaptureBuffer, Config};
use thiserror::Error;
use tracing::{
    Level, info,
    subscriber::{SetGlobalDefaultError, set_global_default},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt};

const CONFIG_FILE_PATH: &str = "./screengrab.toml";

pub fn setup_logger() -> Result<WorkerGuard, SetGlobalDefaultError> {
    let filter = tracing_subscriber::filter::Targets::new().with_default(Level::DEBUG);

    // stdout logger
    let (std_writer, std_guard) = tracing_appender::non_blocking(io::stdout());
    let std_logger = tracing_subscriber::fmt::layer()
        .with_writer(std_writer)
        .with_ansi(false)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    // Register loggers
    let collector = tracing_subscriber::registry().with(std_logger).with(filter);

    set_global_default(collector)?;

    info!("Application Start");
    Ok(std_guard)
}

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("Failed to read config file:\n{0}")]
    ReadFile(#[source] io::Error),

    #[error("Failed to deserialize config:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}

/// Loads `screengrab.toml` from the working directory, the default config if there is none.
pub fn load_config() -> Result<Config, LoadConfigError> {
    let contents = match fs::read_to_string(CONFIG_FILE_PATH) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config file, using the default config");
            return Ok(Config::default());
        }
        Err(e) => return Err(LoadConfigError::ReadFile(e)),
    };

    let config: Config = toml::from_str(&contents)?;
    info!("Loaded {config:?}");

    Ok(config)
}

/// Saves a capture as a PNG.
pub fn save_png(buffer: &CaptureBuffer, path: &str) -> Result<(), image::ImageError> {
    image::save_buffer(
        path,
        buffer.bytes(),
        buffer.width(),
        buffer.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    info!("Saved {path}");
    Ok(())
}
