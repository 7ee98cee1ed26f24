use core::fmt::Display;

use thiserror::Error;

/// A shortcut for `Result<T, NativeError>`.
pub type LabelledNativeResult<T> = Result<T, NativeError>;

/// A failed native call wrapped with the name of the call that triggered it.
#[derive(Debug, Error)]
pub struct NativeError {
    call: &'static str,
    #[source]
    source: NativeErrorSource,
}

/// Possible sources for a NativeError.
#[derive(Debug, Error)]
pub enum NativeErrorSource {
    /// A [windows_result::Error].
    #[cfg(windows)]
    #[error(transparent)]
    WindowsError(#[from] windows_result::Error),

    /// A Win32 last-error code.
    #[error("Win32: {0:#010x}")]
    Win32(u32),

    /// The call signalled failure without an error code.
    #[error("{0}")]
    Message(String),
}

impl NativeError {
    /// Create a NativeError from a `windows_result::Error` and a label.
    #[cfg(windows)]
    pub fn new(source: windows_result::Error, call: &'static str) -> Self {
        Self {
            call,
            source: source.into(),
        }
    }

    /// Create a new NativeError from a Win32 last-error code and a label.
    pub fn from_win32(code: u32, call: &'static str) -> Self {
        Self {
            call,
            source: NativeErrorSource::Win32(code),
        }
    }

    /// Create a new NativeError from a message and a label.
    pub fn from_message<S: Into<String>>(message: S, call: &'static str) -> Self {
        Self {
            call,
            source: NativeErrorSource::Message(message.into()),
        }
    }

    /// The name of the native call that failed.
    pub fn call(&self) -> &'static str {
        self.call
    }
}

impl Display for NativeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Native {} call failed:\n{}", self.call, self.source)
    }
}
