//! Error types shared by the juncture crates.

/// Errors reported by framework operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A native operation reported failure through a status string.
    Native(String),
    /// The runtime is already initialised on a different thread.
    RuntimeOnOtherThread,
    /// No registered audio device type has this name.
    UnknownDeviceType(String),
    /// The current device type could not create the requested device.
    DeviceCreationFailed { input: String, output: String },
    /// The operation needs an open audio device.
    NoDeviceOpen,
    /// No registered plugin format has this name.
    UnknownPluginFormat(String),
    /// A plugin format could not instantiate a plugin.
    PluginCreationFailed(String),
    /// An application object is already installed on this thread.
    ApplicationAlreadyInstalled,
    /// Persisted state could not be read or written.
    State(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(msg) => write!(f, "{msg}"),
            Self::RuntimeOnOtherThread => {
                write!(f, "runtime already initialised on another thread")
            }
            Self::UnknownDeviceType(name) => write!(f, "unknown audio device type: {name}"),
            Self::DeviceCreationFailed { input, output } => write!(
                f,
                "could not create audio device (input: {input:?}, output: {output:?})"
            ),
            Self::NoDeviceOpen => write!(f, "no audio device open"),
            Self::UnknownPluginFormat(name) => write!(f, "unknown plugin format: {name}"),
            Self::PluginCreationFailed(msg) => write!(f, "plugin creation failed: {msg}"),
            Self::ApplicationAlreadyInstalled => write!(f, "application already installed"),
            Self::State(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self::Native(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self::Native(msg)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::State(err.to_string())
    }
}

/// Result type for framework operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::from("device busy").to_string(), "device busy");
        assert_eq!(
            Error::DeviceCreationFailed {
                input: String::new(),
                output: "Out".to_string(),
            }
            .to_string(),
            "could not create audio device (input: \"\", output: \"Out\")"
        );
    }

    #[test]
    fn test_json_error_becomes_state() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(Error::from(err), Error::State(_)));
    }
}
