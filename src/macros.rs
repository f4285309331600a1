/// Builds an [`crate::Error::MalformedImage`] that remembers where it was raised.
///
/// ```rust, ignore
/// return Err(malformed_error!("Unknown file format - magic {:08X}", magic));
/// ```
macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::MalformedImage {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedImage {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Builds an [`crate::Error::Configuration`] from a format string.
///
/// ```rust, ignore
/// return Err(config_error!("Unknown substitute type '{}'", name));
/// ```
macro_rules! config_error {
    ($fmt:expr) => {
        crate::Error::Configuration($fmt.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Configuration(format!($fmt, $($arg)*))
    };
}
