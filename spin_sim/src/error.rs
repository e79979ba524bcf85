use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Simulation error types. None of these are recoverable mid-run: the
/// pipeline is a total function of its inputs and any failure aborts with a
/// diagnostic naming the step that produced it.
#[derive(Debug)]
pub enum Error {
    /// missing, unreadable, or malformed input (params, spin system, waveform)
    Config(String),
    /// spin system cannot span a Hilbert space
    InvalidDimension(String),
    /// non-finite or out-of-range angle, phase, or duration
    InvalidArgument(String),
    /// matrix exponential failed to produce a usable result
    NumericInstability(String),
    Io(std::io::Error),
}

impl Error {
    /// prefix the diagnostic with the sequence transition or sample index
    /// that produced it
    pub fn context(self, what: &str) -> Error {
        match self {
            Error::Config(m) => Error::Config(format!("{}: {}", what, m)),
            Error::InvalidDimension(m) => Error::InvalidDimension(format!("{}: {}", what, m)),
            Error::InvalidArgument(m) => Error::InvalidArgument(format!("{}: {}", what, m)),
            Error::NumericInstability(m) => Error::NumericInstability(format!("{}: {}", what, m)),
            e @ Error::Io(_) => e,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::InvalidDimension(msg) => write!(f, "invalid dimension: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::NumericInstability(msg) => write!(f, "numeric instability: {}", msg),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_step() {
        let e = Error::InvalidArgument("duration is negative".to_string());
        let e = e.context("interval t_2g1");
        assert_eq!(
            e.to_string(),
            "invalid argument: interval t_2g1: duration is negative"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error as StdError;
        let e = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(e.source().is_some());
    }
}
