use std::fmt;

/// Type-erased error, matching the style used throughout the base HTTP stack.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The crate's error type.
///
/// Per-attempt failures inside the retry transport are never surfaced
/// individually; they accumulate into [`Error::AttemptsExhausted`] or
/// [`Error::DeadlineExceeded`].
#[derive(Debug)]
pub enum Error {
    /// The pool currently has no hosts to offer.
    NoHosts,
    /// No endpoint's circuit breaker currently allows a request.
    NoTransportAvailable,
    /// The retry budget was consumed before a valid response was obtained.
    AttemptsExhausted {
        attempts: usize,
        causes: Vec<BoxError>,
    },
    /// The configured deadline elapsed before a valid response was obtained.
    DeadlineExceeded { causes: Vec<BoxError> },
    /// A request reached a pool or transport after it was closed.
    PoolClosed,
    /// An error from the underlying HTTP engine, not otherwise classified.
    Underlying(BoxError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoHosts => write!(f, "no hosts available"),
            Error::NoTransportAvailable => write!(f, "no transports available"),
            Error::AttemptsExhausted { attempts, causes } => {
                write!(f, "request failed, max attempts ({attempts}) exceeded")?;
                write_causes(f, causes)
            }
            Error::DeadlineExceeded { causes } => {
                write!(f, "request failed, deadline exceeded")?;
                write_causes(f, causes)
            }
            Error::PoolClosed => write!(f, "pool is closed"),
            Error::Underlying(err) => write!(f, "{err}"),
        }
    }
}

fn write_causes(f: &mut fmt::Formatter<'_>, causes: &[BoxError]) -> fmt::Result {
    if causes.is_empty() {
        return Ok(());
    }
    write!(f, " (")?;
    for (i, cause) in causes.iter().enumerate() {
        if i > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{cause}")?;
    }
    write!(f, ")")
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Underlying(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        Error::Underlying(err)
    }
}
