use std::error::Error as StdError;
use std::fmt;

pub type CliResult = Result<(), Error>;

/// Top-level error returned from `main`.
///
/// Wraps any error so the commands can use `?` freely. The `Debug` impl
/// prints the `Display` chain since that is what the user sees on exit.
pub struct Error {
    inner: Box<dyn StdError + 'static>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)?;
        let mut source = self.inner.source();
        while let Some(e) = source {
            write!(f, ": {}", e)?;
            source = e.source();
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<E> From<E> for Error
where
    E: Into<Box<dyn StdError + 'static>>,
{
    fn from(e: E) -> Self {
        Error { inner: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn debug_prints_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "inner failed");
        let err = Error::from(Outer(inner));
        assert_eq!(format!("{:?}", err), "outer failed: inner failed");
        assert_eq!(err.to_string(), "outer failed");
    }

    #[test]
    fn from_str_message() {
        let err: Error = "requested device not found".into();
        assert_eq!(format!("{:?}", err), "requested device not found");
    }
}
