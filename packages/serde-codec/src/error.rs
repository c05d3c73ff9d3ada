use std::fmt::Display;

/// Errors from typed encoding and decoding.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The token bridge rejected a call or an accessor failed.
    #[error(transparent)]
    Codec(#[from] docstream_core::Error),

    /// Raised by a `Serialize` or `Deserialize` implementation.
    #[error("{0}")]
    Message(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The core error behind this one, if it came from the token bridge.
    pub fn codec(&self) -> Option<&docstream_core::Error> {
        match self {
            Error::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl From<Error> for docstream_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Codec(e) => e,
            other => docstream_core::Error::binding(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn codec_errors_are_transparent() {
        let e = Error::from(docstream_core::Error::structural("bad"));
        assert_eq!(e.to_string(), "structural violation: bad");
        assert!(e.codec().is_some());
    }

    #[test]
    fn custom_messages() {
        let e = Error::custom("missing field `id`");
        assert_eq!(e.to_string(), "missing field `id`");
        assert!(e.codec().is_none());
    }

    #[test]
    fn converts_back_to_core() {
        let core: docstream_core::Error = Error::custom("nope").into();
        assert_eq!(core, docstream_core::Error::binding("nope"));

        let original = docstream_core::Error::overflow(1u64 << 40, "i32");
        let core: docstream_core::Error = Error::Codec(original.clone()).into();
        assert_eq!(core, original);
    }
}
