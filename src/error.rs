use crate::core::BodyId;
use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the fallible entry points of the simulation core.
///
/// The tick itself never fails: numerical trouble inside a tick is rescued and
/// reported through the diagnostic sink instead. These variants cover caller
/// mistakes (bad parameters, unknown ids) and malformed reference data.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Atomic number outside the element table.
    #[error("unknown element: Z={0}")]
    UnknownElement(u32),

    /// A body id that is not (or no longer) present in the world.
    #[error("unknown body: {0}")]
    UnknownBody(BodyId),

    /// Embedded or user-supplied TOML could not be parsed.
    #[error("failed to parse reference data: {0}")]
    ResourceParse(#[from] toml::de::Error),

    /// Reference data parsed but is internally inconsistent.
    #[error("invalid reference data: {0}")]
    InvalidResource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("mass must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("mass"));
    }

    #[test]
    fn unknown_body_mentions_id() {
        let e = Error::UnknownBody(BodyId(42));
        assert!(e.to_string().contains("#42"));
    }

    #[test]
    fn toml_errors_convert() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("x = [");
        let err: Error = parsed.unwrap_err().into();
        assert!(matches!(err, Error::ResourceParse(_)));
    }
}
