//! Parse-error taxonomy for individual decode attempts.

use thiserror::Error;

/// Why a decode attempt declined its input.
///
/// These never escape the public parsing entry points: a failed attempt means
/// the input does not match that decoder's shape, and the caller falls
/// through to a less-structured interpretation. The `try_` variants expose
/// the error for diagnostic logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input does not match the constructor-notation message-list shape.
    #[error("not a constructor-notation message list")]
    NotMessageList,
    /// The shape matched but no fragment yielded a complete message.
    #[error("no messages decoded from constructor-notation list")]
    EmptyDecode,
}
