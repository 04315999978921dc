pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("`server` must be a non-empty address")]
    EmptyServer,

    #[error("`start_rate` must be a positive integer")]
    InvalidStartRate,

    #[error("`increment` must be a positive integer")]
    InvalidIncrement,

    #[error("`window` must be a positive duration")]
    InvalidWindow,

    #[error("ramp controller was already started")]
    AlreadyStarted,
}
