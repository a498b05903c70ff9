use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowFsError {
    #[error("config error: {0}")]
    ConfigError(String),
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("row not found: {0}")]
    NotFound(String),
    #[error("write error: {0}")]
    WriteError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("mount error: {0}")]
    MountError(String),
    #[error("io error: {0}")]
    IoError(String),
}

impl RowFsError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        RowFsError::ConfigError(msg.into())
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        RowFsError::ConnectionError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        RowFsError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        RowFsError::NotFound(msg.into())
    }

    pub fn write<T: Into<String>>(msg: T) -> Self {
        RowFsError::WriteError(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        RowFsError::InvalidInput(msg.into())
    }

    pub fn mount<T: Into<String>>(msg: T) -> Self {
        RowFsError::MountError(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        RowFsError::IoError(msg.into())
    }

    /// errno reported to the kernel when an operation fails with this error.
    pub fn errno(&self) -> i32 {
        match self {
            RowFsError::NotFound(_) => libc::ENOENT,
            RowFsError::InvalidInput(_) => libc::EINVAL,
            _ => libc::EIO,
        }
    }
}
