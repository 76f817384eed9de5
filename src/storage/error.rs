use thiserror::Error;

/// Boxed backend fault kept as the cause of an I/O failure / 底层错误
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by storage providers / 存储提供者错误
#[derive(Error, Debug)]
pub enum StorageError {
    /// Caller input rejected before any backend call / 参数无效
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Object is absent (raised from an explicit existence check) / 对象不存在
    #[error("Storage object not found: {object_name}")]
    NotFound { object_name: String },

    /// Any other backend fault, original cause preserved / 存储IO失败
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: BoxedCause,
    },
}

impl StorageError {
    pub fn invalid_argument(name: &str) -> Self {
        StorageError::InvalidArgument(name.to_string())
    }

    pub fn not_found(object_name: &str) -> Self {
        StorageError::NotFound {
            object_name: object_name.to_string(),
        }
    }

    /// Wrap a backend fault / 包装底层错误
    pub fn io<E>(message: &str, source: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        StorageError::Io {
            message: message.to_string(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StorageError::InvalidArgument(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, StorageError::Io { .. })
    }
}

/// Result type for provider operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Classify a backend fault as an I/O failure / 将底层错误归类为IO失败
pub trait IoResultExt<T> {
    fn or_io(self, message: &str) -> StorageResult<T>;
}

impl<T, E> IoResultExt<T> for Result<T, E>
where
    E: Into<BoxedCause>,
{
    fn or_io(self, message: &str) -> StorageResult<T> {
        self.map_err(|e| StorageError::io(message, e))
    }
}
