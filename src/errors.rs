use std::fmt;

#[derive(Debug, Clone)]
pub enum StoreError {
    InvalidUrl(String),
    AlreadyExists(String),
    GenerationExhausted(String),
    NotFound(String),
    Expired(String),
    AuthorizationFailed(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Serialization(String),
    FileOperation(String),
    PasswordHash(String),
    RandomSource(String),
    Config(String),
    StorageBackendNotFound(String),
}

impl StoreError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidUrl(_) => "E001",
            StoreError::AlreadyExists(_) => "E002",
            StoreError::GenerationExhausted(_) => "E003",
            StoreError::NotFound(_) => "E004",
            StoreError::Expired(_) => "E005",
            StoreError::AuthorizationFailed(_) => "E006",
            StoreError::DatabaseConnection(_) => "E007",
            StoreError::DatabaseOperation(_) => "E008",
            StoreError::Serialization(_) => "E009",
            StoreError::FileOperation(_) => "E010",
            StoreError::PasswordHash(_) => "E011",
            StoreError::RandomSource(_) => "E012",
            StoreError::Config(_) => "E013",
            StoreError::StorageBackendNotFound(_) => "E014",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::InvalidUrl(_) => "Invalid URL",
            StoreError::AlreadyExists(_) => "Entry Already Exists",
            StoreError::GenerationExhausted(_) => "ID Generation Exhausted",
            StoreError::NotFound(_) => "Entry Not Found",
            StoreError::Expired(_) => "Entry Expired",
            StoreError::AuthorizationFailed(_) => "Authorization Failed",
            StoreError::DatabaseConnection(_) => "Database Connection Error",
            StoreError::DatabaseOperation(_) => "Database Operation Error",
            StoreError::Serialization(_) => "Serialization Error",
            StoreError::FileOperation(_) => "File Operation Error",
            StoreError::PasswordHash(_) => "Password Hash Error",
            StoreError::RandomSource(_) => "Random Source Error",
            StoreError::Config(_) => "Configuration Error",
            StoreError::StorageBackendNotFound(_) => "Storage Backend Not Found",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            StoreError::InvalidUrl(msg)
            | StoreError::AlreadyExists(msg)
            | StoreError::GenerationExhausted(msg)
            | StoreError::NotFound(msg)
            | StoreError::Expired(msg)
            | StoreError::AuthorizationFailed(msg)
            | StoreError::DatabaseConnection(msg)
            | StoreError::DatabaseOperation(msg)
            | StoreError::Serialization(msg)
            | StoreError::FileOperation(msg)
            | StoreError::PasswordHash(msg)
            | StoreError::RandomSource(msg)
            | StoreError::Config(msg)
            | StoreError::StorageBackendNotFound(msg) => msg,
        }
    }

    /// Wrap the error with extra context, keeping its kind.
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        let wrap = |msg: String| format!("{}: {}", ctx, msg);
        match self {
            StoreError::InvalidUrl(m) => StoreError::InvalidUrl(wrap(m)),
            StoreError::AlreadyExists(m) => StoreError::AlreadyExists(wrap(m)),
            StoreError::GenerationExhausted(m) => StoreError::GenerationExhausted(wrap(m)),
            StoreError::NotFound(m) => StoreError::NotFound(wrap(m)),
            StoreError::Expired(m) => StoreError::Expired(wrap(m)),
            StoreError::AuthorizationFailed(m) => StoreError::AuthorizationFailed(wrap(m)),
            StoreError::DatabaseConnection(m) => StoreError::DatabaseConnection(wrap(m)),
            StoreError::DatabaseOperation(m) => StoreError::DatabaseOperation(wrap(m)),
            StoreError::Serialization(m) => StoreError::Serialization(wrap(m)),
            StoreError::FileOperation(m) => StoreError::FileOperation(wrap(m)),
            StoreError::PasswordHash(m) => StoreError::PasswordHash(wrap(m)),
            StoreError::RandomSource(m) => StoreError::RandomSource(wrap(m)),
            StoreError::Config(m) => StoreError::Config(wrap(m)),
            StoreError::StorageBackendNotFound(m) => StoreError::StorageBackendNotFound(wrap(m)),
        }
    }

    /// 格式化为彩色输出（用于命令行）
    #[cfg(feature = "cli")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for StoreError {}

// 便捷的构造函数
impl StoreError {
    pub fn invalid_url<T: Into<String>>(msg: T) -> Self {
        StoreError::InvalidUrl(msg.into())
    }

    pub fn already_exists<T: Into<String>>(msg: T) -> Self {
        StoreError::AlreadyExists(msg.into())
    }

    pub fn generation_exhausted<T: Into<String>>(msg: T) -> Self {
        StoreError::GenerationExhausted(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StoreError::NotFound(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        StoreError::Expired(msg.into())
    }

    pub fn authorization_failed<T: Into<String>>(msg: T) -> Self {
        StoreError::AuthorizationFailed(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        StoreError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        StoreError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        StoreError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        StoreError::FileOperation(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        StoreError::PasswordHash(msg.into())
    }

    pub fn random_source<T: Into<String>>(msg: T) -> Self {
        StoreError::RandomSource(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        StoreError::Config(msg.into())
    }

    pub fn storage_backend_not_found<T: Into<String>>(msg: T) -> Self {
        StoreError::StorageBackendNotFound(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StoreError::DatabaseConnection(err.to_string())
        } else {
            StoreError::DatabaseOperation(err.to_string())
        }
    }
}

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        StoreError::DatabaseConnection(err.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::DatabaseOperation(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::DatabaseOperation(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::DatabaseOperation(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::DatabaseOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
