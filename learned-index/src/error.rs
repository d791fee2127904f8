//! 索引错误类型

/// 学习型认证索引的错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// 查询区间非法（low > high）
    InvalidRange { low: i64, high: i64 },
    /// 需要至少一个 key 的操作作用在空树上
    EmptyIndex,
    /// 请求的版本不在保留窗口内
    VersionOutOfWindow { requested: u64, current: u64 },
    /// 承诺或哈希校验失败，消息说明失败的检查项
    VerificationFailure(String),
    /// 插入已存在的 key
    DuplicateKey(i64),
    /// 批量构建输入不是严格递增，index 为第一个违规位置
    UnsortedInput { index: usize },
    /// 配置非法
    InvalidConfig(String),
    /// bincode 编解码错误
    Codec(String),
}

impl IndexError {
    /// 构造校验失败错误
    pub(crate) fn verification(msg: impl Into<String>) -> Self {
        IndexError::VerificationFailure(msg.into())
    }
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::InvalidRange { low, high } => {
                write!(f, "Invalid range: low {} > high {}", low, high)
            }
            IndexError::EmptyIndex => write!(f, "Index is empty"),
            IndexError::VersionOutOfWindow { requested, current } => write!(
                f,
                "Version {} is outside the retention window (current version {})",
                requested, current
            ),
            IndexError::VerificationFailure(msg) => write!(f, "Verification failed: {}", msg),
            IndexError::DuplicateKey(key) => write!(f, "Duplicate key: {}", key),
            IndexError::UnsortedInput { index } => {
                write!(f, "Input keys not strictly increasing at index {}", index)
            }
            IndexError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            IndexError::Codec(msg) => write!(f, "Codec error: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<bincode::Error> for IndexError {
    fn from(e: bincode::Error) -> Self {
        IndexError::Codec(e.to_string())
    }
}

/// 索引操作 Result 类型
pub type Result<T> = std::result::Result<T, IndexError>;

/// 检查查询区间合法性
pub(crate) fn check_range(low: i64, high: i64) -> Result<()> {
    if low > high {
        return Err(IndexError::InvalidRange { low, high });
    }
    Ok(())
}
