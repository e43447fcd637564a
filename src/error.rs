use thiserror::Error;

/// 费率矩阵查询内部错误. 对外统一降级为 "无权威费用", 不中断调用方.
#[derive(Error, Debug)]
pub enum LookupError {
    /// 空值或 "Not found" 占位符, 查询前即拒绝
    #[error("invalid lookup input: {0}")]
    InvalidInput(String),

    /// 数据库不可达或语句执行失败
    #[error("database connectivity failure: {0}")]
    Connectivity(#[from] sqlx::Error),

    #[error("schema discovery failed: {0}")]
    SchemaDiscovery(String),

    #[error("amount '{0}' is not a valid decimal")]
    InvalidAmount(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
