use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub fees: FeeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 未配置时跳过费率矩阵查询
    pub url: Option<String>,
    /// Postgres 方言下的 schema
    pub schema: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_statement_secs: u64,
    pub default_tables: DefaultTables,
}

/// schema 发现失败时使用的默认表名
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTables {
    pub fee_detail: String,
    pub client: String,
    pub lienholder: String,
    pub fee_type: String,
}

/// 费用解析引擎配置 (显式注入管道, 不使用全局状态)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// 预批准费用白名单, 有序
    pub pre_approved_fees: Vec<String>,
    pub standard_lienholder: String,
    pub default_fee_type: String,
    /// 匹配位置两侧各取的字符数
    pub context_window: usize,
    pub max_blocks: usize,
    pub max_amounts: usize,
    pub max_block_chars: usize,
    pub dedup_context_prefix: usize,
}

pub const NOT_FOUND_SENTINEL: &str = "Not found";

const DEFAULT_PRE_APPROVED_FEES: [&str; 20] = [
    "Field Visit",
    "Flatbed Fees",
    "Dolly Fees",
    "Mileage/ Fuel",
    "Incentive",
    "Frontend",
    "Frontend (for Impound)",
    "LPR Invoulantry Repo",
    "LPR REPOSSESSION",
    "Finder's fee",
    "CR AND PHOTOS FEE",
    "Fuel Surcharge",
    "OTHER",
    "SKIP REPOSSESSION",
    "Bonus",
    "Keys Fee",
    "Key Fee",
    "Involuntary Repo",
    "Voluntary Repo",
    "Recovery Fee",
];

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            schema: "public".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
            slow_statement_secs: 5,
            default_tables: DefaultTables::default(),
        }
    }
}

impl Default for DefaultTables {
    fn default() -> Self {
        Self {
            fee_detail: "FeeDetails".to_string(),
            client: "RDN_Client".to_string(),
            lienholder: "Lienholder".to_string(),
            fee_type: "FeeType".to_string(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            pre_approved_fees: DEFAULT_PRE_APPROVED_FEES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            standard_lienholder: "Standard".to_string(),
            default_fee_type: "Involuntary Repo".to_string(),
            context_window: 30,
            max_blocks: 50,
            max_amounts: 500,
            max_block_chars: 5000,
            dedup_context_prefix: 50,
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.database.url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        if let Ok(schema) = std::env::var("DATABASE_SCHEMA") {
            config.database.schema = schema;
        }
        config
    }

    /// 默认值 <- 可选 TOML 文件 <- FEE_RESOLVER__* 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FEE_RESOLVER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        if config.database.url.is_none() {
            config.database.url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        }
        config.fees.validate()?;
        Ok(config)
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pre_approved_fees.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "pre_approved_fees contains an empty entry".to_string(),
            ));
        }
        if self.standard_lienholder.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "standard_lienholder must not be empty".to_string(),
            ));
        }
        if self.max_blocks == 0 || self.max_amounts == 0 {
            return Err(ConfigError::Invalid(
                "max_blocks and max_amounts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
