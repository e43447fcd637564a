use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, PgPool, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;

/// 后端方言: 决定目录查询, 占位符语法与表名限定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// 第 n 个参数占位符 (从 1 开始)
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// 目录中发现的标识符一律加双引号
    pub fn quote_ident(self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// 限定表名: Postgres 带 schema, SQLite 不带
    pub fn qualify(self, schema: &str, table: &str) -> String {
        match self {
            Dialect::Postgres => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            Dialect::Sqlite => self.quote_ident(table),
        }
    }
}

/// 费率库连接句柄
#[derive(Debug, Clone)]
pub enum FeeStore {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl FeeStore {
    pub fn dialect(&self) -> Dialect {
        match self {
            FeeStore::Postgres(_) => Dialect::Postgres,
            FeeStore::Sqlite(_) => Dialect::Sqlite,
        }
    }
}

/// 按 URL scheme 创建连接池
pub async fn create_store(config: &DatabaseConfig, database_url: &str) -> Result<FeeStore, sqlx::Error> {
    let slow = Duration::from_secs(config.slow_statement_secs);
    let acquire = Duration::from_secs(config.acquire_timeout_secs);

    if database_url.starts_with("sqlite:") {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .log_slow_statements(tracing::log::LevelFilter::Warn, slow);
        // 内存库每个连接各自独立, 只能用单连接
        let max = if database_url.contains(":memory:") { 1 } else { config.max_connections };
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .acquire_timeout(acquire)
            .connect_with(connect_options)
            .await?;
        return Ok(FeeStore::Sqlite(pool));
    }

    let connect_options = PgConnectOptions::from_str(database_url)?
        .log_slow_statements(tracing::log::LevelFilter::Warn, slow);
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(acquire)
        .connect_with(connect_options)
        .await?;
    Ok(FeeStore::Postgres(pool))
}
