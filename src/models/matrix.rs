use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::block::{CandidateAmount, CaseInfo, Provenance, RawTextBlock};
use super::fee::format_dollars;

/// 费率矩阵中解析出的权威费用 (每个案件最多解析一次)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeMatrixRecord {
    pub id: i64,
    pub client_name: String,
    pub lienholder_name: String,
    pub fee_type: String,
    pub amount: BigDecimal,
    pub is_fallback: bool,
    pub message: Option<String>,
}

impl FeeMatrixRecord {
    pub(crate) fn from_row(row: FeeDetailRow, amount: BigDecimal) -> Self {
        Self {
            id: row.id,
            client_name: row.client_name,
            lienholder_name: row.lienholder_name,
            fee_type: row.fee_type,
            amount,
            is_fallback: false,
            message: None,
        }
    }

    /// 标记为 Standard 回退结果
    pub(crate) fn into_fallback(mut self, requested_lienholder: &str) -> Self {
        self.lienholder_name = format!("{} (Standard Fallback)", self.lienholder_name);
        self.is_fallback = true;
        self.message = Some(format!(
            "Lienholder '{}' specific fee not found. Using Standard amount.",
            requested_lienholder
        ));
        self
    }

    /// 构造注入去重前的数据库来源文本块与候选金额; 非正金额不注入
    pub fn to_candidate(&self, case: &CaseInfo, date: &str) -> Option<(RawTextBlock, CandidateAmount)> {
        let block = RawTextBlock::new(
            format!("Repo Fee from database: {}", format_dollars(&self.amount)),
            Provenance::Database,
        )
        .with_date(date)
        .with_user("System")
        .with_type("Database Lookup")
        .with_label(case.fee_type.clone());

        let candidate = CandidateAmount::new(
            self.amount.clone(),
            format!(
                "Database lookup for {} - {} / {}",
                case.fee_type, case.client_name, case.lienholder_name
            ),
            true,
            None,
        )?;
        Some((block, candidate))
    }
}

/// 费用明细查询的原始行, 金额以文本读出再精确解析
#[derive(Debug, Clone, FromRow)]
pub struct FeeDetailRow {
    pub id: i64,
    pub client_name: String,
    pub lienholder_name: String,
    pub fee_type: String,
    pub amount: String,
}

/// 表角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    FeeDetail,
    Client,
    Lienholder,
    FeeType,
}

impl TableRole {
    pub const ALL: [TableRole; 4] = [
        TableRole::FeeDetail,
        TableRole::Client,
        TableRole::Lienholder,
        TableRole::FeeType,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TableRole::FeeDetail => "Fee Details",
            TableRole::Client => "Client",
            TableRole::Lienholder => "Lienholder",
            TableRole::FeeType => "Fee Type",
        }
    }
}

/// 名称表 (客户 / 留置权人 / 费用类型) 的列映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTable {
    pub table: String,
    pub id: String,
    pub name: String,
}

/// 费用明细表的列映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeDetailTable {
    pub table: String,
    pub id: String,
    pub client_ref: String,
    pub lienholder_ref: String,
    pub fee_type_ref: String,
    pub amount: String,
}

/// 会话内一次构建的 schema 映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMap {
    pub fee_detail: FeeDetailTable,
    pub client: EntityTable,
    pub lienholder: EntityTable,
    pub fee_type: EntityTable,
    /// 走了默认命名的角色, 例如 "table:Client" 或 "FeeDetails.amount"
    pub degraded: Vec<String>,
}

impl SchemaMap {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// 查询未命中的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    ClientNotFound(String),
    FeeTypeNotFound(String),
    StandardLienholderNotFound(String),
    NoFeeDetail,
}

/// 费率矩阵查询结果: 命中或未命中, 未命中不是错误
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Found(FeeMatrixRecord),
    Miss(MissReason),
}

impl ResolveOutcome {
    pub fn into_record(self) -> Option<FeeMatrixRecord> {
        match self {
            ResolveOutcome::Found(record) => Some(record),
            ResolveOutcome::Miss(_) => None,
        }
    }
}
