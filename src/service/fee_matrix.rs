use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::config::{DatabaseConfig, DefaultTables, NOT_FOUND_SENTINEL};
use crate::db::pool::{create_store, FeeStore};
use crate::db::queries::{self, FeeDetailTables};
use crate::db::schema;
use crate::error::LookupError;
use crate::models::{FeeDetailRow, FeeMatrixRecord, MissReason, ResolveOutcome, SchemaMap};

/// 费率矩阵解析服务 (每个会话持有一个, SchemaMap 首次查询时构建并缓存)
pub struct FeeMatrixResolver {
    store: FeeStore,
    schema_name: String,
    default_tables: DefaultTables,
    standard_lienholder: String,
    schema: Option<SchemaMap>,
}

impl FeeMatrixResolver {
    pub fn new(store: FeeStore, database: &DatabaseConfig, standard_lienholder: impl Into<String>) -> Self {
        Self {
            store,
            schema_name: database.schema.clone(),
            default_tables: database.default_tables.clone(),
            standard_lienholder: standard_lienholder.into(),
            schema: None,
        }
    }

    /// 连接费率库; 不可达时只记录错误, 调用方继续仅基于文本运行
    pub async fn connect(
        database: &DatabaseConfig,
        database_url: &str,
        standard_lienholder: impl Into<String>,
    ) -> Option<Self> {
        match create_store(database, database_url).await {
            Ok(store) => {
                tracing::info!("Fee matrix store connected ({:?})", store.dialect());
                Some(Self::new(store, database, standard_lienholder))
            }
            Err(e) => {
                tracing::error!("Fee matrix store unreachable, continuing without repo fee: {}", e);
                None
            }
        }
    }

    /// 已缓存的 schema 映射
    pub fn cached_schema(&self) -> Option<&SchemaMap> {
        self.schema.as_ref()
    }

    /// 查询权威费用. 任何失败都降级为 None, 不向调用方抛出.
    pub async fn resolve(
        &mut self,
        client_name: &str,
        lienholder_name: &str,
        fee_type_name: &str,
    ) -> Option<FeeMatrixRecord> {
        match self.try_resolve(client_name, lienholder_name, fee_type_name).await {
            Ok(ResolveOutcome::Found(record)) => Some(record),
            Ok(ResolveOutcome::Miss(reason)) => {
                tracing::warn!(
                    "No matching repo fee found for {}/{}/{}: {:?}",
                    client_name,
                    lienholder_name,
                    fee_type_name,
                    reason
                );
                None
            }
            Err(LookupError::Connectivity(e)) => {
                tracing::error!("Fee matrix lookup aborted, store unreachable: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Fee matrix lookup skipped: {}", e);
                None
            }
        }
    }

    /// 带详细结果的查询
    pub async fn try_resolve(
        &mut self,
        client_name: &str,
        lienholder_name: &str,
        fee_type_name: &str,
    ) -> Result<ResolveOutcome, LookupError> {
        validate_input("client", client_name)?;
        validate_input("lienholder", lienholder_name)?;
        validate_input("fee type", fee_type_name)?;

        tracing::info!(
            "Looking up repo fee for: Client=\"{}\", Lienholder=\"{}\", FeeType=\"{}\"",
            client_name,
            lienholder_name,
            fee_type_name
        );

        // 1. schema 发现 (会话内只做一次)
        if self.schema.is_none() {
            let map = schema::discover_schema(&self.store, &self.schema_name, &self.default_tables).await?;
            self.schema = Some(map);
        }
        let Some(map) = self.schema.as_ref() else {
            return Err(LookupError::SchemaDiscovery("schema map unavailable".to_string()));
        };
        let store = &self.store;
        let schema_name = self.schema_name.as_str();

        // 2. 名称 -> ID
        let Some(client_id) = queries::find_id_by_name(store, schema_name, &map.client, client_name).await? else {
            tracing::warn!("Client '{}' not found in database", client_name);
            return Ok(ResolveOutcome::Miss(MissReason::ClientNotFound(client_name.to_string())));
        };

        let lienholder_id = queries::find_id_by_name(store, schema_name, &map.lienholder, lienholder_name).await?;
        if lienholder_id.is_none() {
            tracing::warn!("Lienholder '{}' not found in database", lienholder_name);
        }

        let Some(fee_type_id) = queries::find_id_by_name(store, schema_name, &map.fee_type, fee_type_name).await? else {
            tracing::warn!("Fee type '{}' not found in database", fee_type_name);
            return Ok(ResolveOutcome::Miss(MissReason::FeeTypeNotFound(fee_type_name.to_string())));
        };

        let tables = FeeDetailTables {
            fee_detail: &map.fee_detail,
            client: &map.client,
            lienholder: &map.lienholder,
            fee_type: &map.fee_type,
        };

        // 3. 精确三元组查询
        if let Some(lienholder_id) = lienholder_id {
            if let Some(row) =
                queries::find_fee_detail(store, schema_name, &tables, client_id, lienholder_id, fee_type_id).await?
            {
                tracing::info!("Found matching fee record for specific lienholder '{}'", lienholder_name);
                return Ok(ResolveOutcome::Found(record_from_row(row)?));
            }
        }

        // 4. Standard 留置权人回退
        tracing::info!(
            "No specific record found. Looking up '{}' lienholder as fallback...",
            self.standard_lienholder
        );
        let Some(standard_id) =
            queries::find_id_by_name(store, schema_name, &map.lienholder, &self.standard_lienholder).await?
        else {
            tracing::warn!("'{}' lienholder not found in database", self.standard_lienholder);
            return Ok(ResolveOutcome::Miss(MissReason::StandardLienholderNotFound(
                self.standard_lienholder.clone(),
            )));
        };

        match queries::find_fee_detail(store, schema_name, &tables, client_id, standard_id, fee_type_id).await? {
            Some(row) => {
                let record = record_from_row(row)?.into_fallback(lienholder_name);
                tracing::info!(
                    "Found fallback fee using '{}' lienholder: ${}",
                    self.standard_lienholder,
                    record.amount
                );
                Ok(ResolveOutcome::Found(record))
            }
            None => {
                tracing::warn!("No fee record found with either specific lienholder or fallback");
                Ok(ResolveOutcome::Miss(MissReason::NoFeeDetail))
            }
        }
    }
}

/// 空值与 "Not found" 占位符在查询前拒绝
pub fn validate_input(field: &str, value: &str) -> Result<(), LookupError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == NOT_FOUND_SENTINEL {
        return Err(LookupError::InvalidInput(format!(
            "{} name is missing ('{}')",
            field, value
        )));
    }
    Ok(())
}

fn record_from_row(row: FeeDetailRow) -> Result<FeeMatrixRecord, LookupError> {
    let amount = BigDecimal::from_str(row.amount.trim())
        .map_err(|_| LookupError::InvalidAmount(row.amount.clone()))?;
    Ok(FeeMatrixRecord::from_row(row, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_blank_inputs_are_rejected() {
        assert!(matches!(validate_input("client", ""), Err(LookupError::InvalidInput(_))));
        assert!(matches!(validate_input("client", "   "), Err(LookupError::InvalidInput(_))));
        assert!(matches!(
            validate_input("lienholder", "Not found"),
            Err(LookupError::InvalidInput(_))
        ));
        assert!(validate_input("client", "Acme").is_ok());
    }

    #[test]
    fn decimal_amount_text_is_parsed_exactly() {
        let row = FeeDetailRow {
            id: 7,
            client_name: "Acme".into(),
            lienholder_name: "Standard".into(),
            fee_type: "Involuntary Repo".into(),
            amount: "312.75".into(),
        };
        let record = record_from_row(row).unwrap();
        assert_eq!(record.amount, BigDecimal::from_str("312.75").unwrap());
        assert!(!record.is_fallback);

        let fallback = record.into_fallback("Acme Bank");
        assert!(fallback.is_fallback);
        assert_eq!(fallback.lienholder_name, "Standard (Standard Fallback)");
        assert!(fallback.message.unwrap().contains("Acme Bank"));
    }

    #[tokio::test]
    async fn unreachable_store_yields_no_resolver() {
        let database = DatabaseConfig {
            acquire_timeout_secs: 1,
            ..DatabaseConfig::default()
        };
        let resolver =
            FeeMatrixResolver::connect(&database, "sqlite:/nonexistent-dir/fees.db", "Standard").await;
        assert!(resolver.is_none());

        let resolver = FeeMatrixResolver::connect(&database, "sqlite::memory:", "Standard").await;
        assert!(resolver.is_some());
    }

    #[test]
    fn garbage_amount_is_an_error() {
        let row = FeeDetailRow {
            id: 1,
            client_name: "Acme".into(),
            lienholder_name: "x".into(),
            fee_type: "y".into(),
            amount: "n/a".into(),
        };
        assert!(matches!(record_from_row(row), Err(LookupError::InvalidAmount(_))));
    }
}
