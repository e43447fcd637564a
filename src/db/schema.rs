use std::collections::{HashMap, HashSet};

use crate::config::DefaultTables;
use crate::db::pool::FeeStore;
use crate::db::queries;
use crate::error::LookupError;
use crate::models::{EntityTable, FeeDetailTable, SchemaMap, TableRole};

/// 表名关键字 (小写), 顺序即判定优先级
fn table_keywords(role: TableRole) -> &'static [&'static str] {
    match role {
        TableRole::FeeDetail => &["feedetails", "fee_details", "feedetail", "fee_detail"],
        TableRole::Client => &["client"],
        TableRole::Lienholder => &["lienholder", "lien_holder"],
        TableRole::FeeType => &["feetype", "fee_type"],
    }
}

/// 按表名判定角色, FeeDetail 先于其他角色判定
pub fn classify_table(table: &str) -> Option<TableRole> {
    let lower = table.to_lowercase();
    TableRole::ALL
        .into_iter()
        .find(|role| table_keywords(*role).iter().any(|kw| lower.contains(kw)))
}

/// 列角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Id(TableRole),
    Name(TableRole),
    ClientRef,
    LienholderRef,
    FeeTypeRef,
    Amount,
}

impl ColumnRole {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Id(TableRole::Client) => &["id", "client_id", "clientid"],
            ColumnRole::Id(TableRole::Lienholder) => &["id", "lienholder_id", "lienholderid", "lh_id"],
            ColumnRole::Id(TableRole::FeeType) => &["id", "feetype_id", "feetypeid", "ft_id"],
            ColumnRole::Id(TableRole::FeeDetail) => &["id", "fd_id", "feedetailsid", "feedetails_id"],
            ColumnRole::Name(TableRole::Client) => &["client_name", "clientname", "name"],
            ColumnRole::Name(TableRole::Lienholder) => &["lienholder_name", "lienholdername", "name"],
            ColumnRole::Name(_) => &["fee_type_name", "feetypename", "name"],
            ColumnRole::ClientRef => &["client_id", "clientid"],
            ColumnRole::LienholderRef => &["lienholder_id", "lienholderid", "lh_id"],
            ColumnRole::FeeTypeRef => &["feetype_id", "feetypeid", "fee_type_id", "ft_id"],
            ColumnRole::Amount => &["amount", "fee_amount", "feeamount"],
        }
    }

    fn default_column(self) -> &'static str {
        match self {
            ColumnRole::Id(_) => "ID",
            ColumnRole::Name(TableRole::Client) => "ClientName",
            ColumnRole::Name(TableRole::Lienholder) => "LienholderName",
            ColumnRole::Name(_) => "FeeTypeName",
            ColumnRole::ClientRef => "ClientID",
            ColumnRole::LienholderRef => "LienholderID",
            ColumnRole::FeeTypeRef => "FeeTypeID",
            ColumnRole::Amount => "Amount",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ColumnRole::Id(_) => "id",
            ColumnRole::Name(_) => "name",
            ColumnRole::ClientRef => "client_ref",
            ColumnRole::LienholderRef => "lienholder_ref",
            ColumnRole::FeeTypeRef => "fee_type_ref",
            ColumnRole::Amount => "amount",
        }
    }
}

fn squash(s: &str) -> String {
    s.to_lowercase().replace('_', "")
}

/// 列与关键字的匹配等级: 3 完全相同, 2 关键字包含于列名, 1 列名包含于关键字
fn match_tier(column: &str, keyword: &str) -> u8 {
    let col = column.to_lowercase();
    let kw = keyword.to_lowercase();
    if squash(&col) == squash(&kw) {
        3
    } else if col.contains(&kw) || squash(&col).contains(&squash(&kw)) {
        2
    } else if kw.contains(&col) {
        1
    } else {
        0
    }
}

/// 在未被占用的列中挑选最佳匹配; 同级按列顺序
fn pick_column(columns: &[String], claimed: &HashSet<String>, role: ColumnRole) -> Option<String> {
    let mut best: Option<(u8, &String)> = None;
    for col in columns {
        if claimed.contains(col) {
            continue;
        }
        let tier = role
            .keywords()
            .iter()
            .map(|kw| match_tier(col, kw))
            .max()
            .unwrap_or(0);
        if tier == 0 {
            continue;
        }
        if best.map_or(true, |(t, _)| tier > t) {
            best = Some((tier, col));
        }
    }
    best.map(|(_, col)| col.clone())
}

/// 按顺序解析一张表的列角色, 未解析的角色退回默认列名并记录
fn resolve_columns(
    table: &str,
    columns: &[String],
    roles: &[ColumnRole],
    degraded: &mut Vec<String>,
) -> Vec<String> {
    let mut claimed = HashSet::new();
    roles
        .iter()
        .map(|role| match pick_column(columns, &claimed, *role) {
            Some(col) => {
                claimed.insert(col.clone());
                col
            }
            None => {
                let fallback = role.default_column().to_string();
                tracing::warn!(
                    "Could not identify {} column in table {}, using default '{}'",
                    role.label(),
                    table,
                    fallback
                );
                degraded.push(format!("{}.{}", table, role.label()));
                fallback
            }
        })
        .collect()
}

fn entity_table(
    role: TableRole,
    table: String,
    columns: &[String],
    degraded: &mut Vec<String>,
) -> EntityTable {
    let cols = resolve_columns(
        &table,
        columns,
        &[ColumnRole::Id(role), ColumnRole::Name(role)],
        degraded,
    );
    let mut cols = cols.into_iter();
    EntityTable {
        id: cols.next().unwrap_or_else(|| "ID".to_string()),
        name: cols.next().unwrap_or_else(|| "Name".to_string()),
        table,
    }
}

fn fee_detail_table(table: String, columns: &[String], degraded: &mut Vec<String>) -> FeeDetailTable {
    // 外键与金额先于本表 id 解析, 避免 ClientID 被当成主键
    let cols = resolve_columns(
        &table,
        columns,
        &[
            ColumnRole::ClientRef,
            ColumnRole::LienholderRef,
            ColumnRole::FeeTypeRef,
            ColumnRole::Amount,
            ColumnRole::Id(TableRole::FeeDetail),
        ],
        degraded,
    );
    let mut cols = cols.into_iter();
    let mut next = |default: &str| cols.next().unwrap_or_else(|| default.to_string());
    let client_ref = next("ClientID");
    let lienholder_ref = next("LienholderID");
    let fee_type_ref = next("FeeTypeID");
    let amount = next("Amount");
    let id = next("ID");
    FeeDetailTable {
        table,
        id,
        client_ref,
        lienholder_ref,
        fee_type_ref,
        amount,
    }
}

/// 由 (表名 -> 列名) 构建 SchemaMap, 与数据库无关便于单测
pub fn build_schema_map(
    tables: &[(String, Vec<String>)],
    defaults: &DefaultTables,
) -> SchemaMap {
    let mut assigned: HashMap<TableRole, usize> = HashMap::new();
    for (idx, (table, _)) in tables.iter().enumerate() {
        if let Some(role) = classify_table(table) {
            if assigned.contains_key(&role) {
                tracing::debug!("Table {} also looks like {}, keeping first match", table, role.label());
                continue;
            }
            tracing::info!("Using {} as the {} table", table, role.label());
            assigned.insert(role, idx);
        }
    }

    let mut degraded = Vec::new();
    let mut table_for = |role: TableRole, default: &str| -> (String, Vec<String>) {
        match assigned.get(&role) {
            Some(&idx) => tables[idx].clone(),
            None => {
                tracing::warn!(
                    "Could not find {} table, using fallback name '{}'",
                    role.label(),
                    default
                );
                degraded.push(format!("table:{}", role.label()));
                let columns = tables
                    .iter()
                    .find(|(t, _)| t.eq_ignore_ascii_case(default))
                    .map(|(_, c)| c.clone())
                    .unwrap_or_default();
                (default.to_string(), columns)
            }
        }
    };

    let fee_detail = table_for(TableRole::FeeDetail, &defaults.fee_detail);
    let client = table_for(TableRole::Client, &defaults.client);
    let lienholder = table_for(TableRole::Lienholder, &defaults.lienholder);
    let fee_type = table_for(TableRole::FeeType, &defaults.fee_type);

    let fee_detail = fee_detail_table(fee_detail.0, &fee_detail.1, &mut degraded);
    let client = entity_table(TableRole::Client, client.0, &client.1, &mut degraded);
    let lienholder = entity_table(TableRole::Lienholder, lienholder.0, &lienholder.1, &mut degraded);
    let fee_type = entity_table(TableRole::FeeType, fee_type.0, &fee_type.1, &mut degraded);

    SchemaMap {
        fee_detail,
        client,
        lienholder,
        fee_type,
        degraded,
    }
}

/// 枚举所有表及其列, 构建 SchemaMap
pub async fn discover_schema(
    store: &FeeStore,
    schema: &str,
    defaults: &DefaultTables,
) -> Result<SchemaMap, LookupError> {
    let table_names = queries::list_tables(store, schema).await?;
    if table_names.is_empty() {
        return Err(LookupError::SchemaDiscovery(format!(
            "no tables found in schema '{}'",
            schema
        )));
    }
    tracing::info!("Found {} tables in the database", table_names.len());

    let mut tables = Vec::with_capacity(table_names.len());
    for table in table_names {
        let columns = queries::list_columns(store, schema, &table).await?;
        tracing::debug!("Table {} has columns: {}", table, columns.join(", "));
        tables.push((table, columns));
    }

    let map = build_schema_map(&tables, defaults);
    if map.is_degraded() {
        tracing::warn!("Schema resolved on degraded path: {}", map.degraded.join(", "));
    }
    Ok(map)
}
