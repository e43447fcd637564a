use crate::db::pool::FeeStore;
use crate::models::{EntityTable, FeeDetailRow, FeeDetailTable};

/// 列出所有用户表 (按名称排序)
pub async fn list_tables(store: &FeeStore, schema: &str) -> Result<Vec<String>, sqlx::Error> {
    match store {
        FeeStore::Postgres(pool) => {
            sqlx::query_scalar::<_, String>(
                r#"
                SELECT table_name::text
                FROM information_schema.tables
                WHERE table_schema = $1
                  AND table_type = 'BASE TABLE'
                ORDER BY table_name
                "#,
            )
            .bind(schema)
            .fetch_all(pool)
            .await
        }
        FeeStore::Sqlite(pool) => {
            sqlx::query_scalar::<_, String>(
                r#"
                SELECT name
                FROM sqlite_master
                WHERE type = 'table'
                  AND name NOT LIKE 'sqlite_%'
                ORDER BY name
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
}

/// 列出某表的列名 (按定义顺序)
pub async fn list_columns(
    store: &FeeStore,
    schema: &str,
    table: &str,
) -> Result<Vec<String>, sqlx::Error> {
    match store {
        FeeStore::Postgres(pool) => {
            sqlx::query_scalar::<_, String>(
                r#"
                SELECT column_name::text
                FROM information_schema.columns
                WHERE table_schema = $1
                  AND table_name = $2
                ORDER BY ordinal_position
                "#,
            )
            .bind(schema)
            .bind(table)
            .fetch_all(pool)
            .await
        }
        FeeStore::Sqlite(pool) => {
            sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(table)
                .fetch_all(pool)
                .await
        }
    }
}

/// 按名称取第一条记录的 ID
pub async fn find_id_by_name(
    store: &FeeStore,
    schema: &str,
    entity: &EntityTable,
    name: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let dialect = store.dialect();
    let sql = format!(
        "SELECT CAST({id} AS BIGINT) FROM {table} WHERE {name_col} = {p1} LIMIT 1",
        id = dialect.quote_ident(&entity.id),
        table = dialect.qualify(schema, &entity.table),
        name_col = dialect.quote_ident(&entity.name),
        p1 = dialect.placeholder(1),
    );
    tracing::debug!("[SQL ID LOOKUP] {} ; param={:?}", sql, name);

    match store {
        FeeStore::Postgres(pool) => {
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(name)
                .fetch_optional(pool)
                .await
        }
        FeeStore::Sqlite(pool) => {
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(name)
                .fetch_optional(pool)
                .await
        }
    }
}

/// 表名与列名引用
pub struct FeeDetailTables<'a> {
    pub fee_detail: &'a FeeDetailTable,
    pub client: &'a EntityTable,
    pub lienholder: &'a EntityTable,
    pub fee_type: &'a EntityTable,
}

/// 按 (client, lienholder, fee type) 三元组查询费用明细, 只取第一行
pub async fn find_fee_detail(
    store: &FeeStore,
    schema: &str,
    tables: &FeeDetailTables<'_>,
    client_id: i64,
    lienholder_id: i64,
    fee_type_id: i64,
) -> Result<Option<FeeDetailRow>, sqlx::Error> {
    let d = store.dialect();
    let fd = tables.fee_detail;
    let sql = format!(
        r#"
        SELECT CAST(fd.{fd_id} AS BIGINT) AS id,
               c.{c_name} AS client_name,
               lh.{lh_name} AS lienholder_name,
               ft.{ft_name} AS fee_type,
               CAST(fd.{amount} AS TEXT) AS amount
        FROM {fd_table} fd
        INNER JOIN {c_table} c ON fd.{c_ref} = c.{c_id}
        INNER JOIN {lh_table} lh ON fd.{lh_ref} = lh.{lh_id}
        INNER JOIN {ft_table} ft ON fd.{ft_ref} = ft.{ft_id}
        WHERE fd.{c_ref} = {p1}
          AND fd.{lh_ref} = {p2}
          AND fd.{ft_ref} = {p3}
        LIMIT 1
        "#,
        fd_id = d.quote_ident(&fd.id),
        c_name = d.quote_ident(&tables.client.name),
        lh_name = d.quote_ident(&tables.lienholder.name),
        ft_name = d.quote_ident(&tables.fee_type.name),
        amount = d.quote_ident(&fd.amount),
        fd_table = d.qualify(schema, &fd.table),
        c_table = d.qualify(schema, &tables.client.table),
        lh_table = d.qualify(schema, &tables.lienholder.table),
        ft_table = d.qualify(schema, &tables.fee_type.table),
        c_ref = d.quote_ident(&fd.client_ref),
        lh_ref = d.quote_ident(&fd.lienholder_ref),
        ft_ref = d.quote_ident(&fd.fee_type_ref),
        c_id = d.quote_ident(&tables.client.id),
        lh_id = d.quote_ident(&tables.lienholder.id),
        ft_id = d.quote_ident(&tables.fee_type.id),
        p1 = d.placeholder(1),
        p2 = d.placeholder(2),
        p3 = d.placeholder(3),
    );
    tracing::debug!(
        "[SQL FEE DETAIL] {} ; params=[{}, {}, {}]",
        sql.trim(),
        client_id,
        lienholder_id,
        fee_type_id
    );

    match store {
        FeeStore::Postgres(pool) => {
            sqlx::query_as::<_, FeeDetailRow>(&sql)
                .bind(client_id)
                .bind(lienholder_id)
                .bind(fee_type_id)
                .fetch_optional(pool)
                .await
        }
        FeeStore::Sqlite(pool) => {
            sqlx::query_as::<_, FeeDetailRow>(&sql)
                .bind(client_id)
                .bind(lienholder_id)
                .bind(fee_type_id)
                .fetch_optional(pool)
                .await
        }
    }
}
