use std::path::Path;

use crate::models::{FeeRecord, FeeTables};

const HEADER: [&str; 11] = [
    "date",
    "amount",
    "type",
    "approver",
    "referenceSentence",
    "approved",
    "category",
    "originalCategory",
    "source",
    "matched",
    "matchedAs",
];

fn record_row(record: &FeeRecord) -> Result<Vec<String>, serde_json::Error> {
    // 枚举字段沿用 JSON 中的展示名
    let approved = serde_json::to_value(record.approved)?;
    let matched_as = serde_json::to_value(record.matched_as)?;
    Ok(vec![
        record.date.clone(),
        record.display_amount(),
        record.update_type.clone(),
        record.approver.clone(),
        record.reference_sentence.clone(),
        approved.as_str().unwrap_or_default().to_string(),
        record.category.clone(),
        record.original_category.clone(),
        record.provenance.display_name().to_string(),
        record.matched.to_string(),
        matched_as.as_str().unwrap_or_default().to_string(),
    ])
}

/// 导出 All-Fees 表到 CSV 文件
pub fn write_tables_csv(
    tables: &FeeTables,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use csv::Writer;
    use std::fs::File;

    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(HEADER)?;
    for record in &tables.all_fees_table {
        writer.write_record(record_row(record)?)?;
    }

    writer.flush()?;
    tracing::info!(
        "Exported {} fee records to {}",
        tables.all_fees_table.len(),
        output_path.display()
    );
    Ok(())
}
