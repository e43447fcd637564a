use clap::Parser;
use fee_resolver::models::{CaseInfo, RawTextBlock};
use fee_resolver::{export, AppConfig, FeeMatrixResolver, FeeSession};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// 将案件文本块解析为去重后的费用表
#[derive(Debug, Parser)]
#[command(name = "fee-resolver", version, about)]
struct Cli {
    /// 文本块 JSON 文件, "-" 表示标准输入
    #[arg(long, default_value = "-")]
    blocks: String,

    #[arg(long)]
    client: Option<String>,

    #[arg(long)]
    lienholder: Option<String>,

    /// 默认取配置中的 default_fee_type
    #[arg(long)]
    fee_type: Option<String>,

    /// TOML 配置文件
    #[arg(long, env = "FEE_RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// 同时导出 All-Fees 表到 CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn read_blocks(source: &str) -> Result<Vec<RawTextBlock>, Box<dyn std::error::Error>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式, 输出到 stderr 以免混入 JSON 结果
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 加载配置
    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Loaded config: schema={}, whitelist={} entries", config.database.schema, config.fees.pre_approved_fees.len());

    let blocks = read_blocks(&cli.blocks)?;
    info!("Read {} text blocks", blocks.len());

    // 有数据库且给出客户名时才做费率矩阵查询; 库不可达时仅基于文本运行
    let resolver = match (&config.database.url, &cli.client) {
        (Some(url), Some(_)) => {
            FeeMatrixResolver::connect(&config.database, url, config.fees.standard_lienholder.clone()).await
        }
        _ => None,
    };

    let case = CaseInfo::new(
        cli.client.unwrap_or_default(),
        cli.lienholder.unwrap_or_default(),
        cli.fee_type.unwrap_or_else(|| config.fees.default_fee_type.clone()),
    );

    let mut session = FeeSession::new(&config.fees, resolver)?;
    let tables = session.process_case(&case, &blocks).await;

    println!("{}", serde_json::to_string_pretty(&tables)?);

    if let Some(path) = cli.csv {
        export::write_tables_csv(&tables, &path).map_err(|e| e as Box<dyn std::error::Error>)?;
    }

    Ok(())
}
