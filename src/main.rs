use anyhow::Context;
use clap::Parser;
use weather_etl::config::Command;
use weather_etl::core::handoff;
use weather_etl::domain::ports::Pipeline;
use weather_etl::utils::{logger, validation::Validate};
use weather_etl::{
    CliConfig, EtlEngine, EtlError, LocalStorage, MemoryWarehouse, PostgresWarehouse, TomlConfig,
    WeatherPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting weather-etl");
    tracing::debug!("CLI config: {:?}", cli);

    let config = TomlConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config file '{}'", cli.config))?;

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }

    tracing::info!(
        "✅ Configuration '{}' loaded: {} source(s) -> {}",
        config.pipeline.name,
        config.extract.cities.len(),
        config.table_ref()
    );

    if let Err(e) = execute(&cli.command, &config).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn execute(command: &Command, config: &TomlConfig) -> weather_etl::Result<()> {
    let storage = LocalStorage::new(".".to_string());

    match command {
        Command::Run { dry_run: true } => {
            tracing::info!("🔍 DRY RUN MODE - rows are loaded into memory only");
            let warehouse = MemoryWarehouse::new().with_table(&config.table_ref());
            let pipeline = WeatherPipeline::new(
                config.weather_client()?,
                warehouse.clone(),
                config.pipeline_settings(),
            );

            let summary = EtlEngine::new(pipeline).run().await?;
            handoff::write_rows_csv(&warehouse.rows(&config.table_ref()), std::io::stdout())?;
            tracing::info!("✅ Dry run produced {} row(s)", summary.rows_written);
        }
        Command::Run { dry_run: false } => {
            let engine = EtlEngine::new(postgres_pipeline(config)?);
            let summary = engine.run().await?;
            tracing::info!("✅ ETL process completed successfully!");
            println!(
                "✅ Loaded {} row(s) into {} ({} source record(s) extracted)",
                summary.rows_written, summary.table, summary.records_extracted
            );
        }
        Command::Extract { output } => {
            let records = postgres_pipeline(config)?.extract().await?;
            handoff::write_raw(&storage, output, &records).await?;
        }
        Command::Transform { input, output } => {
            let records = handoff::read_raw(&storage, input).await?;
            let batch = postgres_pipeline(config)?.transform(records).await?;
            handoff::write_batch(&storage, output, &batch).await?;
        }
        Command::Load { input } => {
            let batch = handoff::read_batch(&storage, input).await?;
            let report = postgres_pipeline(config)?.load(batch).await?;
            println!("✅ Loaded {} row(s) into {}", report.rows_written, report.table);
        }
    }

    Ok(())
}

fn postgres_pipeline(
    config: &TomlConfig,
) -> Result<WeatherPipeline<weather_etl::OpenWeatherClient, PostgresWarehouse>, EtlError> {
    Ok(WeatherPipeline::new(
        config.weather_client()?,
        PostgresWarehouse::new(config.postgres_settings()),
        config.pipeline_settings(),
    ))
}
