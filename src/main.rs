use clap::Parser;
use outpatient_etl::utils::error::{ErrorSeverity, EtlError};
use outpatient_etl::utils::{logger, validation::Validate};
use outpatient_etl::{
    CliConfig, ElasticsearchClient, EnrichmentPipeline, EtlEngine, GoogleGeocoder, IndexTarget,
    Settings,
};

/// 記錄錯誤並依嚴重程度結束程序
fn exit_with(e: &EtlError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn load_settings(config: &CliConfig) -> Result<Settings, EtlError> {
    let mut settings = match &config.config {
        Some(path) => {
            tracing::info!("📁 Loading settings from: {}", path);
            Settings::from_file(path)?
        }
        None => Settings::default(),
    };
    if let Some(key) = &config.geocoder_api_key {
        settings.geocoder.api_key = Some(key.clone());
    }
    settings.validate()?;
    Ok(settings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting outpatient-etl");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置，失敗時不做任何處理
    if let Err(e) = config.validate() {
        exit_with(&e);
    }
    let settings = load_settings(&config).unwrap_or_else(|e| exit_with(&e));

    let geocoder = GoogleGeocoder::new(&settings.geocoder).unwrap_or_else(|e| exit_with(&e));
    let search =
        match ElasticsearchClient::connect(&config.search_hostname, &config.search_port, &settings.search)
            .await
        {
            Ok(search) => search,
            Err(e) => {
                tracing::error!("Could not connect to the search service: {}", e);
                exit_with(&e)
            }
        };

    let target = IndexTarget {
        index_name: settings.search.index_name.clone(),
        document_type: settings.search.document_type.clone(),
    };
    let engine = EtlEngine::new(EnrichmentPipeline::new(geocoder, search, target));

    match engine.run(&config).await {
        Ok(summary) => {
            tracing::info!(
                "✅ Indexed {} of {} records",
                summary.indexed,
                summary.attempted
            );
        }
        Err(e) => exit_with(&e),
    }
}
