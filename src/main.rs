use clap::Parser;
use excel_ollama::utils::error::ErrorSeverity;
use excel_ollama::utils::{logger, validation::Validate};
use excel_ollama::{AnalysisEngine, CliConfig, DirectoryWorkbook, LocalStorage, RangeAnalysisPipeline};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting excel-ollama");

    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    if cli.verbose {
        tracing::debug!("Resolved settings: {:?}", settings);
    }

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = settings.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 以輸入檔所在目錄作為 workbook
    let (workbook_dir, active_sheet) = settings.workbook_location();
    tracing::info!("📁 Workbook: {} (active sheet: {})", workbook_dir, active_sheet);
    let workbook = DirectoryWorkbook::new(LocalStorage::new(workbook_dir.clone()), active_sheet);

    let pipeline = match RangeAnalysisPipeline::new(workbook, settings) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprintln!("⚠️ {}", warning);
            }
            let sheet_path = std::path::Path::new(&workbook_dir).join(format!("{}.csv", outcome.sheet_name));
            println!("✅ Analysis written to sheet '{}'", outcome.sheet_name);
            println!("📁 {}", sheet_path.display());
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
