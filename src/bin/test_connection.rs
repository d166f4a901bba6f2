use clap::Parser;
use excel_ollama::adapters::ollama::{DEFAULT_MODEL, DEFAULT_SERVER_URL};
use excel_ollama::utils::{logger, validation};
use excel_ollama::{OllamaClient, Result};
use std::time::Duration;

const GENERATION_PROMPT: &str = "Hello, this is a test. Please respond with 'Test successful!'";

#[derive(Parser)]
#[command(name = "test-connection")]
#[command(about = "Check that an Ollama server is reachable and can generate text")]
struct Args {
    /// Ollama server URL, e.g. http://your-ec2-ip:11434
    #[arg(default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Model used for the generation test
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Timeout in seconds for the generation test
    #[arg(short, long, default_value = "30")]
    timeout: u64,

    /// Only check connectivity and list models
    #[arg(long)]
    skip_generate: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    println!("Testing connection to: {}", args.server);
    println!("{}", "-".repeat(50));

    if let Err(e) = validation::validate_url("server", &args.server) {
        println!("❌ {}", e);
        std::process::exit(1);
    }

    let client = OllamaClient::new(&args.server, &args.model, Duration::from_secs(args.timeout))?;

    // 1. 基本連線與模型列表
    println!("1. Testing basic connectivity...");
    let models = match client.list_models().await {
        Ok(models) => models,
        Err(e) => {
            println!("❌ {}", e.user_friendly_message());
            println!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    println!("✅ Connection successful!");
    println!("✅ Found {} models:", models.len());
    for model in &models {
        println!("   - {} ({:.1} MB)", model.name, model.size_mb());
    }

    // 2. 伺服器版本 (舊版伺服器可能沒有)
    println!("\n2. Getting server information...");
    match client.version().await {
        Ok(version) => println!("✅ Server version: {}", version),
        Err(_) => println!("ℹ️  Version info not available"),
    }

    if args.skip_generate {
        println!("\n🎉 Connectivity check passed");
        return Ok(());
    }

    // 3. 生成測試
    println!("\n3. Testing model generation with {}...", args.model);
    let installed = models
        .iter()
        .any(|m| m.name == args.model || m.name.split(':').next() == Some(args.model.as_str()));
    if !installed {
        println!("⚠️  Model '{}' is not in the list above", args.model);
    }

    match client.generate(GENERATION_PROMPT).await {
        Ok(text) if !text.trim().is_empty() => {
            let preview: String = text.trim().chars().take(100).collect();
            println!("✅ Model generation successful!");
            println!("   Response: {}...", preview);
        }
        Ok(_) => {
            println!("❌ Empty response from model");
            std::process::exit(1);
        }
        Err(e) if e.is_timeout() => {
            println!("❌ Generation timeout - model may be loading");
            std::process::exit(2);
        }
        Err(e) => {
            println!("❌ Generation error: {}", e.user_friendly_message());
            println!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    println!("\n🎉 All checks passed");
    Ok(())
}
