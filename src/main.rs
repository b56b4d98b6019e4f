use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use lecture_analyzer::api::ApiServer;
use lecture_analyzer::config::Config;
use lecture_analyzer::processing::LectureProcessor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecture_analyzer=info,warn".into()),
        )
        .init();

    let matches = Command::new("Lecture Analyzer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lecture video transcription, slide extraction, summaries and quizzes")
        .arg(
            Arg::new("video-dir")
                .short('d')
                .long("video-dir")
                .value_name("DIR")
                .help("Directory containing lecture videos to process"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for results")
                .default_value("./output"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of parallel workers"),
        )
        .arg(
            Arg::new("serve")
                .long("serve")
                .help("Run the HTTP API server instead of batch processing")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("API server port (with --serve)"),
        )
        .get_matches();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(workers) = matches.get_one::<String>("workers") {
        config.performance.max_workers = workers.parse()?;
    }
    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }
    config.validate()?;

    if matches.get_flag("serve") {
        let port = config.server.port;
        info!("🚀 Lecture Analyzer API starting...");
        info!("{}", config.summary());

        let server = ApiServer::new(Arc::new(config), port);
        return server.start().await;
    }

    let Some(video_dir) = matches.get_one::<String>("video-dir").map(PathBuf::from) else {
        error!("Either --serve or --video-dir is required");
        return Err(anyhow::anyhow!("No mode selected: pass --serve or --video-dir"));
    };
    let output_dir = PathBuf::from(
        matches
            .get_one::<String>("output-dir")
            .map(String::as_str)
            .unwrap_or("./output"),
    );

    info!("🚀 Lecture Analyzer starting...");
    info!("📁 Input directory: {}", video_dir.display());
    info!("📂 Output directory: {}", output_dir.display());
    info!("🔧 Workers: {}", config.performance.max_workers);

    if !video_dir.exists() {
        error!("Input directory does not exist: {}", video_dir.display());
        return Err(anyhow::anyhow!("Input directory not found"));
    }

    tokio::fs::create_dir_all(&output_dir).await?;

    let workers = config.performance.max_workers;
    let processor = Arc::new(LectureProcessor::new(config, workers)?);

    let start_time = std::time::Instant::now();
    let results = processor.process_directory(video_dir, output_dir).await?;
    let duration = start_time.elapsed();

    info!("🎉 Processing completed in {:.2}s", duration.as_secs_f64());
    info!("✅ Successful: {}", results.successful);
    info!("❌ Failed: {}", results.failed);
    info!(
        "📊 Success rate: {:.1}%",
        if results.total > 0 {
            results.successful as f64 / results.total as f64 * 100.0
        } else {
            0.0
        }
    );

    Ok(())
}
