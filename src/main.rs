use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use receipt_scan::batch::{BatchScanController, UploadEntry};
use receipt_scan::compressor::ImageCompressor;
use receipt_scan::extractor::{GeminiClient, ModelClient};
use receipt_scan::{cli, config, logging, presenter, scanner, server, GeminiModel, ScanOutcome};
use cli::{Cli, Commands};
use config::Config;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // サーバーは設定のレベル、CLIは結果表示を邪魔しないよう warn
    let base_level = match cli.command {
        Commands::Serve { .. } => config.log_level.as_str(),
        _ => "warn",
    };
    logging::init(logging::effective_level(base_level, cli.verbose));

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                bind_address: bind.unwrap_or_else(|| config.bind_address.clone()),
                ..config
            };

            let client: Arc<dyn ModelClient> = Arc::new(GeminiClient::from_config(&config)?);
            server::start_server(&config, client).await?;
        }

        Commands::Scan { paths, model, json, recursive, preview } => {
            let model = model.unwrap_or_else(|| config.model.clone());

            let images = scanner::scan_paths(&paths, recursive)?;
            if !json {
                println!("🧾 receipt-scan - {}枚の画像を検出 (モデル: {})\n", images.len(), model);
            }

            let client: Arc<dyn ModelClient> = Arc::new(GeminiClient::from_config(&config)?);
            let controller = BatchScanController::from_config(&config, client);
            controller.check_count(images.len())?;

            let preview_compressor =
                ImageCompressor::new(config.max_image_width, config.jpeg_quality);

            let mut labels = Vec::with_capacity(images.len());
            let mut previews = Vec::with_capacity(images.len());
            let mut entries = Vec::with_capacity(images.len());
            for image in &images {
                let bytes = std::fs::read(&image.path)
                    .with_context(|| format!("failed to read {}", image.path.display()))?;
                let mut entry = UploadEntry::new(bytes, image.mime_type())
                    .with_label(image.file_name.clone());
                if let Some(captured_at) = image.captured_at {
                    entry = entry.with_captured_at(captured_at);
                }
                if preview {
                    // デコードできない画像はプレビュー無し（抽出側で失敗として報告される）
                    previews.push(
                        preview_compressor
                            .compress(&entry.bytes)
                            .ok()
                            .map(|c| c.preview_data_url()),
                    );
                }
                labels.push(image.file_name.clone());
                entries.push(entry);
            }
            let batch = controller.admit(entries)?;

            let progress = if json {
                ProgressBar::hidden()
            } else {
                let bar = ProgressBar::new(batch.len() as u64);
                bar.set_style(
                    ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
                        .progress_chars("=> "),
                );
                bar
            };

            let outcomes = controller
                .scan_with(batch, &model, |index, outcome| {
                    progress.inc(1);
                    if !json {
                        progress.suspend(|| {
                            print!("{}", presenter::render_outcome(index, &labels[index], outcome));
                        });
                    }
                })
                .await;
            progress.finish_and_clear();

            if json {
                let results: Vec<_> = labels
                    .iter()
                    .zip(&outcomes)
                    .enumerate()
                    .map(|(index, (file, outcome))| {
                        let mut item = json!({ "file": file, "result": outcome });
                        if let Some(url) = previews.get(index) {
                            item["preview"] = json!(url);
                        }
                        item
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("\n{}", presenter::render_summary(&outcomes));
            }

            if outcomes.iter().all(|o| matches!(o, ScanOutcome::Failure(_))) {
                std::process::exit(1);
            }
        }

        Commands::Models => {
            let default = config.default_model()?;
            for model in GeminiModel::ALL {
                let marker = if model == default { "*" } else { " " };
                println!("{} {:<24} {}", marker, model.id(), model.label());
            }
        }

        Commands::Config { set_api_key, show } => {
            if let Some(key) = set_api_key {
                // 環境変数の上書き分は保存しない
                let path = Config::store_api_key(key)?;
                println!("✔ APIキーを設定しました: {}", path.display());
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  最大枚数: {}", config.max_uploads);
                println!("  最大画像幅: {}px (JPEG品質 {})", config.max_image_width, config.jpeg_quality);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  待ち受け: {}:{}", config.bind_address, config.port);
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
