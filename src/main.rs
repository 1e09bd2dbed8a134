//! ttsweave - 长文本语音合成服务
//!
//! - Domain: synthesis/ 参数与实体，text_segmenter 分段
//! - Application: commands, queries, ports
//! - Infrastructure: http, worker, adapters, events

use std::sync::Arc;

use ttsweave::application::{
    ListVoicesHandler, SynthesizeHandler, TtsEnginePort, VoiceCatalogPort,
};
use ttsweave::config::{load_config, print_config, AppConfig, TtsBackend};
use ttsweave::infrastructure::adapters::{
    AudioMerger, AudioMergerConfig, FakeTtsClient, FakeTtsClientConfig, HttpTtsClient,
    HttpTtsClientConfig,
};
use ttsweave::infrastructure::events::MergeNotifier;
use ttsweave::infrastructure::http::{AppState, HttpServer};
use ttsweave::infrastructure::worker::SynthesisDispatcher;

/// 初始化日志，RUST_LOG 优先于配置
fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},ttsweave={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 按配置创建 TTS 后端，同一实例同时提供音色列表
fn create_backend(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn TtsEnginePort>, Arc<dyn VoiceCatalogPort>)> {
    match config.tts.backend {
        TtsBackend::Http => {
            let client = Arc::new(HttpTtsClient::new(HttpTtsClientConfig {
                base_url: config.tts.url.trim_end_matches('/').to_string(),
                timeout_secs: config.tts.timeout_secs,
                max_retries: config.tts.max_retries,
                ..Default::default()
            })?);
            let engine: Arc<dyn TtsEnginePort> = client.clone();
            let catalog: Arc<dyn VoiceCatalogPort> = client;
            Ok((engine, catalog))
        }
        TtsBackend::Fake => {
            let client = Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
                latency_ms: config.tts.fake_latency_ms,
                ..Default::default()
            }));
            let engine: Arc<dyn TtsEnginePort> = client.clone();
            let catalog: Arc<dyn VoiceCatalogPort> = client;
            Ok((engine, catalog))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("ttsweave v{}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    let (tts_engine, voice_catalog) = create_backend(&config)?;
    if !tts_engine.health_check().await {
        tracing::warn!(url = %config.tts.url, "TTS backend health check failed");
    }

    // 合并事件通知器，进程内唯一
    let notifier = MergeNotifier::new().arc();
    notifier.on_merge_start(|segments| {
        tracing::debug!(segments, "Audio merge started");
        Ok(())
    });
    notifier.on_merge_end(|duration_secs, success, bytes| {
        if success {
            tracing::info!(bytes, "Audio merge took {:.2}s", duration_secs);
        } else {
            tracing::warn!("Audio merge failed after {:.2}s", duration_secs);
        }
        Ok(())
    });

    // 启动时探测一次 ffmpeg
    let merger = AudioMerger::probe(
        AudioMergerConfig {
            output_format: config.audio.output_format,
            ffmpeg_path: config.audio.ffmpeg_path.clone(),
            bitrate: config.audio.bitrate.clone(),
            header_skip_bytes: config.audio.header_skip_bytes,
        },
        notifier.clone(),
    )
    .await;

    let dispatcher = SynthesisDispatcher::new(tts_engine.clone());
    let synthesize_handler =
        SynthesizeHandler::new(tts_engine, Arc::new(dispatcher), Arc::new(merger))
            .with_timeout(config.synthesis.timeout());
    let list_voices_handler = ListVoicesHandler::new(voice_catalog);

    let state = AppState::new(
        synthesize_handler,
        list_voices_handler,
        notifier,
        config.synthesis.clone(),
    );

    let server = HttpServer::new(config.server.clone(), state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
