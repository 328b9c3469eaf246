//! logpilot-daemon 엔트리포인트
//!
//! 설정과 템플릿을 로드하고, Docker에 연결한 뒤, 동기화 파일럿을
//! 실행합니다. 깨끗한 이벤트 스트림 종료나 SIGINT로 끝납니다.

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use logpilot_core::config::LogpilotConfig;
use logpilot_sync::{BollardDockerClient, ConfigStore, PilotBuilder, PilotConfig};

use crate::cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일이 없으면 기본값 + 환경변수로 동작
    let mut config = if cli.config.exists() {
        LogpilotConfig::load(&cli.config)
            .await
            .with_context(|| format!("failed to load config from {}", cli.config.display()))?
    } else {
        let mut config = LogpilotConfig::default();
        config.apply_env_overrides();
        config
    };

    // CLI 오버라이드 (최고 우선순위)
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(template) = &cli.template {
        config.sync.template_path = template.display().to_string();
    }
    config.validate().context("invalid configuration")?;

    if cli.validate {
        // 템플릿까지 컴파일해 본 뒤 종료 (Docker 연결, 디렉토리 생성 없음)
        let template_text = tokio::fs::read_to_string(&config.sync.template_path)
            .await
            .with_context(|| {
                format!("failed to read template {}", config.sync.template_path)
            })?;
        PilotConfig::from_core(&config.sync)
            .validate()
            .map_err(|e| anyhow::anyhow!("validation failed: {e}"))?;
        ConfigStore::check_template(&template_text)
            .map_err(|e| anyhow::anyhow!("validation failed: {e}"))?;
        println!("configuration ok: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!("logpilot-daemon starting");

    let template_text = tokio::fs::read_to_string(&config.sync.template_path)
        .await
        .with_context(|| format!("failed to read template {}", config.sync.template_path))?;

    let docker_client = Arc::new(
        BollardDockerClient::connect_with_socket(&config.sync.docker_socket)
            .context("failed to create docker client")?,
    );

    let mut pilot = PilotBuilder::new()
        .config(PilotConfig::from_core(&config.sync))
        .docker_client(docker_client)
        .template(template_text.as_str())
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build sync pilot: {e}"))?;

    tracing::info!("sync pilot initialized");

    tokio::select! {
        result = pilot.run() => {
            result.map_err(|e| anyhow::anyhow!("sync pilot failed: {e}"))?;
            tracing::info!("event stream ended, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!(
        events = pilot.events_processed(),
        sources = pilot.sources_completed(),
        "logpilot-daemon shut down"
    );
    Ok(())
}
