//! 동기화 엔진 설정
//!
//! [`PilotConfig`]는 core의 [`SyncConfig`](logpilot_core::config::SyncConfig)를
//! 기반으로 동기화 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logpilot_core::config::LogpilotConfig;
//! use logpilot_sync::config::PilotConfig;
//!
//! let core_config = LogpilotConfig::default();
//! let config = PilotConfig::from_core(&core_config.sync);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// 동기화 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// 렌더링된 아티팩트가 쌓이는 루트 디렉토리 (`<conf_dir>/conf.d/`)
    pub conf_dir: String,
    /// 로그 토픽을 담는 라벨 키
    pub topic_label: String,
    /// 인프라 컨테이너 판별용 엔트리포인트 경로
    pub infra_entrypoint: String,
    /// 이벤트 채널 버퍼 크기
    pub event_buffer: usize,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            conf_dir: "/etc/fluentd".to_owned(),
            topic_label: "logtopic".to_owned(),
            infra_entrypoint: "/pause".to_owned(),
            event_buffer: 256,
        }
    }
}

const MAX_EVENT_BUFFER: usize = 65_536;

impl PilotConfig {
    /// core의 `SyncConfig`에서 엔진 설정을 생성합니다.
    ///
    /// `template_path`는 데몬이 직접 파일을 읽어 템플릿 텍스트로
    /// 전달하므로 여기에는 포함되지 않습니다.
    pub fn from_core(core: &logpilot_core::config::SyncConfig) -> Self {
        Self {
            docker_socket: core.docker_socket.clone(),
            conf_dir: core.conf_dir.clone(),
            topic_label: core.topic_label.clone(),
            infra_entrypoint: core.infra_entrypoint.clone(),
            event_buffer: core.event_buffer,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.docker_socket.is_empty() {
            return Err(SyncError::Config {
                field: "docker_socket".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.conf_dir.is_empty() {
            return Err(SyncError::Config {
                field: "conf_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.topic_label.is_empty() {
            return Err(SyncError::Config {
                field: "topic_label".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.infra_entrypoint.is_empty() {
            return Err(SyncError::Config {
                field: "infra_entrypoint".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.event_buffer == 0 || self.event_buffer > MAX_EVENT_BUFFER {
            return Err(SyncError::Config {
                field: "event_buffer".to_owned(),
                reason: format!("must be 1-{MAX_EVENT_BUFFER}"),
            });
        }

        Ok(())
    }
}
