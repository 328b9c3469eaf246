//! 설정 관리 — logpilot.toml 파싱 및 런타임 설정
//!
//! [`LogpilotConfig`]는 데몬과 동기화 엔진의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGPILOT_SYNC_CONF_DIR=/etc/fluentd` 형식)
//! 3. 설정 파일 (`logpilot.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logpilot_core::error::LogpilotError> {
//! use logpilot_core::config::LogpilotConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogpilotConfig::load("logpilot.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogpilotConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LogpilotError};

/// Logpilot 통합 설정
///
/// `logpilot.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogpilotConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 동기화 엔진 설정
    #[serde(default)]
    pub sync: SyncConfig,
}

/// 일반 설정 (로깅)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 동기화 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// 설정 템플릿 파일 경로
    pub template_path: String,
    /// 렌더링된 아티팩트가 쌓이는 루트 디렉토리 (`<conf_dir>/conf.d/`)
    pub conf_dir: String,
    /// 로그 토픽을 담는 라벨 키
    pub topic_label: String,
    /// 인프라 컨테이너 판별용 엔트리포인트 경로
    pub infra_entrypoint: String,
    /// 이벤트 채널 버퍼 크기
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            template_path: "/etc/logpilot/shipper.conf.hbs".to_owned(),
            conf_dir: "/etc/fluentd".to_owned(),
            topic_label: "logtopic".to_owned(),
            infra_entrypoint: "/pause".to_owned(),
            event_buffer: 256,
        }
    }
}

/// 설정 상한값 상수
const MAX_EVENT_BUFFER: usize = 65_536;

impl LogpilotConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogpilotError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogpilotError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogpilotError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogpilotError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogpilotError> {
        toml::from_str(toml_str).map_err(|e| {
            LogpilotError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGPILOT_{SECTION}_{FIELD}`
    /// 예: `LOGPILOT_SYNC_CONF_DIR=/etc/fluentd`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGPILOT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGPILOT_GENERAL_LOG_FORMAT");

        // Sync
        override_string(&mut self.sync.docker_socket, "LOGPILOT_SYNC_DOCKER_SOCKET");
        override_string(&mut self.sync.template_path, "LOGPILOT_SYNC_TEMPLATE_PATH");
        override_string(&mut self.sync.conf_dir, "LOGPILOT_SYNC_CONF_DIR");
        override_string(&mut self.sync.topic_label, "LOGPILOT_SYNC_TOPIC_LABEL");
        override_string(
            &mut self.sync.infra_entrypoint,
            "LOGPILOT_SYNC_INFRA_ENTRYPOINT",
        );
        override_usize(&mut self.sync.event_buffer, "LOGPILOT_SYNC_EVENT_BUFFER");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogpilotError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.sync.docker_socket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.docker_socket".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.sync.template_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.template_path".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.sync.conf_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.conf_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.sync.topic_label.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.topic_label".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.sync.infra_entrypoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.infra_entrypoint".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.sync.event_buffer == 0 || self.sync.event_buffer > MAX_EVENT_BUFFER {
            return Err(ConfigError::InvalidValue {
                field: "sync.event_buffer".to_owned(),
                reason: format!("must be 1-{MAX_EVENT_BUFFER}"),
            }
            .into());
        }

        Ok(())
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => {
                tracing::warn!(env = env_key, value = %value, "ignoring unparsable env override");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_is_valid() {
        let config = LogpilotConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_minimal_toml() {
        let config = LogpilotConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sync.conf_dir, "/etc/fluentd");
        assert_eq!(config.sync.topic_label, "logtopic");
        assert_eq!(config.sync.infra_entrypoint, "/pause");
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
            [general]
            log_level = "debug"
            log_format = "pretty"

            [sync]
            docker_socket = "/run/docker.sock"
            template_path = "/opt/shipper.hbs"
            conf_dir = "/etc/shipper"
            topic_label = "log.topic"
            infra_entrypoint = "/pause"
            event_buffer = 64
        "#;
        let config = LogpilotConfig::parse(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.sync.docker_socket, "/run/docker.sock");
        assert_eq!(config.sync.conf_dir, "/etc/shipper");
        assert_eq!(config.sync.event_buffer, 64);
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let result = LogpilotConfig::parse("[general\nlog_level=");
        assert!(matches!(
            result.unwrap_err(),
            LogpilotError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = LogpilotConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = LogpilotConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_socket() {
        let mut config = LogpilotConfig::default();
        config.sync.docker_socket = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_topic_label() {
        let mut config = LogpilotConfig::default();
        config.sync.topic_label = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_event_buffer() {
        let mut config = LogpilotConfig::default();
        config.sync.event_buffer = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_event_buffer() {
        let mut config = LogpilotConfig::default();
        config.sync.event_buffer = 100_000;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_override_applies() {
        // 안전하지 않은 set_var/remove_var는 단일 스레드 테스트에서만 사용
        unsafe {
            std::env::set_var("LOGPILOT_SYNC_CONF_DIR", "/tmp/conf-root");
        }
        let mut config = LogpilotConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("LOGPILOT_SYNC_CONF_DIR");
        }
        assert_eq!(config.sync.conf_dir, "/tmp/conf-root");
    }

    #[test]
    #[serial]
    fn env_override_ignores_empty_value() {
        unsafe {
            std::env::set_var("LOGPILOT_SYNC_TOPIC_LABEL", "");
        }
        let mut config = LogpilotConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("LOGPILOT_SYNC_TOPIC_LABEL");
        }
        assert_eq!(config.sync.topic_label, "logtopic");
    }

    #[test]
    #[serial]
    fn env_override_ignores_unparsable_usize() {
        unsafe {
            std::env::set_var("LOGPILOT_SYNC_EVENT_BUFFER", "lots");
        }
        let mut config = LogpilotConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("LOGPILOT_SYNC_EVENT_BUFFER");
        }
        assert_eq!(config.sync.event_buffer, 256);
    }

    #[tokio::test]
    async fn from_file_missing_path() {
        let result = LogpilotConfig::from_file("/nonexistent/logpilot.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            LogpilotError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogpilotConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let back = LogpilotConfig::parse(&toml_str).unwrap();
        assert_eq!(config.sync.conf_dir, back.sync.conf_dir);
        assert_eq!(config.general.log_level, back.general.log_level);
    }
}
