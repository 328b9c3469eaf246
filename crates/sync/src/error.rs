//! 동기화 엔진 에러 타입
//!
//! [`SyncError`]는 동기화 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<SyncError> for LogpilotError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logpilot_core::error::{ContainerError, LogpilotError, TemplateError};

/// 동기화 엔진 도메인 에러
///
/// Docker API 호출, 템플릿 컴파일/렌더링, 아티팩트 파일 I/O 등
/// 동기화 엔진 내부의 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Docker API 호출 실패 (목록 조회, 상세 조회 포함)
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 유효하지 않은 컨테이너 ID
    #[error("invalid container id: {0}")]
    InvalidContainerId(String),

    /// 템플릿 문법 에러 — 시작 시 치명적
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),

    /// 렌더링 실패 — 해당 아티팩트만 스킵
    #[error("render failed for container '{container_id}': {reason}")]
    Render {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 렌더링 실패 사유
        reason: String,
    },

    /// 아티팩트 쓰기 실패
    #[error("artifact write error: {path}: {reason}")]
    ArtifactWrite {
        /// 아티팩트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 아티팩트 삭제 실패 (없는 파일은 에러가 아님)
    #[error("artifact remove error: {path}: {reason}")]
    ArtifactRemove {
        /// 아티팩트 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 아티팩트 디렉토리 열거 실패
    #[error("artifact scan error: {path}: {reason}")]
    ArtifactScan {
        /// 디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<SyncError> for LogpilotError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::DockerApi(msg) => {
                LogpilotError::Container(ContainerError::DockerApi(msg.clone()))
            }
            SyncError::DockerConnection(msg) => {
                LogpilotError::Container(ContainerError::Connection(msg.clone()))
            }
            SyncError::ContainerNotFound(id) => {
                LogpilotError::Container(ContainerError::NotFound(id.clone()))
            }
            SyncError::InvalidContainerId(_) => {
                LogpilotError::Container(ContainerError::DockerApi(err.to_string()))
            }
            SyncError::TemplateSyntax(msg) => {
                LogpilotError::Template(TemplateError::Syntax(msg.clone()))
            }
            SyncError::Render { .. } => {
                LogpilotError::Template(TemplateError::Render(err.to_string()))
            }
            SyncError::ArtifactWrite { .. }
            | SyncError::ArtifactRemove { .. }
            | SyncError::ArtifactScan { .. } => {
                LogpilotError::Io(std::io::Error::other(err.to_string()))
            }
            SyncError::Config { field, reason } => {
                LogpilotError::Config(logpilot_core::error::ConfigError::InvalidValue {
                    field: field.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }
}
