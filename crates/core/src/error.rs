//! 에러 타입 — 도메인별 에러 정의

/// Logpilot 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogpilotError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨테이너 런타임 에러
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// 템플릿 에러
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 컨테이너 런타임 에러
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    Connection(String),

    /// 컨테이너를 찾을 수 없음
    #[error("container not found: {0}")]
    NotFound(String),
}

/// 템플릿 에러
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// 템플릿 문법 에러 (시작 시 치명적)
    #[error("template syntax error: {0}")]
    Syntax(String),

    /// 렌더링 실패 (해당 아티팩트만 스킵)
    #[error("template render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "must be one of: trace, debug, info, warn, error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("general.log_level"));
        assert!(msg.contains("must be one of"));
    }

    #[test]
    fn container_error_display() {
        let err = ContainerError::NotFound("abc123".to_owned());
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn template_error_display() {
        let err = TemplateError::Syntax("unexpected token at line 3".to_owned());
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn wraps_into_top_level_error() {
        let err: LogpilotError = ConfigError::FileNotFound {
            path: "/etc/logpilot/logpilot.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, LogpilotError::Config(_)));

        let err: LogpilotError = ContainerError::DockerApi("boom".to_owned()).into();
        assert!(matches!(err, LogpilotError::Container(_)));

        let err: LogpilotError = TemplateError::Render("missing value".to_owned()).into();
        assert!(matches!(err, LogpilotError::Template(_)));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LogpilotError = io.into();
        assert!(err.to_string().contains("denied"));
    }
}
