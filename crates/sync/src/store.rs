//! 설정 아티팩트 저장소 — 템플릿 렌더링과 conf.d 파일 관리
//!
//! [`ConfigStore`]는 완성된 [`LogSource`] 하나당 정확히 하나의 설정
//! 파일을 `<conf_root>/conf.d/<container_id>.conf`에 유지합니다.
//! 템플릿은 생성 시 한 번 컴파일되며(문법 에러는 치명적), 렌더링
//! 실패 시에는 기존 파일을 건드리지 않습니다.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use tracing::{debug, info};

use logpilot_core::types::LogSource;

use crate::docker::validate_container_id;
use crate::error::SyncError;

/// 등록된 템플릿 이름
const TEMPLATE_NAME: &str = "shipper";

/// 아티팩트 하위 디렉토리
const CONF_SUBDIR: &str = "conf.d";

/// 렌더링된 설정 파일 저장소
#[derive(Debug)]
pub struct ConfigStore {
    /// 컴파일된 템플릿 레지스트리
    registry: Handlebars<'static>,
    /// `<conf_root>/conf.d`
    conf_d: PathBuf,
}

impl ConfigStore {
    /// 템플릿 텍스트를 컴파일만 해 봅니다 (파일 시스템에 손대지 않음).
    ///
    /// 데몬의 `--validate` 경로에서 사용합니다.
    pub fn check_template(template_text: &str) -> Result<(), SyncError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(TEMPLATE_NAME, template_text)
            .map_err(|e| SyncError::TemplateSyntax(e.to_string()))?;
        Ok(())
    }

    /// 템플릿 텍스트를 컴파일하고 아티팩트 디렉토리를 준비합니다.
    ///
    /// `<conf_root>/conf.d/`가 없으면 생성합니다. 새 호스트에서 첫
    /// 스캔이 디렉토리 부재로 실패하지 않아야 합니다.
    ///
    /// # Errors
    ///
    /// - `SyncError::TemplateSyntax`: 템플릿 컴파일 실패 (시작 시 치명적)
    /// - `SyncError::ArtifactScan`: 디렉토리 생성 실패
    pub fn new(template_text: &str, conf_root: impl AsRef<Path>) -> Result<Self, SyncError> {
        let mut registry = Handlebars::new();
        // 셸/설정 텍스트 출력이므로 HTML 이스케이프를 끕니다
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template_text)
            .map_err(|e| SyncError::TemplateSyntax(e.to_string()))?;

        let conf_d = conf_root.as_ref().join(CONF_SUBDIR);
        std::fs::create_dir_all(&conf_d).map_err(|e| SyncError::ArtifactScan {
            path: conf_d.display().to_string(),
            reason: format!("failed to create artifact directory: {e}"),
        })?;

        Ok(Self { registry, conf_d })
    }

    /// 컨테이너 ID에 대한 아티팩트 경로를 반환합니다.
    pub fn artifact_path(&self, container_id: &str) -> PathBuf {
        self.conf_d.join(format!("{container_id}.conf"))
    }

    /// 해당 컨테이너의 아티팩트가 이미 존재하는지 확인합니다.
    ///
    /// 이벤트 루프의 중복 방지 가드로 쓰입니다.
    pub async fn contains(&self, container_id: &str) -> bool {
        if validate_container_id(container_id).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.artifact_path(container_id))
            .await
            .unwrap_or(false)
    }

    /// 로그 소스 하나를 렌더링하여 아티팩트로 씁니다.
    ///
    /// 같은 소스를 두 번 써도 내용은 바이트 단위로 동일하며 파일은
    /// 하나뿐입니다. 렌더링이 실패하면 파일 시스템은 건드리지 않습니다.
    pub async fn write_source(&self, source: &LogSource) -> Result<(), SyncError> {
        validate_container_id(&source.container_id)?;

        let context = serde_json::json!({
            "logPath": source.log_path,
            "logTopic": source.log_topic,
        });
        let rendered =
            self.registry
                .render(TEMPLATE_NAME, &context)
                .map_err(|e| SyncError::Render {
                    container_id: source.container_id.clone(),
                    reason: e.to_string(),
                })?;

        let path = self.artifact_path(&source.container_id);
        tokio::fs::write(&path, rendered.as_bytes())
            .await
            .map_err(|e| SyncError::ArtifactWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(source = %source, path = %path.display(), "config artifact written");
        Ok(())
    }

    /// 컨테이너의 아티팩트를 삭제합니다.
    ///
    /// 존재하지 않는 아티팩트는 에러가 아니며 `Ok(false)`를 반환합니다.
    pub async fn remove(&self, container_id: &str) -> Result<bool, SyncError> {
        validate_container_id(container_id)?;

        let path = self.artifact_path(container_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(container_id, path = %path.display(), "config artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(container_id, "no artifact to remove");
                Ok(false)
            }
            Err(e) => Err(SyncError::ArtifactRemove {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// conf.d의 일반 파일 엔트리를 모두 삭제합니다.
    ///
    /// 부트스트랩 스캔 직전에 정확히 한 번 호출됩니다. 증분 이벤트
    /// 처리와 동시에 실행해서는 안 됩니다 — 방금 쓴 아티팩트가
    /// 지워질 수 있습니다.
    pub async fn clear_all(&self) -> Result<usize, SyncError> {
        let mut entries =
            tokio::fs::read_dir(&self.conf_d)
                .await
                .map_err(|e| SyncError::ArtifactScan {
                    path: self.conf_d.display().to_string(),
                    reason: e.to_string(),
                })?;

        let mut removed = 0usize;
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|e| SyncError::ArtifactScan {
                    path: self.conf_d.display().to_string(),
                    reason: e.to_string(),
                })?;
            let Some(entry) = entry else { break };

            let file_type = entry.file_type().await.map_err(|e| SyncError::ArtifactScan {
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            if !file_type.is_file() {
                continue;
            }

            tokio::fs::remove_file(entry.path())
                .await
                .map_err(|e| SyncError::ArtifactRemove {
                    path: entry.path().display().to_string(),
                    reason: e.to_string(),
                })?;
            removed += 1;
        }

        info!(removed, path = %self.conf_d.display(), "stale config artifacts cleared");
        Ok(removed)
    }
}
