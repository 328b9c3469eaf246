//! 부트스트랩 스캔 — 시작 시 한 번의 전체 컨테이너 조사
//!
//! 증분 이벤트를 신뢰하기 전에 알려진 기준선을 세웁니다. 모든
//! 컨테이너를 나열하고, 묵은 아티팩트를 지운 다음, 삭제 진행 중이
//! 아닌 각 컨테이너를 상세 조회하여 조정자에 먹입니다.
//!
//! 기준선은 전부 아니면 무(all-or-nothing)입니다: 상세 조회 하나만
//! 실패해도 전체 패스를 중단하고 호출자에게 에러를 올립니다. 부분적으로
//! 맞는 설정 집합을 만들어 내는 것보다 시작을 실패시키는 편이 낫습니다.

use tracing::{debug, info};

use crate::docker::DockerClient;
use crate::error::SyncError;
use crate::reconciler::Reconciler;

/// 부트스트랩 스캔을 한 번 실행합니다.
///
/// 조정자에 먹인 컨테이너 수를 반환합니다.
///
/// # Errors
///
/// - `SyncError::DockerApi`: 목록 조회 실패
/// - `SyncError::ArtifactScan` / `ArtifactRemove`: 묵은 아티팩트 정리 실패
/// - 상세 조회 실패: 해당 에러를 그대로 전파 (fail-fast)
pub async fn run_bootstrap<D: DockerClient>(
    docker: &D,
    reconciler: &mut Reconciler,
) -> Result<usize, SyncError> {
    let containers = docker.list_containers(true).await?;
    debug!(listed = containers.len(), "bootstrap listing complete");

    reconciler.store().clear_all().await?;

    let mut observed = 0usize;
    for summary in &containers {
        if summary.is_removing() {
            debug!(container_id = %summary.id, "skipping container in removing state");
            continue;
        }

        let detail = docker.inspect_container(&summary.id).await?;
        reconciler.observe(&detail).await;
        observed += 1;
    }

    info!(observed, pending = reconciler.pending_count(), "bootstrap scan complete");
    Ok(observed)
}
