//! 페어링 조정자 — 관찰/파기 신호를 테이블과 저장소에 반영
//!
//! [`Reconciler`]는 한 번에 신호 하나를 소비합니다. 부트스트랩 스캔과
//! 이벤트 루프가 모두 여기로 관찰을 밀어 넣고, 페어링이 완성되는 순간
//! [`ConfigStore`]에 아티팩트를 씁니다. 파기 신호는 테이블을 거치지
//! 않고 곧바로 저장소의 삭제 경로를 탑니다.
//!
//! 호출자가 하나뿐이므로(스캔이 끝난 뒤에야 이벤트 루프가 시작)
//! 내부 잠금은 필요하지 않습니다.

use tracing::{debug, warn};

use logpilot_core::types::{ContainerDetail, LogSource};

use crate::config::PilotConfig;
use crate::pairing::{Contribution, PairingTable};
use crate::store::ConfigStore;

/// 관찰된 컨테이너의 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// 그룹 메타데이터만 드는 동반 컨테이너
    Infrastructure,
    /// 실제 로그를 내는 컨테이너
    Workload,
}

/// 페어링 조정자
#[derive(Debug)]
pub struct Reconciler {
    table: PairingTable,
    store: ConfigStore,
    /// 로그 토픽을 담는 라벨 키
    topic_label: String,
    /// 인프라 컨테이너 판별용 엔트리포인트 경로
    infra_entrypoint: String,
}

impl Reconciler {
    /// 새 조정자를 생성합니다.
    pub fn new(store: ConfigStore, config: &PilotConfig) -> Self {
        Self {
            table: PairingTable::new(),
            store,
            topic_label: config.topic_label.clone(),
            infra_entrypoint: config.infra_entrypoint.clone(),
        }
    }

    /// 컨테이너의 역할을 판별합니다.
    pub fn classify(&self, detail: &ContainerDetail) -> Role {
        if detail.entrypoint == self.infra_entrypoint {
            Role::Infrastructure
        } else {
            Role::Workload
        }
    }

    /// 컨테이너 관찰 하나를 처리합니다.
    ///
    /// 실행 중이 아닌 컨테이너는 테이블에 아무 흔적도 남기지 않습니다.
    /// 페어링이 완성되면 아티팩트를 쓰고 완성된 소스를 반환합니다.
    /// 쓰기/렌더링 실패는 경고로 남기고 넘어갑니다 — 테이블 엔트리는
    /// 이미 제거된 뒤이며, 다음 관련 이벤트에서 스스로 복구됩니다.
    pub async fn observe(&mut self, detail: &ContainerDetail) -> Option<LogSource> {
        if !detail.is_running() {
            debug!(container = %detail, "ignoring non-running container");
            return None;
        }

        let contribution = match self.classify(detail) {
            Role::Infrastructure => Contribution::Infra {
                log_topic: detail
                    .labels
                    .get(&self.topic_label)
                    .filter(|value| !value.is_empty())
                    .cloned(),
            },
            Role::Workload => Contribution::Workload {
                container_id: detail.id.clone(),
                log_path: detail.log_path.clone(),
            },
        };

        let completed = self.table.observe(&detail.name, contribution);

        if let Some(source) = &completed {
            if let Err(e) = self.store.write_source(source).await {
                warn!(source = %source, error = %e, "failed to materialize log source");
            }
        }

        completed
    }

    /// 파기 신호를 처리합니다 — 해당 컨테이너의 아티팩트 삭제 요청.
    ///
    /// 아티팩트가 없는 것은 정상이며, 그 외 삭제 실패만 경고로 남깁니다.
    pub async fn forget(&self, container_id: &str) {
        if let Err(e) = self.store.remove(container_id).await {
            warn!(container_id, error = %e, "failed to remove config artifact");
        }
    }

    /// 대기 중인 페어링 수를 반환합니다.
    pub fn pending_count(&self) -> usize {
        self.table.pending_count()
    }

    /// 아티팩트 저장소에 대한 참조를 반환합니다.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}
