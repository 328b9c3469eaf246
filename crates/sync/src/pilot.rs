//! 파일럿 오케스트레이터 — 부트스트랩 스캔과 이벤트 감시 루프
//!
//! [`Pilot`]은 전체 동기화 흐름을 소유합니다:
//!
//! ```text
//! run()
//!  ├── bootstrap: list → clear_all → inspect each → observe   (fail-fast)
//!  └── watch: subscribe → select{event, fault} → observe/forget
//!               └ fault → resubscribe (백오프 없음)
//!               └ clean end-of-stream → Ok(())
//! ```
//!
//! 페어링 테이블은 이 한 루프에서만 변경되므로 잠금이 없습니다.
//! 이벤트는 한 번에 하나씩 처리되고, 파일 쓰기/삭제는 그 동안 루프를
//! 붙잡습니다.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PilotConfig;
use crate::docker::DockerClient;
use crate::error::SyncError;
use crate::event::{LifecycleEvent, LifecycleEventKind};
use crate::reconciler::Reconciler;
use crate::scanner::run_bootstrap;
use crate::store::ConfigStore;

/// 파일럿 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PilotState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 부트스트랩 스캔 진행 중
    Bootstrapping,
    /// 이벤트 감시 중
    Watching,
    /// 종료됨 (깨끗한 스트림 종료 또는 치명적 에러)
    Terminated,
}

/// 설정 동기화 파일럿
///
/// 부트스트랩 스캔이 끝나기 전에는 어떤 이벤트도 처리하지 않습니다.
#[derive(Debug)]
pub struct Pilot<D: DockerClient> {
    /// 엔진 설정
    config: PilotConfig,
    /// 현재 상태
    state: PilotState,
    /// Docker 클라이언트 (공유)
    docker: Arc<D>,
    /// 페어링 조정자 (테이블 + 아티팩트 저장소 소유)
    reconciler: Reconciler,
    /// 처리된 이벤트 수
    events_processed: u64,
    /// 완성되어 아티팩트로 이어진 페어링 수
    sources_completed: u64,
}

impl<D: DockerClient> Pilot<D> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PilotState::Initialized => "initialized",
            PilotState::Bootstrapping => "bootstrapping",
            PilotState::Watching => "watching",
            PilotState::Terminated => "terminated",
        }
    }

    /// 처리된 이벤트 수를 반환합니다.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// 완성된 페어링 수를 반환합니다.
    pub fn sources_completed(&self) -> u64 {
        self.sources_completed
    }

    /// 대기 중인 페어링 수를 반환합니다.
    pub fn pending_count(&self) -> usize {
        self.reconciler.pending_count()
    }

    /// 부트스트랩 스캔 후 이벤트 감시를 시작합니다.
    ///
    /// 깨끗한 스트림 종료 시 `Ok(())`로 반환합니다. 부트스트랩 실패는
    /// 치명적이며 그대로 전파됩니다 — 알 수 없는 기준선 위에서 이벤트를
    /// 처리하기 시작해서는 안 됩니다.
    pub async fn run(&mut self) -> Result<(), SyncError> {
        info!("starting config sync pilot");

        if self.docker.ping().await.is_err() {
            warn!("docker daemon not reachable, bootstrap will fail fast");
        }

        self.state = PilotState::Bootstrapping;
        let docker = Arc::clone(&self.docker);
        match run_bootstrap(docker.as_ref(), &mut self.reconciler).await {
            Ok(observed) => {
                info!(observed, "baseline established");
            }
            Err(e) => {
                self.state = PilotState::Terminated;
                return Err(e);
            }
        }

        self.state = PilotState::Watching;
        let result = self.watch().await;
        self.state = PilotState::Terminated;
        result
    }

    /// 이벤트 감시 루프.
    ///
    /// 이벤트 채널과 장애 채널을 우선순위 없이 동시에 기다립니다.
    /// 장애가 오면 같은 필터로 즉시 재구독하고, 장애 없이 이벤트
    /// 채널이 닫히면 깨끗한 종료입니다.
    async fn watch(&mut self) -> Result<(), SyncError> {
        let mut subscription = self.docker.subscribe_events(self.config.event_buffer);
        info!("watching container events");

        loop {
            tokio::select! {
                maybe_event = subscription.events.recv() => match maybe_event {
                    Some(event) => {
                        self.events_processed += 1;
                        self.handle_event(event).await;
                    }
                    None => match subscription.faults.try_recv() {
                        // 전달자가 장애를 남기고 끝난 경우: 재구독
                        Ok(fault) => {
                            warn!(%fault, "resubscribing to event stream");
                            subscription = self.docker.subscribe_events(self.config.event_buffer);
                        }
                        Err(_) => {
                            info!("event stream ended cleanly, stopping");
                            return Ok(());
                        }
                    },
                },
                Some(fault) = subscription.faults.recv() => {
                    warn!(%fault, "resubscribing to event stream");
                    subscription = self.docker.subscribe_events(self.config.event_buffer);
                }
            }
        }
    }

    /// 이벤트 하나를 처리합니다. 모든 실패는 지역적으로 복구됩니다.
    async fn handle_event(&mut self, event: LifecycleEvent) {
        match event.kind {
            LifecycleEventKind::Started => {
                // 중복 start/running 알림 방지: 이미 아티팩트가 있으면 스킵
                if self.reconciler.store().contains(&event.container_id).await {
                    debug!(container_id = %event.container_id, "artifact already present, skipping");
                    return;
                }

                match self.docker.inspect_container(&event.container_id).await {
                    Ok(detail) => {
                        if self.reconciler.observe(&detail).await.is_some() {
                            self.sources_completed += 1;
                        }
                    }
                    Err(e) => {
                        // 다음 이벤트나 재시작 때 스스로 복구됨
                        warn!(
                            container_id = %event.container_id,
                            error = %e,
                            "inspect failed, dropping event"
                        );
                    }
                }
            }
            LifecycleEventKind::Destroyed => {
                self.reconciler.forget(&event.container_id).await;
            }
            LifecycleEventKind::Other(action) => {
                debug!(container_id = %event.container_id, action, "ignoring container action");
            }
        }
    }
}

/// 파일럿 빌더
pub struct PilotBuilder<D: DockerClient> {
    config: PilotConfig,
    docker: Option<Arc<D>>,
    template_text: Option<String>,
}

impl<D: DockerClient> PilotBuilder<D> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PilotConfig::default(),
            docker: None,
            template_text: None,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: PilotConfig) -> Self {
        self.config = config;
        self
    }

    /// Docker 클라이언트를 설정합니다.
    pub fn docker_client(mut self, docker: Arc<D>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// 설정 템플릿 텍스트를 지정합니다.
    ///
    /// 데몬이 템플릿 파일을 읽어 그 내용을 여기에 전달합니다.
    pub fn template(mut self, text: impl Into<String>) -> Self {
        self.template_text = Some(text.into());
        self
    }

    /// 파일럿을 빌드합니다.
    ///
    /// 설정 검증과 템플릿 컴파일이 여기서 일어나므로, 문법이 깨진
    /// 템플릿은 시작 전에 거부됩니다.
    pub fn build(self) -> Result<Pilot<D>, SyncError> {
        self.config.validate()?;

        let docker = self.docker.ok_or_else(|| SyncError::Config {
            field: "docker_client".to_owned(),
            reason: "docker client must be provided".to_owned(),
        })?;

        let template_text = self.template_text.ok_or_else(|| SyncError::Config {
            field: "template".to_owned(),
            reason: "template text must be provided".to_owned(),
        })?;

        let store = ConfigStore::new(&template_text, &self.config.conf_dir)?;
        let reconciler = Reconciler::new(store, &self.config);

        Ok(Pilot {
            config: self.config,
            state: PilotState::Initialized,
            docker,
            reconciler,
            events_processed: 0,
            sources_completed: 0,
        })
    }
}

impl<D: DockerClient> Default for PilotBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    use logpilot_core::types::ContainerDetail;

    use crate::docker::MockDockerClient;
    use crate::event::StreamFault;

    const TEMPLATE: &str = "path={{logPath}} topic={{logTopic}}\n";

    fn test_config(dir: &Path) -> PilotConfig {
        PilotConfig {
            conf_dir: dir.display().to_string(),
            ..Default::default()
        }
    }

    fn infra(name: &str, id: &str, topic: &str) -> ContainerDetail {
        ContainerDetail {
            id: id.to_owned(),
            name: name.to_owned(),
            status: "running".to_owned(),
            entrypoint: "/pause".to_owned(),
            labels: HashMap::from([("logtopic".to_owned(), topic.to_owned())]),
            log_path: String::new(),
        }
    }

    fn workload(name: &str, id: &str, log_path: &str) -> ContainerDetail {
        ContainerDetail {
            id: id.to_owned(),
            name: name.to_owned(),
            status: "running".to_owned(),
            entrypoint: "/docker-entrypoint.sh".to_owned(),
            labels: HashMap::new(),
            log_path: log_path.to_owned(),
        }
    }

    fn started(id: &str) -> LifecycleEvent {
        LifecycleEvent {
            container_id: id.to_owned(),
            kind: LifecycleEventKind::Started,
        }
    }

    fn destroyed(id: &str) -> LifecycleEvent {
        LifecycleEvent {
            container_id: id.to_owned(),
            kind: LifecycleEventKind::Destroyed,
        }
    }

    #[test]
    fn builder_requires_docker_client() {
        let result = PilotBuilder::<MockDockerClient>::new()
            .template(TEMPLATE)
            .build();
        assert!(matches!(result.unwrap_err(), SyncError::Config { .. }));
    }

    #[test]
    fn builder_requires_template() {
        let result = PilotBuilder::new()
            .docker_client(Arc::new(MockDockerClient::new()))
            .build();
        assert!(matches!(result.unwrap_err(), SyncError::Config { .. }));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = PilotConfig {
            event_buffer: 0,
            ..test_config(dir.path())
        };
        let result = PilotBuilder::new()
            .config(config)
            .docker_client(Arc::new(MockDockerClient::new()))
            .template(TEMPLATE)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_broken_template() {
        let dir = tempfile::tempdir().unwrap();
        let result = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(MockDockerClient::new()))
            .template("{{#if}}")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            SyncError::TemplateSyntax(_)
        ));
    }

    #[tokio::test]
    async fn run_terminates_on_clean_stream_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(MockDockerClient::new()))
            .template(TEMPLATE)
            .build()
            .unwrap();

        assert_eq!(pilot.state_name(), "initialized");
        pilot.run().await.unwrap();
        assert_eq!(pilot.state_name(), "terminated");
        assert_eq!(pilot.events_processed(), 0);
    }

    #[tokio::test]
    async fn start_events_drive_pairing() {
        let dir = tempfile::tempdir().unwrap();
        // the pair starts after the bootstrap scan: only events see it
        let docker = MockDockerClient::new()
            .with_containers(vec![
                infra("podA", "aaaa00000001", "svc-a"),
                workload("podA", "bbbb00000001", "/var/log/b1.log"),
            ])
            .with_list_hidden()
            .push_subscription(MockDockerClient::scripted_subscription(
                vec![started("aaaa00000001"), started("bbbb00000001")],
                None,
            ));

        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(docker))
            .template(TEMPLATE)
            .build()
            .unwrap();

        pilot.run().await.unwrap();
        assert_eq!(pilot.events_processed(), 2);
        assert_eq!(pilot.sources_completed(), 1);
        assert!(dir.path().join("conf.d/bbbb00000001.conf").exists());
    }

    #[tokio::test]
    async fn destroy_event_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // the pair is running at bootstrap; a later destroy drops the artifact
        let docker = MockDockerClient::new()
            .with_containers(vec![
                infra("podA", "aaaa00000001", "svc-a"),
                workload("podA", "bbbb00000001", "/var/log/b1.log"),
            ])
            .push_subscription(MockDockerClient::scripted_subscription(
                vec![destroyed("bbbb00000001"), destroyed("bbbb00000001")],
                None,
            ));

        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(docker))
            .template(TEMPLATE)
            .build()
            .unwrap();

        pilot.run().await.unwrap();
        // the repeated destroy is a no-op, not an error
        assert_eq!(pilot.events_processed(), 2);
        assert!(!dir.path().join("conf.d/bbbb00000001.conf").exists());
    }

    #[tokio::test]
    async fn stream_fault_triggers_resubscription() {
        let dir = tempfile::tempdir().unwrap();
        // the first subscription dies with a fault before delivering
        // anything; the pairing happens entirely on the second one
        let docker = MockDockerClient::new()
            .with_containers(vec![
                infra("podA", "aaaa00000001", "svc-a"),
                workload("podA", "bbbb00000001", "/var/log/b1.log"),
            ])
            .with_list_hidden()
            .push_subscription(MockDockerClient::scripted_subscription(
                Vec::new(),
                Some(StreamFault {
                    reason: "connection reset".to_owned(),
                }),
            ))
            .push_subscription(MockDockerClient::scripted_subscription(
                vec![started("aaaa00000001"), started("bbbb00000001")],
                None,
            ));

        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(docker))
            .template(TEMPLATE)
            .build()
            .unwrap();

        pilot.run().await.unwrap();
        // events from both subscriptions were seen exactly once
        assert_eq!(pilot.events_processed(), 2);
        assert!(dir.path().join("conf.d/bbbb00000001.conf").exists());
    }

    #[tokio::test]
    async fn existing_artifact_skips_inspect() {
        use logpilot_core::types::LogSource;

        let dir = tempfile::tempdir().unwrap();
        let docker = Arc::new(MockDockerClient::new().with_failing_inspect());

        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::clone(&docker))
            .template(TEMPLATE)
            .build()
            .unwrap();

        // an artifact already on disk for this id: a redundant start
        // notification must not reach inspect at all
        pilot
            .reconciler
            .store()
            .write_source(&LogSource {
                container_id: "bbbb00000001".to_owned(),
                log_path: "/var/log/b1.log".to_owned(),
                log_topic: "svc-a".to_owned(),
            })
            .await
            .unwrap();

        pilot.handle_event(started("bbbb00000001")).await;
        assert_eq!(
            docker
                .inspect_calls
                .load(std::sync::atomic::Ordering::Relaxed),
            0
        );
    }

    #[tokio::test]
    async fn event_time_inspect_failure_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let docker = MockDockerClient::new()
            .with_failing_inspect()
            .push_subscription(MockDockerClient::scripted_subscription(
                vec![started("bbbb00000001")],
                None,
            ));

        let mut pilot = PilotBuilder::new()
            .config(test_config(dir.path()))
            .docker_client(Arc::new(docker))
            .template(TEMPLATE)
            .build()
            .unwrap();

        // bootstrap lists nothing, so the failing inspect only affects the event
        pilot.run().await.unwrap();
        assert_eq!(pilot.events_processed(), 1);
        assert_eq!(pilot.pending_count(), 0);
    }
}
