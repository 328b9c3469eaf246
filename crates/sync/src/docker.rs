//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use
//! `MockDockerClient`.
//!
//! # Event subscription
//!
//! [`subscribe_events`](DockerClient::subscribe_events) returns an
//! [`EventSubscription`]: a pair of bounded channels, one for translated
//! lifecycle events and one for stream faults. The bollard implementation
//! spawns a forwarding task over `Docker::events` filtered to
//! `type=container`; the task exits on the first fault (the consumer
//! resubscribes) and closes both channels on clean end-of-stream.
//!
//! # Container ID Validation
//!
//! Methods that accept container IDs validate them before use:
//! - Must be 1-64 characters
//! - Must contain only ASCII hex digits ([0-9a-fA-F])
//!
//! The same validation guards artifact paths derived from IDs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use logpilot_core::types::{ContainerDetail, ContainerSummary};

use crate::error::SyncError;
use crate::event::{LifecycleEvent, StreamFault};

/// Validates a container ID before it reaches the Docker API or a file path.
///
/// Docker container IDs are 64-character hex strings (or shorter prefix forms).
pub(crate) fn validate_container_id(id: &str) -> Result<(), SyncError> {
    if id.is_empty() || id.len() > 64 {
        return Err(SyncError::InvalidContainerId(format!(
            "length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SyncError::InvalidContainerId(
            "contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// 이벤트 구독 — 생명주기 이벤트 채널과 스트림 장애 채널의 쌍
///
/// 이벤트 채널이 장애 없이 닫히면 깨끗한 스트림 종료입니다.
#[derive(Debug)]
pub struct EventSubscription {
    /// 번역된 생명주기 이벤트
    pub events: mpsc::Receiver<LifecycleEvent>,
    /// 스트림 장애 — 수신 즉시 재구독 대상
    pub faults: mpsc::Receiver<StreamFault>,
}

/// Trait abstracting Docker API operations.
///
/// All Docker API calls go through this trait, enabling testability via
/// mocking. The trait is `Send + Sync + 'static`, allowing safe sharing
/// across async contexts.
pub trait DockerClient: Send + Sync + 'static {
    /// Lists containers.
    ///
    /// With `all == true` every lifecycle state is included (the bootstrap
    /// scan needs this); otherwise only running containers are returned.
    fn list_containers(
        &self,
        all: bool,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, SyncError>> + Send;

    /// Inspects a specific container.
    ///
    /// # Errors
    ///
    /// - `SyncError::ContainerNotFound`: container does not exist (404)
    /// - `SyncError::DockerApi`: invalid ID or other API errors
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerDetail, SyncError>> + Send;

    /// Subscribes to container lifecycle events.
    ///
    /// `buffer` bounds the event channel; the fault channel holds one entry.
    fn subscribe_events(&self, buffer: usize) -> EventSubscription;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket.
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::DockerConnection` if the connection fails
    /// (e.g., socket not found, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, SyncError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            SyncError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, SyncError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    SyncError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, SyncError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| SyncError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let id = container.id.unwrap_or_default();
            let names = container.names.unwrap_or_default();
            let name = names
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let state = container.state.unwrap_or_default();

            result.push(ContainerSummary { id, name, state });
        }

        Ok(result)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetail, SyncError> {
        validate_container_id(id)?;

        let details = self.docker.inspect_container(id, None).await.map_err(|e| {
            if e.to_string().contains("404") {
                SyncError::ContainerNotFound(id.to_owned())
            } else {
                SyncError::DockerApi(format!("inspect container failed: {e}"))
            }
        })?;

        let container_id = details.id.unwrap_or_default();
        let name = details
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default();
        let status = details
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_owned());
        let entrypoint = details.path.unwrap_or_default();
        let labels = details
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default();
        let log_path = details.log_path.unwrap_or_default();

        Ok(ContainerDetail {
            id: container_id,
            name,
            status,
            entrypoint,
            labels,
            log_path,
        })
    }

    fn subscribe_events(&self, buffer: usize) -> EventSubscription {
        use bollard::system::EventsOptions;

        let (event_tx, event_rx) = mpsc::channel(buffer.max(1));
        let (fault_tx, fault_rx) = mpsc::channel(1);
        let docker = Arc::clone(&self.docker);

        tokio::spawn(async move {
            let mut filters = HashMap::new();
            filters.insert("type".to_owned(), vec!["container".to_owned()]);
            let options = EventsOptions::<String> {
                filters,
                ..Default::default()
            };

            let mut stream = docker.events(Some(options));
            while let Some(item) = stream.next().await {
                match item {
                    Ok(msg) => {
                        if let Some(event) = LifecycleEvent::from_runtime(&msg) {
                            if event_tx.send(event).await.is_err() {
                                // subscriber dropped, stop forwarding
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = fault_tx
                            .send(StreamFault {
                                reason: e.to_string(),
                            })
                            .await;
                        // the consumer resubscribes with a fresh task
                        return;
                    }
                }
            }
            // natural end of stream: dropping the senders closes both channels
        });

        EventSubscription {
            events: event_rx,
            faults: fault_rx,
        }
    }

    async fn ping(&self) -> Result<(), SyncError> {
        self.docker
            .ping()
            .await
            .map_err(|e| SyncError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 설정 가능한 컨테이너 목록과 대본(scripted) 구독을 반환하여
/// Docker 없이도 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Debug)]
pub struct MockDockerClient {
    /// inspect/list 호출 시 사용할 컨테이너 상세 목록
    pub containers: Vec<ContainerDetail>,
    /// inspect 호출 시 실패를 시뮬레이션할지 여부
    pub fail_inspect: bool,
    /// 목록 조회에서 컨테이너를 숨길지 여부
    /// (부트스트랩 이후에 시작된 컨테이너를 흉내냄)
    pub list_hidden: bool,
    /// inspect 호출 횟수 (중복 방지 가드 검증용)
    pub inspect_calls: std::sync::atomic::AtomicU64,
    /// subscribe_events 호출마다 순서대로 반환할 구독 대본
    subscriptions: std::sync::Mutex<std::collections::VecDeque<EventSubscription>>,
}

#[cfg(test)]
impl Default for MockDockerClient {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            fail_inspect: false,
            list_hidden: false,
            inspect_calls: std::sync::atomic::AtomicU64::new(0),
            subscriptions: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트용 컨테이너를 추가합니다.
    pub fn with_containers(mut self, containers: Vec<ContainerDetail>) -> Self {
        self.containers = containers;
        self
    }

    /// inspect 호출이 실패하도록 설정합니다.
    pub fn with_failing_inspect(mut self) -> Self {
        self.fail_inspect = true;
        self
    }

    /// 목록 조회에서 컨테이너를 숨깁니다 (inspect는 그대로 동작).
    pub fn with_list_hidden(mut self) -> Self {
        self.list_hidden = true;
        self
    }

    /// 다음 subscribe_events 호출이 반환할 구독 대본을 추가합니다.
    pub fn push_subscription(self, subscription: EventSubscription) -> Self {
        self.subscriptions.lock().unwrap().push_back(subscription);
        self
    }

    /// 미리 채워진 구독을 만듭니다. 이벤트를 모두 소비하면 채널이 닫히고,
    /// `fault`가 있으면 장애 채널에 먼저 올라가 있습니다.
    pub fn scripted_subscription(
        events: Vec<LifecycleEvent>,
        fault: Option<StreamFault>,
    ) -> EventSubscription {
        let (event_tx, event_rx) = mpsc::channel(events.len().max(1));
        for event in events {
            event_tx.try_send(event).expect("scripted channel overflow");
        }
        let (fault_tx, fault_rx) = mpsc::channel(1);
        if let Some(fault) = fault {
            fault_tx.try_send(fault).expect("scripted fault overflow");
        }
        // senders dropped here: receivers drain the script then observe closure
        EventSubscription {
            events: event_rx,
            faults: fault_rx,
        }
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, SyncError> {
        if self.list_hidden {
            return Ok(Vec::new());
        }
        Ok(self
            .containers
            .iter()
            .filter(|c| all || c.status == "running")
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                state: c.status.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetail, SyncError> {
        self.inspect_calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_inspect {
            return Err(SyncError::DockerApi("mock inspect failure".to_owned()));
        }
        self.containers
            .iter()
            .find(|c| c.id == id || c.id.starts_with(id))
            .cloned()
            .ok_or_else(|| SyncError::ContainerNotFound(id.to_owned()))
    }

    fn subscribe_events(&self, _buffer: usize) -> EventSubscription {
        self.subscriptions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::scripted_subscription(Vec::new(), None))
    }

    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
