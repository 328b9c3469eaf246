//! Container lifecycle events.
//!
//! [`LifecycleEvent`] is the engine-internal form of a Docker container
//! event: only the container id and the transition kind survive
//! translation. The raw runtime message carries much more, but the
//! reconciler needs nothing else — a destroy is handled from the id
//! alone, and a start triggers a fresh inspect anyway.

use std::fmt;

use bollard::models::{EventMessage, EventMessageTypeEnum};

/// 생명주기 전이 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEventKind {
    /// 컨테이너 시작됨 (`start` 또는 `running` 액션)
    Started,
    /// 컨테이너 파기됨 (`destroy` 액션)
    Destroyed,
    /// 그 외 액션 — 무시됨
    Other(String),
}

impl LifecycleEventKind {
    fn from_action(action: &str) -> Self {
        // older daemons report "running", current ones "start"
        match action {
            "start" | "running" => Self::Started,
            "destroy" => Self::Destroyed,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Destroyed => write!(f, "destroyed"),
            Self::Other(action) => write!(f, "other({action})"),
        }
    }
}

/// 런타임에서 번역된 컨테이너 생명주기 이벤트
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 전이 종류
    pub kind: LifecycleEventKind,
}

impl LifecycleEvent {
    /// 원시 런타임 이벤트를 번역합니다.
    ///
    /// 컨테이너 이벤트가 아니거나 액터 ID가 없으면 `None`을 반환합니다.
    pub fn from_runtime(msg: &EventMessage) -> Option<Self> {
        if msg.typ != Some(EventMessageTypeEnum::CONTAINER) {
            return None;
        }
        let container_id = msg.actor.as_ref()?.id.clone()?;
        let action = msg.action.as_deref()?;
        Some(Self {
            container_id,
            kind: LifecycleEventKind::from_action(action),
        })
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.kind,
            &self.container_id[..12.min(self.container_id.len())],
        )
    }
}

/// 이벤트 스트림 장애
///
/// 구독 채널과 분리된 장애 채널로 전달됩니다. 수신 측은 같은 필터로
/// 즉시 재구독합니다. 깨끗한 스트림 종료는 장애가 아니라 이벤트 채널
/// 닫힘으로 표현됩니다.
#[derive(Debug, Clone)]
pub struct StreamFault {
    /// 장애 사유
    pub reason: String,
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event stream fault: {}", self.reason)
    }
}
