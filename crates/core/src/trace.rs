//! Trace callback contract, the core's one user-visible logging surface.
//!
//! Every endpoint also mirrors the same event through `log`'s macros under
//! a `rohc::comp` / `rohc::decomp` target, so a host that only installs a
//! `log` backend (`env_logger`, `simple_logger`) sees traces for free
//! without implementing [`TraceHandler`].

use crate::profile::ProfileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Comp,
    Decomp,
}

#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub level: TraceLevel,
    pub entity: Entity,
    pub profile_id: Option<ProfileId>,
    pub message: String,
}

/// Receives trace events as they are produced, synchronously, on the
/// calling thread — the core never invokes this from anywhere else.
///
/// Default methods are no-ops so implementors only override what they
/// actually consume.
pub trait TraceHandler: Send + Sync {
    #[allow(unused_variables)]
    fn on_trace(&self, event: &TraceEvent) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceHandler;

impl TraceHandler for NullTraceHandler {}

pub(crate) fn emit(
    handler: &dyn TraceHandler,
    level: TraceLevel,
    entity: Entity,
    profile_id: Option<ProfileId>,
    message: impl Into<String>,
) {
    let event = TraceEvent {
        level,
        entity,
        profile_id,
        message: message.into(),
    };

    let target = match entity {
        Entity::Comp => "rohc::comp",
        Entity::Decomp => "rohc::decomp",
    };

    match event.level {
        TraceLevel::Debug => log::debug!(target: target, "{}", event.message),
        TraceLevel::Info | TraceLevel::Notice => log::info!(target: target, "{}", event.message),
        TraceLevel::Warning => log::warn!(target: target, "{}", event.message),
        TraceLevel::Error => log::error!(target: target, "{}", event.message),
    }

    handler.on_trace(&event);
}
