//! Shared state for API handlers.

use crate::auth::CredentialGate;
use crate::chat::TurnPipeline;
use crate::config::{Config, InterfaceConfig};
use crate::conversation::ClipboardWidget;
use crate::error::Result;
use crate::llm::traits::CompletionClientDyn;
use crate::session::SessionManager;

use std::sync::Arc;
use std::time::Instant;

/// Everything a handler needs, built once at startup.
pub struct ApiState {
    pub started_at: Instant,
    pub gate: CredentialGate,
    pub sessions: SessionManager,
    pub pipeline: TurnPipeline,
    pub interface: InterfaceConfig,
    pub clipboard: ClipboardWidget,
}

impl ApiState {
    pub fn new(config: &Config, client: Arc<dyn CompletionClientDyn>) -> Result<Self> {
        Ok(Self {
            started_at: Instant::now(),
            gate: CredentialGate::new(config.auth.password.clone()),
            sessions: SessionManager::new(&config.session),
            pipeline: TurnPipeline::new(config.persona.clone(), config.llm.model.clone(), client),
            interface: config.interface.clone(),
            clipboard: ClipboardWidget::new(config.interface.clipboard.clone())?,
        })
    }
}
