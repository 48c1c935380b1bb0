// src/services/notificacao.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{common::error::AppError, models::lead::Lead};

/// Canal de aviso ao corretor quando um lead é atribuído a ele. O envio é
/// um canal lateral: roda depois do commit e a falha nunca volta para o
/// chamador, pois o contrato do motor não depende dele.
#[async_trait]
pub trait Notificador: Send + Sync {
    async fn notificar_atribuicao(
        &self,
        tenant_id: Uuid,
        corretor_id: Uuid,
        lead: &Lead,
    ) -> Result<(), AppError>;
}

/// Implementação padrão: apenas registra no log. As integrações reais
/// (Telegram, WhatsApp) implementam o trait nos seus próprios módulos.
#[derive(Debug, Clone, Default)]
pub struct NotificadorLog;

#[async_trait]
impl Notificador for NotificadorLog {
    async fn notificar_atribuicao(
        &self,
        tenant_id: Uuid,
        corretor_id: Uuid,
        lead: &Lead,
    ) -> Result<(), AppError> {
        tracing::info!(
            %tenant_id,
            %corretor_id,
            lead_id = %lead.id,
            "lead atribuído ao corretor"
        );
        Ok(())
    }
}
