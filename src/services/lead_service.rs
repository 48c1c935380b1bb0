// src/services/lead_service.rs

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::stores::{CorretorStore, LeadStore},
    models::lead::{AtualizacaoLead, Lead, LeadStats, NovoLead, TipoEventoLead},
    services::{
        notificacao::Notificador,
        scoring::{self, PerfilScoring},
    },
};

#[derive(Clone)]
pub struct LeadService {
    leads: Arc<dyn LeadStore>,
    corretores: Arc<dyn CorretorStore>,
    notificador: Arc<dyn Notificador>,
}

impl LeadService {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        corretores: Arc<dyn CorretorStore>,
        notificador: Arc<dyn Notificador>,
    ) -> Self {
        Self {
            leads,
            corretores,
            notificador,
        }
    }

    /// Cria o lead pontuando UMA vez, com os atributos conhecidos agora.
    /// Updates posteriores não repontuam (ver `recalcular_score`).
    pub async fn criar(&self, tenant_id: Uuid, novo: NovoLead) -> Result<Lead, AppError> {
        novo.validate()?;
        validar_telefone(&novo.telefone)?;

        if let Some(corretor_id) = novo.corretor_id {
            self.corretores
                .buscar(tenant_id, corretor_id)
                .await?
                .ok_or(AppError::CorretorNotFound)?;
        }

        let score = scoring::calcular_score(&PerfilScoring::from(&novo));
        let temperatura = scoring::classificar_temperatura(score);

        let lead = self.leads.criar(tenant_id, &novo, score, temperatura).await?;

        tracing::info!(
            lead_id = %lead.id,
            score,
            temperatura = ?temperatura,
            "lead criado"
        );

        Ok(lead)
    }

    pub async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Lead, AppError> {
        self.leads
            .buscar(tenant_id, id)
            .await?
            .ok_or(AppError::LeadNotFound)
    }

    /// Atualização cadastral. Mesmo que os campos alterados alimentem a
    /// fórmula de score, aqui nada é repontuado.
    pub async fn atualizar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        dados: AtualizacaoLead,
    ) -> Result<Lead, AppError> {
        if let Some(telefone) = &dados.telefone {
            validar_telefone(telefone)?;
        }
        self.leads.atualizar(tenant_id, id, &dados).await
    }

    /// Repontuação explícita, a pedido do chamador.
    pub async fn recalcular_score(&self, tenant_id: Uuid, id: Uuid) -> Result<Lead, AppError> {
        let lead = self.buscar(tenant_id, id).await?;

        let score = scoring::calcular_score(&PerfilScoring::from(&lead));
        let temperatura = scoring::classificar_temperatura(score);

        self.leads
            .atualizar_score(tenant_id, id, score, temperatura)
            .await
    }

    /// Atribui o corretor e dispara o aviso best-effort DEPOIS da gravação:
    /// a falha do canal é registrada e engolida.
    pub async fn atribuir_corretor(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        corretor_id: Uuid,
    ) -> Result<Lead, AppError> {
        let lead = self.buscar(tenant_id, id).await?;

        if lead.corretor_id == Some(corretor_id) {
            return Err(AppError::CorretorJaAtribuido);
        }

        self.corretores
            .buscar(tenant_id, corretor_id)
            .await?
            .ok_or(AppError::CorretorNotFound)?;

        let atualizado = self
            .leads
            .atribuir_corretor(tenant_id, id, corretor_id)
            .await?;

        if let Err(erro) = self
            .notificador
            .notificar_atribuicao(tenant_id, corretor_id, &atualizado)
            .await
        {
            tracing::warn!(
                lead_id = %id,
                %corretor_id,
                erro = %erro,
                "falha ao notificar corretor; atribuição mantida"
            );
        }

        Ok(atualizado)
    }

    pub async fn adicionar_evento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        tipo: TipoEventoLead,
        descricao: &str,
        detalhes: Option<Value>,
    ) -> Result<(), AppError> {
        self.leads
            .adicionar_evento(tenant_id, id, tipo, descricao, detalhes)
            .await
    }

    pub async fn estatisticas(&self, tenant_id: Uuid) -> Result<LeadStats, AppError> {
        self.leads.estatisticas(tenant_id).await
    }
}

/// Telefone brasileiro: 10 ou 11 dígitos, sem máscara.
fn validar_telefone(telefone: &str) -> Result<(), AppError> {
    let digitos = telefone.len();
    if !(10..=11).contains(&digitos) || !telefone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::ValorInvalido(
            "telefone deve ter 10 ou 11 dígitos".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telefone_valido() {
        assert!(validar_telefone("1199998888").is_ok());
        assert!(validar_telefone("11999988887").is_ok());
    }

    #[test]
    fn telefone_invalido() {
        assert!(validar_telefone("123").is_err());
        assert!(validar_telefone("11 99998-888").is_err());
        assert!(validar_telefone("119999888877").is_err());
    }
}
