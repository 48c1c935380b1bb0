// src/services/negociacao_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::{
        CorretorStore, ImovelStore, LeadStore, NegociacaoStore, NovoStatusImovel,
        TransicaoCommit,
    },
    models::negociacao::{
        FiltrosNegociacao, Negociacao, NegociacaoStats, NovaComissao, NovaNegociacao,
        NovoDocumento, StatusNegociacao, TipoComissao,
    },
    services::comissao,
};

/// O motor do funil de negociações. Valida contra a máquina de estados,
/// consulta os agregados vizinhos (lead, imóvel, corretor) e grava pelo
/// store em unidades atômicas. A checagem de versão no store resolve a
/// disputa de dois escritores sobre a mesma negociação.
#[derive(Clone)]
pub struct NegociacaoService {
    negociacoes: Arc<dyn NegociacaoStore>,
    leads: Arc<dyn LeadStore>,
    imoveis: Arc<dyn ImovelStore>,
    corretores: Arc<dyn CorretorStore>,
}

impl NegociacaoService {
    pub fn new(
        negociacoes: Arc<dyn NegociacaoStore>,
        leads: Arc<dyn LeadStore>,
        imoveis: Arc<dyn ImovelStore>,
        corretores: Arc<dyn CorretorStore>,
    ) -> Self {
        Self {
            negociacoes,
            leads,
            imoveis,
            corretores,
        }
    }

    pub async fn criar(
        &self,
        tenant_id: Uuid,
        nova: NovaNegociacao,
    ) -> Result<Negociacao, AppError> {
        if let Some(valor) = nova.valor_proposta {
            if valor <= Decimal::ZERO {
                return Err(AppError::ValorInvalido(
                    "valor da proposta deve ser positivo".to_string(),
                ));
            }
        }

        self.leads
            .buscar(tenant_id, nova.lead_id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        let imovel = self
            .imoveis
            .buscar(tenant_id, nova.imovel_id)
            .await?
            .ok_or(AppError::ImovelNotFound)?;
        if !imovel.status.negociavel() {
            return Err(AppError::ImovelIndisponivel);
        }

        self.corretores
            .buscar(tenant_id, nova.corretor_id)
            .await?
            .ok_or(AppError::CorretorNotFound)?;

        // O índice de unicidade do store fecha a corrida de duas criações
        // simultâneas para o mesmo par (lead, imóvel).
        let negociacao = self.negociacoes.criar(tenant_id, &nova).await?;

        tracing::info!(
            negociacao_id = %negociacao.id,
            lead_id = %nova.lead_id,
            imovel_id = %nova.imovel_id,
            "negociação criada"
        );

        Ok(negociacao)
    }

    pub async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Negociacao, AppError> {
        self.negociacoes
            .buscar(tenant_id, id)
            .await?
            .ok_or(AppError::NegociacaoNotFound)
    }

    /// Move a negociação pelo funil. No fechamento, calcula a comissão do
    /// corretor e vira o status do imóvel na mesma unidade de gravação.
    pub async fn mudar_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        destino: StatusNegociacao,
        motivo_perda: Option<String>,
        valor_fechamento: Option<Decimal>,
    ) -> Result<Negociacao, AppError> {
        let negociacao = self.buscar(tenant_id, id).await?;

        if !negociacao.status.pode_ir_para(destino) {
            return Err(AppError::TransicaoInvalida {
                de: negociacao.status,
                para: destino,
            });
        }

        if destino == StatusNegociacao::Perdido && motivo_perda.is_none() {
            return Err(AppError::MotivoPerdaObrigatorio);
        }

        if let Some(valor) = valor_fechamento {
            if valor <= Decimal::ZERO {
                return Err(AppError::ValorInvalido(
                    "valor de fechamento deve ser positivo".to_string(),
                ));
            }
        }

        let mut commit = TransicaoCommit {
            novo_status: destino,
            valor_fechamento: None,
            motivo_perda: if destino == StatusNegociacao::Perdido {
                motivo_perda
            } else {
                None
            },
            descricao: format!("Status alterado para {destino}"),
            comissao: None,
            imovel: None,
        };

        if destino == StatusNegociacao::Fechado {
            let valor_final = valor_fechamento
                .or(negociacao.valor_proposta)
                .ok_or(AppError::ValorFechamentoObrigatorio)?;

            let corretor = self
                .corretores
                .buscar(tenant_id, negociacao.corretor_id)
                .await?
                .ok_or(AppError::CorretorNotFound)?;

            let valor_comissao = comissao::calcular(valor_final, corretor.comissao_padrao)?;

            let imovel = self
                .imoveis
                .buscar(tenant_id, negociacao.imovel_id)
                .await?
                .ok_or(AppError::ImovelNotFound)?;

            commit.valor_fechamento = Some(valor_final);
            commit.comissao = Some(NovaComissao {
                corretor_id: negociacao.corretor_id,
                percentual: corretor.comissao_padrao,
                valor: valor_comissao,
                tipo: TipoComissao::Venda,
            });
            commit.imovel = Some(NovoStatusImovel {
                imovel_id: negociacao.imovel_id,
                status: imovel.categoria.status_ao_fechar(),
            });

            tracing::info!(
                negociacao_id = %id,
                valor_fechamento = %valor_final,
                comissao = %valor_comissao,
                "fechando negociação"
            );
        }

        // A versão lida acima vai junto: se outro escritor passou na
        // frente, o store devolve ConflitoDeVersao e nada é gravado.
        self.negociacoes
            .aplicar_transicao(tenant_id, id, negociacao.versao, commit)
            .await
    }

    pub async fn adicionar_comissao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        comissao: NovaComissao,
    ) -> Result<Negociacao, AppError> {
        if comissao.percentual < Decimal::ZERO || comissao.percentual > Decimal::ONE_HUNDRED {
            return Err(AppError::ValorInvalido(
                "percentual deve estar entre 0 e 100".to_string(),
            ));
        }
        if comissao.valor < Decimal::ZERO {
            return Err(AppError::ValorInvalido(
                "valor da comissão não pode ser negativo".to_string(),
            ));
        }

        self.buscar(tenant_id, id).await?;

        self.corretores
            .buscar(tenant_id, comissao.corretor_id)
            .await?
            .ok_or(AppError::CorretorNotFound)?;

        self.negociacoes
            .adicionar_comissao(tenant_id, id, &comissao)
            .await
    }

    pub async fn adicionar_documento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        documento: NovoDocumento,
    ) -> Result<Negociacao, AppError> {
        self.buscar(tenant_id, id).await?;

        self.negociacoes
            .adicionar_documento(tenant_id, id, &documento)
            .await
    }

    /// Exclusão só em CONTATO/PERDIDO/CANCELADO. A checagem aqui dá o erro
    /// certo ao chamador; a guarda definitiva é a do store.
    pub async fn excluir(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let negociacao = self.buscar(tenant_id, id).await?;

        if !negociacao.status.pode_excluir() {
            return Err(AppError::NegociacaoAtiva);
        }

        self.negociacoes.excluir(tenant_id, id).await
    }

    pub async fn estatisticas(
        &self,
        tenant_id: Uuid,
        filtros: FiltrosNegociacao,
    ) -> Result<NegociacaoStats, AppError> {
        self.negociacoes.estatisticas(tenant_id, &filtros).await
    }
}
