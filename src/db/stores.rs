// src/db/stores.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        corretor::CorretorResumo,
        imovel::{ImovelResumo, StatusImovel},
        lead::{
            AtualizacaoLead, Lead, LeadStats, NovoLead, Temperatura, TipoEventoLead,
        },
        negociacao::{
            FiltrosNegociacao, Negociacao, NegociacaoStats, NovaComissao, NovaNegociacao,
            NovoDocumento, StatusNegociacao,
        },
    },
};

// =========================================================================
//  COMANDOS DE ESCRITA
// =========================================================================

/// Mudança de status do imóvel que precisa entrar na mesma unidade de
/// gravação da transição (fechamento: VENDIDO ou ALUGADO).
#[derive(Debug, Clone)]
pub struct NovoStatusImovel {
    pub imovel_id: Uuid,
    pub status: StatusImovel,
}

/// Unidade atômica de uma transição de status já validada pelo motor:
/// ou tudo fica visível (status, evento, comissão, imóvel), ou nada.
#[derive(Debug, Clone)]
pub struct TransicaoCommit {
    pub novo_status: StatusNegociacao,
    pub valor_fechamento: Option<Decimal>,
    pub motivo_perda: Option<String>,
    pub descricao: String,
    pub comissao: Option<NovaComissao>,
    pub imovel: Option<NovoStatusImovel>,
}

// =========================================================================
//  STORES (interfaces tenant-scoped injetadas nos services)
// =========================================================================

/// Persistência do agregado de negociação. Toda leitura e escrita é
/// escopada por tenant: uma chave que não pertence ao tenant se comporta
/// como inexistente. Timeline, comissões e documentos são logs append-only
/// (uma linha por evento, ordenada por `seq`); nunca
/// ler-a-lista-toda/alterar/regravar.
#[async_trait]
pub trait NegociacaoStore: Send + Sync {
    /// Insere a negociação em CONTATO com o evento CRIACAO, rejeitando
    /// atomicamente um segundo registro ativo para o mesmo par
    /// (lead, imóvel) com `NegociacaoDuplicada`.
    async fn criar(
        &self,
        tenant_id: Uuid,
        nova: &NovaNegociacao,
    ) -> Result<Negociacao, AppError>;

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Negociacao>, AppError>;

    /// Aplica a transição como uma unidade: checagem de versão
    /// (`ConflitoDeVersao` se `versao_esperada` estiver defasada), novo
    /// status, evento MUDANCA_STATUS, comissão + evento quando presentes e
    /// o novo status do imóvel quando presente. Falhou qualquer parte,
    /// nada é gravado.
    async fn aplicar_transicao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        versao_esperada: i32,
        commit: TransicaoCommit,
    ) -> Result<Negociacao, AppError>;

    /// Anexa um registro ao ledger de comissões e o evento
    /// COMISSAO_ADICIONADA correspondente, na mesma unidade.
    async fn adicionar_comissao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        comissao: &NovaComissao,
    ) -> Result<Negociacao, AppError>;

    async fn adicionar_documento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        documento: &NovoDocumento,
    ) -> Result<Negociacao, AppError>;

    /// Exclui somente em CONTATO/PERDIDO/CANCELADO; caso contrário
    /// `NegociacaoAtiva`. A guarda é aplicada atomicamente no store.
    async fn excluir(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError>;

    /// Agregação somente-leitura; roda sem coordenação com as escritas.
    async fn estatisticas(
        &self,
        tenant_id: Uuid,
        filtros: &FiltrosNegociacao,
    ) -> Result<NegociacaoStats, AppError>;
}

/// Persistência do lead. O score chega pronto do motor de scoring: o
/// store nunca o calcula nem recalcula por conta própria.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insere o lead com o evento inicial na timeline; telefone duplicado
    /// dentro do tenant falha com `LeadDuplicado`.
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: &NovoLead,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError>;

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Lead>, AppError>;

    /// Atualiza campos cadastrais. Não toca em score/temperatura.
    async fn atualizar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        dados: &AtualizacaoLead,
    ) -> Result<Lead, AppError>;

    async fn atualizar_score(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError>;

    async fn atribuir_corretor(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        corretor_id: Uuid,
    ) -> Result<Lead, AppError>;

    async fn adicionar_evento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        tipo: TipoEventoLead,
        descricao: &str,
        detalhes: Option<Value>,
    ) -> Result<(), AppError>;

    async fn estatisticas(&self, tenant_id: Uuid) -> Result<LeadStats, AppError>;
}

/// Colaborador externo: o agregado de imóvel pertence a outro módulo.
/// O motor só lê o resumo e, no fechamento, atualiza o status.
#[async_trait]
pub trait ImovelStore: Send + Sync {
    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImovelResumo>, AppError>;

    async fn atualizar_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: StatusImovel,
    ) -> Result<(), AppError>;
}

/// Colaborador externo: resolve o corretor dentro do tenant e entrega o
/// percentual de comissão padrão usado no fechamento.
#[async_trait]
pub trait CorretorStore: Send + Sync {
    async fn buscar(&self, tenant_id: Uuid, id: Uuid)
        -> Result<Option<CorretorResumo>, AppError>;
}
