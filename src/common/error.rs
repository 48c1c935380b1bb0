use thiserror::Error;

use crate::models::negociacao::StatusNegociacao;

/// Classes de erro que o chamador (controller, CLI, scheduler) usa para
/// decidir a tradução externa. Espelha a taxonomia do núcleo: entrada
/// malformada, registro ausente, conflito de estado ou falha de dependência.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoriaErro {
    Validacao,
    NaoEncontrado,
    Conflito,
    Dependencia,
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Valor inválido: {0}")]
    ValorInvalido(String),

    #[error("Lead não encontrado")]
    LeadNotFound,

    #[error("Imóvel não encontrado")]
    ImovelNotFound,

    #[error("Corretor não encontrado")]
    CorretorNotFound,

    #[error("Negociação não encontrada")]
    NegociacaoNotFound,

    #[error("Imóvel não está disponível para negociação")]
    ImovelIndisponivel,

    #[error("Já existe uma negociação ativa para este lead e imóvel")]
    NegociacaoDuplicada,

    #[error("Transição de status inválida: {de} -> {para}")]
    TransicaoInvalida {
        de: StatusNegociacao,
        para: StatusNegociacao,
    },

    #[error("Motivo da perda é obrigatório ao marcar como PERDIDO")]
    MotivoPerdaObrigatorio,

    #[error("Valor de fechamento é obrigatório ao marcar como FECHADO")]
    ValorFechamentoObrigatorio,

    #[error("Negociação ativa não pode ser excluída")]
    NegociacaoAtiva,

    #[error("A negociação foi alterada por outra operação; tente novamente")]
    ConflitoDeVersao,

    #[error("Já existe um lead com este telefone")]
    LeadDuplicado,

    #[error("Lead já está atribuído a este corretor")]
    CorretorJaAtribuido,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn categoria(&self) -> CategoriaErro {
        match self {
            AppError::ValidationError(_)
            | AppError::ValorInvalido(_)
            | AppError::MotivoPerdaObrigatorio
            | AppError::ValorFechamentoObrigatorio => CategoriaErro::Validacao,

            AppError::LeadNotFound
            | AppError::ImovelNotFound
            | AppError::CorretorNotFound
            | AppError::NegociacaoNotFound => CategoriaErro::NaoEncontrado,

            AppError::ImovelIndisponivel
            | AppError::NegociacaoDuplicada
            | AppError::TransicaoInvalida { .. }
            | AppError::NegociacaoAtiva
            | AppError::ConflitoDeVersao
            | AppError::LeadDuplicado
            | AppError::CorretorJaAtribuido => CategoriaErro::Conflito,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                CategoriaErro::Dependencia
            }
        }
    }

    /// Conflitos (incluindo a disputa de versão) são passíveis de retry
    /// pelo chamador; os demais não.
    pub fn is_conflito(&self) -> bool {
        self.categoria() == CategoriaErro::Conflito
    }
}
