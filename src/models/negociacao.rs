// src/models/negociacao.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE status_negociacao do banco.
// Os nove estados do funil; FECHADO, PERDIDO e CANCELADO são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_negociacao", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusNegociacao {
    Contato,
    VisitaAgendada,
    VisitaRealizada,
    Proposta,
    AnaliseCredito,
    Contrato,
    Fechado,
    Perdido,
    Cancelado,
}

impl StatusNegociacao {
    /// A tabela de transições do funil. Estados terminais não têm saída.
    pub fn transicoes_permitidas(self) -> &'static [StatusNegociacao] {
        use StatusNegociacao::*;
        match self {
            Contato => &[VisitaAgendada, Perdido, Cancelado],
            VisitaAgendada => &[VisitaRealizada, Contato, Perdido, Cancelado],
            VisitaRealizada => &[Proposta, Contato, Perdido, Cancelado],
            Proposta => &[AnaliseCredito, Contrato, VisitaRealizada, Perdido, Cancelado],
            AnaliseCredito => &[Contrato, Proposta, Perdido, Cancelado],
            Contrato => &[Fechado, Perdido, Cancelado],
            Fechado | Perdido | Cancelado => &[],
        }
    }

    pub fn pode_ir_para(self, destino: StatusNegociacao) -> bool {
        self.transicoes_permitidas().contains(&destino)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fechado | Self::Perdido | Self::Cancelado)
    }

    /// Uma negociação ativa é a que ainda conta para a trava de
    /// unicidade por (lead, imóvel).
    pub const fn is_ativa(self) -> bool {
        !self.is_terminal()
    }

    /// Estados em que a negociação pode ser excluída.
    pub const fn pode_excluir(self) -> bool {
        matches!(self, Self::Contato | Self::Perdido | Self::Cancelado)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contato => "CONTATO",
            Self::VisitaAgendada => "VISITA_AGENDADA",
            Self::VisitaRealizada => "VISITA_REALIZADA",
            Self::Proposta => "PROPOSTA",
            Self::AnaliseCredito => "ANALISE_CREDITO",
            Self::Contrato => "CONTRATO",
            Self::Fechado => "FECHADO",
            Self::Perdido => "PERDIDO",
            Self::Cancelado => "CANCELADO",
        }
    }

    pub const fn todos() -> &'static [StatusNegociacao] {
        use StatusNegociacao::*;
        &[
            Contato,
            VisitaAgendada,
            VisitaRealizada,
            Proposta,
            AnaliseCredito,
            Contrato,
            Fechado,
            Perdido,
            Cancelado,
        ]
    }
}

impl std::fmt::Display for StatusNegociacao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tipo_comissao", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoComissao {
    Captacao,
    Venda,
    Split,
}

// --- TIMELINE (log de eventos) ---

/// Carga de um evento da timeline. O discriminante `tipo` vai junto no JSON
/// persistido, então cada entrada carrega apenas os campos do seu tipo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DadosEvento {
    Criacao {
        descricao: String,
    },
    MudancaStatus {
        status_anterior: StatusNegociacao,
        status_novo: StatusNegociacao,
        descricao: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        motivo_perda: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        valor_fechamento: Option<Decimal>,
    },
    ComissaoAdicionada {
        corretor_id: Uuid,
        percentual: Decimal,
        valor: Decimal,
        tipo_comissao: TipoComissao,
    },
    DocumentoAdicionado {
        nome: String,
        url: String,
    },
}

/// Uma entrada imutável da timeline: `seq` é contínuo e por negociação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventoNegociacao {
    pub seq: i64,
    pub data: DateTime<Utc>,
    #[serde(flatten)]
    pub dados: DadosEvento,
}

// --- COMISSÕES (ledger) ---

// Registro imutável: nunca editado nem removido, apenas anexado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comissao {
    pub corretor_id: Uuid,
    pub percentual: Decimal,
    pub valor: Decimal,
    pub tipo: TipoComissao,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Documento {
    pub nome: String,
    pub url: String,
    pub enviado_em: DateTime<Utc>,
}

// --- AGREGADO ---

/// O agregado de negociação. Possui a timeline e o ledger de comissões;
/// lead, imóvel e corretor entram apenas por referência (ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Negociacao {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_id: Uuid,
    pub imovel_id: Uuid,
    pub corretor_id: Uuid,
    pub status: StatusNegociacao,
    pub valor_proposta: Option<Decimal>,
    pub valor_fechamento: Option<Decimal>,
    pub motivo_perda: Option<String>,
    pub observacoes: Option<String>,
    // Contador de concorrência otimista; incrementa a cada mutação.
    pub versao: i32,
    pub timeline: Vec<EventoNegociacao>,
    pub comissoes: Vec<Comissao>,
    pub documentos: Vec<Documento>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- DTOs ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaNegociacao {
    pub lead_id: Uuid,
    pub imovel_id: Uuid,
    pub corretor_id: Uuid,
    pub valor_proposta: Option<Decimal>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaComissao {
    pub corretor_id: Uuid,
    pub percentual: Decimal,
    pub valor: Decimal,
    pub tipo: TipoComissao,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovoDocumento {
    pub nome: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosNegociacao {
    pub status: Option<StatusNegociacao>,
    pub corretor_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub imovel_id: Option<Uuid>,
}

// --- ESTATÍSTICAS ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContagemStatus {
    pub status: StatusNegociacao,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegociacaoStats {
    pub total: i64,
    pub fechadas: i64,
    pub taxa_conversao: f64,
    pub valor_total: Decimal,
    pub ticket_medio: Decimal,
    pub por_status: Vec<ContagemStatus>,
}
