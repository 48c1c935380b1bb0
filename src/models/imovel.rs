// src/models/imovel.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// O agregado de imóvel pertence a outro módulo do sistema; aqui só
// circulam o resumo e os enums de status/categoria que o motor de
// negociações precisa consultar e, no fechamento, atualizar.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_imovel", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusImovel {
    Disponivel,
    Reservado,
    Vendido,
    Alugado,
    Inativo,
    Manutencao,
}

impl StatusImovel {
    /// VENDIDO e ALUGADO encerram o imóvel para novas negociações.
    pub const fn negociavel(self) -> bool {
        !matches!(self, Self::Vendido | Self::Alugado)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "categoria_imovel", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoriaImovel {
    Venda,
    Locacao,
    Temporada,
}

impl CategoriaImovel {
    /// Status final do imóvel quando a negociação fecha.
    pub const fn status_ao_fechar(self) -> StatusImovel {
        match self {
            Self::Venda => StatusImovel::Vendido,
            Self::Locacao | Self::Temporada => StatusImovel::Alugado,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImovelResumo {
    pub id: Uuid,
    pub status: StatusImovel,
    pub categoria: CategoriaImovel,
}
