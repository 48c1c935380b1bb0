// src/models/corretor.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Resumo do corretor, suficiente para o motor de negociações:
// existência dentro do tenant e o percentual de comissão padrão.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CorretorResumo {
    pub id: Uuid,
    pub nome: String,
    pub comissao_padrao: Decimal,
}
