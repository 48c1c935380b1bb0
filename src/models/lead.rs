// src/models/lead.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "temperatura_lead", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Temperatura {
    Quente,
    Morno,
    Frio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "origem_lead", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrigemLead {
    Site,
    Portal,
    Indicacao,
    Telefone,
    Whatsapp,
    RedesSociais,
}

// Tipos de evento da timeline do lead (interações registradas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tipo_evento_lead", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoEventoLead {
    Contato,
    Email,
    Whatsapp,
    Ligacao,
    Visita,
    Proposta,
    Observacao,
}

// --- INTERESSE ---

// Perfil de busca do lead. Guardado como JSONB no banco.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaixaPreco {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interesse {
    #[serde(default)]
    pub tipo_imovel: Vec<String>,
    pub faixa_preco: Option<FaixaPreco>,
    #[serde(default)]
    pub localizacao: Vec<String>,
    pub observacoes: Option<String>,
}

impl FaixaPreco {
    pub fn definida(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

// --- TIMELINE ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventoLead {
    pub seq: i64,
    pub data: DateTime<Utc>,
    pub tipo: TipoEventoLead,
    pub descricao: String,
    pub detalhes: Option<Value>,
}

// --- AGREGADO ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub nome: String,
    pub email: Option<String>,
    pub telefone: String,
    pub cpf: Option<String>,
    pub origem: OrigemLead,
    pub interesse: Option<Interesse>,
    pub corretor_id: Option<Uuid>,
    // Calculado uma única vez na criação; updates posteriores não recalculam.
    pub score: i32,
    pub temperatura: Temperatura,
    pub timeline: Vec<EventoLead>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- DTOs ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NovoLead {
    #[validate(length(min = 3, max = 100, message = "Nome deve ter entre 3 e 100 caracteres"))]
    pub nome: String,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    pub telefone: String,
    pub cpf: Option<String>,
    pub origem: OrigemLead,
    pub interesse: Option<Interesse>,
    pub corretor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtualizacaoLead {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub origem: Option<OrigemLead>,
    pub interesse: Option<Interesse>,
}

// --- ESTATÍSTICAS ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContagemTemperatura {
    pub quentes: i64,
    pub mornos: i64,
    pub frios: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total: i64,
    pub por_temperatura: ContagemTemperatura,
    pub sem_corretor: i64,
}
