// src/db/lead_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::{PgConnection, PgPool, FromRow};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::LeadStore,
    models::lead::{
        AtualizacaoLead, ContagemTemperatura, EventoLead, Interesse, Lead, LeadStats, NovoLead,
        OrigemLead, Temperatura, TipoEventoLead,
    },
};

const CAMPOS: &str = "id, tenant_id, nome, email, telefone, cpf, origem, interesse, \
     corretor_id, score, temperatura, created_at, updated_at";

#[derive(FromRow)]
struct LeadRow {
    id: Uuid,
    tenant_id: Uuid,
    nome: String,
    email: Option<String>,
    telefone: String,
    cpf: Option<String>,
    origem: OrigemLead,
    interesse: Option<Value>,
    corretor_id: Option<Uuid>,
    score: i32,
    temperatura: Temperatura,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn carregar(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Lead>, AppError> {
        let sql = format!("SELECT {CAMPOS} FROM leads WHERE id = $1 AND tenant_id = $2");
        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let timeline: Vec<EventoLead> = sqlx::query_as(
            "SELECT seq, data, tipo, descricao, detalhes FROM lead_eventos \
             WHERE lead_id = $1 ORDER BY seq ASC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let interesse: Option<Interesse> = match row.interesse {
            Some(valor) => Some(serde_json::from_value(valor).map_err(anyhow::Error::from)?),
            None => None,
        };

        Ok(Some(Lead {
            id: row.id,
            tenant_id: row.tenant_id,
            nome: row.nome,
            email: row.email,
            telefone: row.telefone,
            cpf: row.cpf,
            origem: row.origem,
            interesse,
            corretor_id: row.corretor_id,
            score: row.score,
            temperatura: row.temperatura,
            timeline,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn inserir_evento(
        conn: &mut PgConnection,
        lead_id: Uuid,
        tenant_id: Uuid,
        tipo: TipoEventoLead,
        descricao: &str,
        detalhes: Option<&Value>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO lead_eventos (lead_id, tenant_id, seq, tipo, descricao, detalhes) \
             VALUES ($1, $2, \
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM lead_eventos WHERE lead_id = $1), \
                     $3, $4, $5)",
        )
        .bind(lead_id)
        .bind(tenant_id)
        .bind(tipo)
        .bind(descricao)
        .bind(detalhes)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Trava a linha do lead na transação corrente, confirmando existência.
    async fn travar(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let linha: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM leads WHERE id = $1 AND tenant_id = $2 FOR UPDATE")
                .bind(id)
                .bind(tenant_id)
                .fetch_optional(&mut *conn)
                .await?;

        linha.map(|_| ()).ok_or(AppError::LeadNotFound)
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: &NovoLead,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        let interesse = match &novo.interesse {
            Some(i) => Some(serde_json::to_value(i).map_err(anyhow::Error::from)?),
            None => None,
        };

        let sql = format!(
            "INSERT INTO leads \
             (tenant_id, nome, email, telefone, cpf, origem, interesse, corretor_id, \
              score, temperatura) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {CAMPOS}"
        );
        let row: LeadRow = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(&novo.nome)
            .bind(novo.email.as_deref())
            .bind(&novo.telefone)
            .bind(novo.cpf.as_deref())
            .bind(novo.origem)
            .bind(interesse)
            .bind(novo.corretor_id)
            .bind(score)
            .bind(temperatura)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::LeadDuplicado;
                    }
                }
                e.into()
            })?;

        Self::inserir_evento(
            &mut tx,
            row.id,
            tenant_id,
            TipoEventoLead::Observacao,
            "Lead criado no sistema",
            Some(&json!({ "origem": novo.origem, "score_inicial": score })),
        )
        .await?;

        let lead = self
            .carregar(&mut tx, tenant_id, row.id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        tx.commit().await?;
        Ok(lead)
    }

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Lead>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.carregar(&mut conn, tenant_id, id).await
    }

    async fn atualizar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        dados: &AtualizacaoLead,
    ) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;

        let interesse = match &dados.interesse {
            Some(i) => Some(serde_json::to_value(i).map_err(anyhow::Error::from)?),
            None => None,
        };

        // COALESCE: campo ausente no DTO mantém o valor atual.
        sqlx::query(
            "UPDATE leads SET \
                 nome = COALESCE($3, nome), \
                 email = COALESCE($4, email), \
                 telefone = COALESCE($5, telefone), \
                 cpf = COALESCE($6, cpf), \
                 origem = COALESCE($7, origem), \
                 interesse = COALESCE($8, interesse), \
                 updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(dados.nome.as_deref())
        .bind(dados.email.as_deref())
        .bind(dados.telefone.as_deref())
        .bind(dados.cpf.as_deref())
        .bind(dados.origem)
        .bind(interesse)
        .execute(&mut *tx)
        .await?;

        let detalhes = serde_json::to_value(dados).map_err(anyhow::Error::from)?;
        Self::inserir_evento(
            &mut tx,
            id,
            tenant_id,
            TipoEventoLead::Observacao,
            "Lead atualizado",
            Some(&detalhes),
        )
        .await?;

        let lead = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        tx.commit().await?;
        Ok(lead)
    }

    async fn atualizar_score(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;

        sqlx::query(
            "UPDATE leads SET score = $3, temperatura = $4, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(score)
        .bind(temperatura)
        .execute(&mut *tx)
        .await?;

        Self::inserir_evento(
            &mut tx,
            id,
            tenant_id,
            TipoEventoLead::Observacao,
            "Score recalculado",
            Some(&json!({ "score": score, "temperatura": temperatura })),
        )
        .await?;

        let lead = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        tx.commit().await?;
        Ok(lead)
    }

    async fn atribuir_corretor(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        corretor_id: Uuid,
    ) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;

        sqlx::query(
            "UPDATE leads SET corretor_id = $3, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(corretor_id)
        .execute(&mut *tx)
        .await?;

        Self::inserir_evento(
            &mut tx,
            id,
            tenant_id,
            TipoEventoLead::Observacao,
            "Lead atribuído ao corretor",
            Some(&json!({ "corretor_id": corretor_id })),
        )
        .await?;

        let lead = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        tx.commit().await?;
        Ok(lead)
    }

    async fn adicionar_evento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        tipo: TipoEventoLead,
        descricao: &str,
        detalhes: Option<Value>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;
        Self::inserir_evento(&mut tx, id, tenant_id, tipo, descricao, detalhes.as_ref()).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn estatisticas(&self, tenant_id: Uuid) -> Result<LeadStats, AppError> {
        let (total, quentes, mornos, frios, sem_corretor): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                        COUNT(*) FILTER (WHERE temperatura = 'QUENTE'), \
                        COUNT(*) FILTER (WHERE temperatura = 'MORNO'), \
                        COUNT(*) FILTER (WHERE temperatura = 'FRIO'), \
                        COUNT(*) FILTER (WHERE corretor_id IS NULL) \
                 FROM leads WHERE tenant_id = $1",
            )
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(LeadStats {
            total,
            por_temperatura: ContagemTemperatura {
                quentes,
                mornos,
                frios,
            },
            sem_corretor,
        })
    }
}
