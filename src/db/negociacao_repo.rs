// src/db/negociacao_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, FromRow};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::{NegociacaoStore, TransicaoCommit},
    models::negociacao::{
        Comissao, ContagemStatus, DadosEvento, Documento, EventoNegociacao, FiltrosNegociacao,
        Negociacao, NegociacaoStats, NovaComissao, NovaNegociacao, NovoDocumento,
        StatusNegociacao,
    },
};

// Colunas escalares do agregado, na ordem da NegociacaoRow.
const CAMPOS: &str = "id, tenant_id, lead_id, imovel_id, corretor_id, status, \
     valor_proposta, valor_fechamento, motivo_perda, observacoes, versao, \
     created_at, updated_at";

#[derive(FromRow)]
struct NegociacaoRow {
    id: Uuid,
    tenant_id: Uuid,
    lead_id: Uuid,
    imovel_id: Uuid,
    corretor_id: Uuid,
    status: StatusNegociacao,
    valor_proposta: Option<Decimal>,
    valor_fechamento: Option<Decimal>,
    motivo_perda: Option<String>,
    observacoes: Option<String>,
    versao: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct EventoRow {
    seq: i64,
    data: DateTime<Utc>,
    dados: Value,
}

#[derive(Clone)]
pub struct NegociacaoRepository {
    pool: PgPool,
}

impl NegociacaoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Monta o agregado completo (linha + logs) em uma conexão já aberta,
    /// para que a leitura pós-escrita enxergue a própria transação.
    async fn carregar(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Negociacao>, AppError> {
        let sql = format!("SELECT {CAMPOS} FROM negociacoes WHERE id = $1 AND tenant_id = $2");
        let row: Option<NegociacaoRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let eventos: Vec<EventoRow> = sqlx::query_as(
            "SELECT seq, data, dados FROM negociacao_eventos \
             WHERE negociacao_id = $1 ORDER BY seq ASC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let mut timeline = Vec::with_capacity(eventos.len());
        for evento in eventos {
            let dados: DadosEvento =
                serde_json::from_value(evento.dados).map_err(anyhow::Error::from)?;
            timeline.push(EventoNegociacao {
                seq: evento.seq,
                data: evento.data,
                dados,
            });
        }

        let comissoes: Vec<Comissao> = sqlx::query_as(
            "SELECT corretor_id, percentual, valor, tipo, created_at \
             FROM negociacao_comissoes WHERE negociacao_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let documentos: Vec<Documento> = sqlx::query_as(
            "SELECT nome, url, enviado_em FROM negociacao_documentos \
             WHERE negociacao_id = $1 ORDER BY enviado_em ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(Negociacao {
            id: row.id,
            tenant_id: row.tenant_id,
            lead_id: row.lead_id,
            imovel_id: row.imovel_id,
            corretor_id: row.corretor_id,
            status: row.status,
            valor_proposta: row.valor_proposta,
            valor_fechamento: row.valor_fechamento,
            motivo_perda: row.motivo_perda,
            observacoes: row.observacoes,
            versao: row.versao,
            timeline,
            comissoes,
            documentos,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Append no log de eventos: uma linha por evento, `seq` contínuo por
    /// negociação. O chamador garante a serialização (linha da negociação
    /// travada na mesma transação).
    async fn inserir_evento(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        negociacao_id: Uuid,
        dados: &DadosEvento,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_value(dados).map_err(anyhow::Error::from)?;
        sqlx::query(
            "INSERT INTO negociacao_eventos (negociacao_id, tenant_id, seq, dados) \
             VALUES ($1, $2, \
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM negociacao_eventos \
                      WHERE negociacao_id = $1), \
                     $3)",
        )
        .bind(negociacao_id)
        .bind(tenant_id)
        .bind(payload)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn inserir_comissao(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        negociacao_id: Uuid,
        comissao: &NovaComissao,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO negociacao_comissoes \
             (negociacao_id, tenant_id, corretor_id, percentual, valor, tipo) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(negociacao_id)
        .bind(tenant_id)
        .bind(comissao.corretor_id)
        .bind(comissao.percentual)
        .bind(comissao.valor)
        .bind(comissao.tipo)
        .execute(&mut *conn)
        .await?;

        Self::inserir_evento(
            conn,
            tenant_id,
            negociacao_id,
            &DadosEvento::ComissaoAdicionada {
                corretor_id: comissao.corretor_id,
                percentual: comissao.percentual,
                valor: comissao.valor,
                tipo_comissao: comissao.tipo,
            },
        )
        .await
    }

    /// Trava a linha da negociação dentro da transação corrente e devolve
    /// (status, versao). Serializa os anexadores concorrentes.
    async fn travar(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<(StatusNegociacao, i32), AppError> {
        let linha: Option<(StatusNegociacao, i32)> = sqlx::query_as(
            "SELECT status, versao FROM negociacoes \
             WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        linha.ok_or(AppError::NegociacaoNotFound)
    }
}

#[async_trait]
impl NegociacaoStore for NegociacaoRepository {
    async fn criar(
        &self,
        tenant_id: Uuid,
        nova: &NovaNegociacao,
    ) -> Result<Negociacao, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO negociacoes \
             (tenant_id, lead_id, imovel_id, corretor_id, valor_proposta, observacoes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {CAMPOS}"
        );
        let row: NegociacaoRow = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(nova.lead_id)
            .bind(nova.imovel_id)
            .bind(nova.corretor_id)
            .bind(nova.valor_proposta)
            .bind(nova.observacoes.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                // O índice parcial de unicidade transforma a corrida de dois
                // `criar` simultâneos em violação de chave.
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::NegociacaoDuplicada;
                    }
                }
                e.into()
            })?;

        Self::inserir_evento(
            &mut tx,
            tenant_id,
            row.id,
            &DadosEvento::Criacao {
                descricao: "Negociação iniciada".to_string(),
            },
        )
        .await?;

        let negociacao = self
            .carregar(&mut tx, tenant_id, row.id)
            .await?
            .ok_or(AppError::NegociacaoNotFound)?;

        tx.commit().await?;
        Ok(negociacao)
    }

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Negociacao>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.carregar(&mut conn, tenant_id, id).await
    }

    async fn aplicar_transicao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        versao_esperada: i32,
        commit: TransicaoCommit,
    ) -> Result<Negociacao, AppError> {
        let mut tx = self.pool.begin().await?;

        let (status_anterior, versao) = Self::travar(&mut tx, tenant_id, id).await?;
        if versao != versao_esperada {
            // O motor validou contra um estado que já não existe.
            return Err(AppError::ConflitoDeVersao);
        }

        sqlx::query(
            "UPDATE negociacoes SET \
                 status = $1, \
                 valor_fechamento = COALESCE($2, valor_fechamento), \
                 motivo_perda = COALESCE($3, motivo_perda), \
                 versao = versao + 1, \
                 updated_at = NOW() \
             WHERE id = $4 AND tenant_id = $5",
        )
        .bind(commit.novo_status)
        .bind(commit.valor_fechamento)
        .bind(commit.motivo_perda.as_deref())
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        Self::inserir_evento(
            &mut tx,
            tenant_id,
            id,
            &DadosEvento::MudancaStatus {
                status_anterior,
                status_novo: commit.novo_status,
                descricao: commit.descricao.clone(),
                motivo_perda: commit.motivo_perda.clone(),
                valor_fechamento: commit.valor_fechamento,
            },
        )
        .await?;

        if let Some(comissao) = &commit.comissao {
            Self::inserir_comissao(&mut tx, tenant_id, id, comissao).await?;
        }

        if let Some(imovel) = &commit.imovel {
            // Mesma unidade de gravação: se o imóvel sumiu, nada é
            // commitado.
            let afetadas = sqlx::query(
                "UPDATE imoveis SET status = $1, updated_at = NOW() \
                 WHERE id = $2 AND tenant_id = $3",
            )
            .bind(imovel.status)
            .bind(imovel.imovel_id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if afetadas == 0 {
                return Err(AppError::ImovelNotFound);
            }
        }

        let negociacao = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::NegociacaoNotFound)?;

        tx.commit().await?;

        tracing::info!(
            negociacao_id = %id,
            de = %status_anterior,
            para = %commit.novo_status,
            "transição aplicada"
        );

        Ok(negociacao)
    }

    async fn adicionar_comissao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        comissao: &NovaComissao,
    ) -> Result<Negociacao, AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;
        Self::inserir_comissao(&mut tx, tenant_id, id, comissao).await?;

        sqlx::query(
            "UPDATE negociacoes SET versao = versao + 1, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        let negociacao = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::NegociacaoNotFound)?;

        tx.commit().await?;
        Ok(negociacao)
    }

    async fn adicionar_documento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        documento: &NovoDocumento,
    ) -> Result<Negociacao, AppError> {
        let mut tx = self.pool.begin().await?;

        Self::travar(&mut tx, tenant_id, id).await?;

        sqlx::query(
            "INSERT INTO negociacao_documentos (negociacao_id, tenant_id, nome, url) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&documento.nome)
        .bind(&documento.url)
        .execute(&mut *tx)
        .await?;

        Self::inserir_evento(
            &mut tx,
            tenant_id,
            id,
            &DadosEvento::DocumentoAdicionado {
                nome: documento.nome.clone(),
                url: documento.url.clone(),
            },
        )
        .await?;

        sqlx::query(
            "UPDATE negociacoes SET versao = versao + 1, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        let negociacao = self
            .carregar(&mut tx, tenant_id, id)
            .await?
            .ok_or(AppError::NegociacaoNotFound)?;

        tx.commit().await?;
        Ok(negociacao)
    }

    async fn excluir(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        // A guarda de status vai na própria query; os logs caem por
        // ON DELETE CASCADE.
        let afetadas = sqlx::query(
            "DELETE FROM negociacoes \
             WHERE id = $1 AND tenant_id = $2 \
               AND status IN ('CONTATO', 'PERDIDO', 'CANCELADO')",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if afetadas > 0 {
            return Ok(());
        }

        // Distingue "não existe" de "existe mas está ativa".
        let existe: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM negociacoes WHERE id = $1 AND tenant_id = $2")
                .bind(id)
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;

        match existe {
            Some(_) => Err(AppError::NegociacaoAtiva),
            None => Err(AppError::NegociacaoNotFound),
        }
    }

    async fn estatisticas(
        &self,
        tenant_id: Uuid,
        filtros: &FiltrosNegociacao,
    ) -> Result<NegociacaoStats, AppError> {
        let totais: (i64, i64, Option<Decimal>, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'FECHADO'), \
                    SUM(valor_fechamento) FILTER (WHERE status = 'FECHADO'), \
                    AVG(valor_fechamento) FILTER (WHERE status = 'FECHADO') \
             FROM negociacoes \
             WHERE tenant_id = $1 \
               AND ($2::status_negociacao IS NULL OR status = $2) \
               AND ($3::uuid IS NULL OR corretor_id = $3) \
               AND ($4::uuid IS NULL OR lead_id = $4) \
               AND ($5::uuid IS NULL OR imovel_id = $5)",
        )
        .bind(tenant_id)
        .bind(filtros.status)
        .bind(filtros.corretor_id)
        .bind(filtros.lead_id)
        .bind(filtros.imovel_id)
        .fetch_one(&self.pool)
        .await?;

        let contagens: Vec<(StatusNegociacao, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) \
             FROM negociacoes \
             WHERE tenant_id = $1 \
               AND ($2::status_negociacao IS NULL OR status = $2) \
               AND ($3::uuid IS NULL OR corretor_id = $3) \
               AND ($4::uuid IS NULL OR lead_id = $4) \
               AND ($5::uuid IS NULL OR imovel_id = $5) \
             GROUP BY status",
        )
        .bind(tenant_id)
        .bind(filtros.status)
        .bind(filtros.corretor_id)
        .bind(filtros.lead_id)
        .bind(filtros.imovel_id)
        .fetch_all(&self.pool)
        .await?;

        let (total, fechadas, valor_total, ticket_medio) = totais;
        let taxa_conversao = if total > 0 {
            ((fechadas as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(NegociacaoStats {
            total,
            fechadas,
            taxa_conversao,
            valor_total: valor_total.unwrap_or_default(),
            ticket_medio: ticket_medio.unwrap_or_default().round_dp(2),
            por_status: contagens
                .into_iter()
                .map(|(status, total)| ContagemStatus { status, total })
                .collect(),
        })
    }
}
