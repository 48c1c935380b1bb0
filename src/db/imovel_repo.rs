// src/db/imovel_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::ImovelStore,
    models::imovel::{ImovelResumo, StatusImovel},
};

// Leitura do agregado de imóvel, que pertence a outro módulo do sistema.
// Aqui só entra o que o motor de negociações consome.
#[derive(Clone)]
pub struct ImovelRepository {
    pool: PgPool,
}

impl ImovelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImovelStore for ImovelRepository {
    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImovelResumo>, AppError> {
        let imovel = sqlx::query_as::<_, ImovelResumo>(
            "SELECT id, status, categoria FROM imoveis WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(imovel)
    }

    async fn atualizar_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: StatusImovel,
    ) -> Result<(), AppError> {
        let afetadas = sqlx::query(
            "UPDATE imoveis SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND tenant_id = $3",
        )
        .bind(status)
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if afetadas == 0 {
            return Err(AppError::ImovelNotFound);
        }
        Ok(())
    }
}
