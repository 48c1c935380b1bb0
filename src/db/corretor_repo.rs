// src/db/corretor_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError, db::stores::CorretorStore, models::corretor::CorretorResumo,
};

#[derive(Clone)]
pub struct CorretorRepository {
    pool: PgPool,
}

impl CorretorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorretorStore for CorretorRepository {
    async fn buscar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CorretorResumo>, AppError> {
        let corretor = sqlx::query_as::<_, CorretorResumo>(
            "SELECT id, nome, comissao_padrao FROM corretores \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(corretor)
    }
}
