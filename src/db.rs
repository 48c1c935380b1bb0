pub mod stores;
pub use stores::{
    CorretorStore, ImovelStore, LeadStore, NegociacaoStore, NovoStatusImovel, TransicaoCommit,
};
pub mod negociacao_repo;
pub use negociacao_repo::NegociacaoRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod imovel_repo;
pub use imovel_repo::ImovelRepository;
pub mod corretor_repo;
pub use corretor_repo::CorretorRepository;
pub mod memoria;
pub use memoria::BancoMemoria;

use crate::common::error::AppError;

/// Roda as migrações embutidas (diretório `migrations/`).
pub async fn executar_migracoes(pool: &sqlx::PgPool) -> Result<(), AppError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    Ok(())
}
