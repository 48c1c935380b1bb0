// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CorretorRepository, ImovelRepository, LeadRepository, NegociacaoRepository},
    services::{LeadService, NegociacaoService, NotificadorLog},
};

/// O estado compartilhado da aplicação: a pool e o gráfico de serviços já
/// montado sobre os repositórios Postgres.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub negociacao_service: NegociacaoService,
    pub lead_service: LeadService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::com_pool(db_pool))
    }

    /// Monta o gráfico de dependências sobre uma pool já aberta.
    pub fn com_pool(db_pool: PgPool) -> Self {
        let negociacao_repo = Arc::new(NegociacaoRepository::new(db_pool.clone()));
        let lead_repo = Arc::new(LeadRepository::new(db_pool.clone()));
        let imovel_repo = Arc::new(ImovelRepository::new(db_pool.clone()));
        let corretor_repo = Arc::new(CorretorRepository::new(db_pool.clone()));

        let negociacao_service = NegociacaoService::new(
            negociacao_repo,
            lead_repo.clone(),
            imovel_repo,
            corretor_repo.clone(),
        );
        let lead_service =
            LeadService::new(lead_repo, corretor_repo, Arc::new(NotificadorLog));

        Self {
            db_pool,
            negociacao_service,
            lead_service,
        }
    }
}

/// Inicializa o logger global no formato compacto.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}
