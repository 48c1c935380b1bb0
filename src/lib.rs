// src/lib.rs
//
// Núcleo de CRM imobiliário multi-tenant: o funil de negociações (máquina
// de estados com ledger de comissões e timeline append-only) e a
// qualificação de leads por score. As camadas de transporte (HTTP, bots,
// importação) vivem em outros módulos e consomem este crate.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use common::{AppError, CategoriaErro};
pub use config::AppState;
