pub mod comissao;
pub mod scoring;
pub mod notificacao;
pub use notificacao::{Notificador, NotificadorLog};
pub mod negociacao_service;
pub use negociacao_service::NegociacaoService;
pub mod lead_service;
pub use lead_service::LeadService;
