pub mod corretor;
pub mod imovel;
pub mod lead;
pub mod negociacao;
