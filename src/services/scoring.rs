// src/services/scoring.rs
//
// Motor de qualificação de leads: converte os atributos conhecidos no
// momento da criação em um score 0-100 e na temperatura derivada. Funções
// puras; quem decide QUANDO pontuar é o LeadService (na criação e no
// recálculo explícito, nunca em update genérico).

use crate::models::lead::{Interesse, Lead, NovoLead, OrigemLead, Temperatura};

/// Visão mínima dos atributos que alimentam a fórmula.
#[derive(Debug, Clone, Copy)]
pub struct PerfilScoring<'a> {
    pub tem_email: bool,
    pub tem_cpf: bool,
    pub interesse: Option<&'a Interesse>,
    pub origem: OrigemLead,
    pub tem_corretor: bool,
}

impl<'a> From<&'a NovoLead> for PerfilScoring<'a> {
    fn from(novo: &'a NovoLead) -> Self {
        Self {
            tem_email: novo.email.is_some(),
            tem_cpf: novo.cpf.is_some(),
            interesse: novo.interesse.as_ref(),
            origem: novo.origem,
            tem_corretor: novo.corretor_id.is_some(),
        }
    }
}

impl<'a> From<&'a Lead> for PerfilScoring<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            tem_email: lead.email.is_some(),
            tem_cpf: lead.cpf.is_some(),
            interesse: lead.interesse.as_ref(),
            origem: lead.origem,
            tem_corretor: lead.corretor_id.is_some(),
        }
    }
}

/// Peso da origem: indicação vale mais que mídia fria.
fn pontos_origem(origem: OrigemLead) -> i32 {
    match origem {
        OrigemLead::Indicacao => 25,
        OrigemLead::Site => 20,
        OrigemLead::Whatsapp => 15,
        OrigemLead::Telefone => 10,
        OrigemLead::Portal => 8,
        OrigemLead::RedesSociais => 5,
    }
}

/// Soma ponderada dos atributos, com teto em 100.
pub fn calcular_score(perfil: &PerfilScoring<'_>) -> i32 {
    let mut score = 0;

    if perfil.tem_email {
        score += 10;
    }
    if perfil.tem_cpf {
        score += 15;
    }

    if let Some(interesse) = perfil.interesse {
        if !interesse.tipo_imovel.is_empty() {
            score += 7;
        }
        if interesse.faixa_preco.as_ref().is_some_and(|f| f.definida()) {
            score += 7;
        }
        if !interesse.localizacao.is_empty() {
            score += 6;
        }
    }

    score += pontos_origem(perfil.origem);

    if perfil.tem_corretor {
        score += 10;
    }

    score.min(100)
}

pub fn classificar_temperatura(score: i32) -> Temperatura {
    if score >= 70 {
        Temperatura::Quente
    } else if score >= 40 {
        Temperatura::Morno
    } else {
        Temperatura::Frio
    }
}
