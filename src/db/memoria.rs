// src/db/memoria.rs
//
// Implementação em memória dos stores, compartilhando um único "banco"
// travado por mutex: a mesma unidade de gravação que o Postgres entrega
// por transação, aqui vale pelo escopo do lock. Usada pela suíte de
// testes e como colaborador de demonstração sem Postgres.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::{
        CorretorStore, ImovelStore, LeadStore, NegociacaoStore, TransicaoCommit,
    },
    models::{
        corretor::CorretorResumo,
        imovel::{ImovelResumo, StatusImovel},
        lead::{
            AtualizacaoLead, ContagemTemperatura, EventoLead, Lead, LeadStats, NovoLead,
            Temperatura, TipoEventoLead,
        },
        negociacao::{
            Comissao, ContagemStatus, DadosEvento, Documento, EventoNegociacao,
            FiltrosNegociacao, Negociacao, NegociacaoStats, NovaComissao, NovaNegociacao,
            NovoDocumento, StatusNegociacao,
        },
    },
};

#[derive(Debug, Clone)]
struct ImovelRegistro {
    tenant_id: Uuid,
    resumo: ImovelResumo,
}

#[derive(Debug, Clone)]
struct CorretorRegistro {
    tenant_id: Uuid,
    resumo: CorretorResumo,
}

#[derive(Default)]
struct Tabelas {
    negociacoes: HashMap<Uuid, Negociacao>,
    leads: HashMap<Uuid, Lead>,
    imoveis: HashMap<Uuid, ImovelRegistro>,
    corretores: HashMap<Uuid, CorretorRegistro>,
}

/// O banco em memória. `Clone` é barato; todos os stores derivados
/// enxergam as mesmas tabelas.
#[derive(Clone, Default)]
pub struct BancoMemoria {
    tabelas: Arc<Mutex<Tabelas>>,
}

impl BancoMemoria {
    pub fn new() -> Self {
        Self::default()
    }

    fn travar(&self) -> MutexGuard<'_, Tabelas> {
        // Um teste que deu panic não pode envenenar os demais.
        self.tabelas
            .lock()
            .unwrap_or_else(|envenenado| envenenado.into_inner())
    }

    // --- Sementes (popular colaboradores externos) ---

    pub fn inserir_imovel(
        &self,
        tenant_id: Uuid,
        resumo: ImovelResumo,
    ) {
        self.travar().imoveis.insert(
            resumo.id,
            ImovelRegistro { tenant_id, resumo },
        );
    }

    pub fn inserir_corretor(&self, tenant_id: Uuid, resumo: CorretorResumo) {
        self.travar().corretores.insert(
            resumo.id,
            CorretorRegistro { tenant_id, resumo },
        );
    }

    pub fn negociacoes(&self) -> NegociacaoStoreMemoria {
        NegociacaoStoreMemoria {
            banco: self.clone(),
        }
    }

    pub fn leads(&self) -> LeadStoreMemoria {
        LeadStoreMemoria {
            banco: self.clone(),
        }
    }

    pub fn imoveis(&self) -> ImovelStoreMemoria {
        ImovelStoreMemoria {
            banco: self.clone(),
        }
    }

    pub fn corretores(&self) -> CorretorStoreMemoria {
        CorretorStoreMemoria {
            banco: self.clone(),
        }
    }
}

fn proximo_seq(timeline_len: usize) -> i64 {
    timeline_len as i64 + 1
}

fn evento_negociacao(seq: i64, dados: DadosEvento) -> EventoNegociacao {
    EventoNegociacao {
        seq,
        data: Utc::now(),
        dados,
    }
}

// =========================================================================
//  NEGOCIAÇÕES
// =========================================================================

#[derive(Clone)]
pub struct NegociacaoStoreMemoria {
    banco: BancoMemoria,
}

#[async_trait]
impl NegociacaoStore for NegociacaoStoreMemoria {
    async fn criar(
        &self,
        tenant_id: Uuid,
        nova: &NovaNegociacao,
    ) -> Result<Negociacao, AppError> {
        let mut tabelas = self.banco.travar();

        let duplicada = tabelas.negociacoes.values().any(|n| {
            n.tenant_id == tenant_id
                && n.lead_id == nova.lead_id
                && n.imovel_id == nova.imovel_id
                && n.status.is_ativa()
        });
        if duplicada {
            return Err(AppError::NegociacaoDuplicada);
        }

        let agora = Utc::now();
        let negociacao = Negociacao {
            id: Uuid::new_v4(),
            tenant_id,
            lead_id: nova.lead_id,
            imovel_id: nova.imovel_id,
            corretor_id: nova.corretor_id,
            status: StatusNegociacao::Contato,
            valor_proposta: nova.valor_proposta,
            valor_fechamento: None,
            motivo_perda: None,
            observacoes: nova.observacoes.clone(),
            versao: 1,
            timeline: vec![evento_negociacao(
                1,
                DadosEvento::Criacao {
                    descricao: "Negociação iniciada".to_string(),
                },
            )],
            comissoes: Vec::new(),
            documentos: Vec::new(),
            created_at: agora,
            updated_at: agora,
        };

        tabelas.negociacoes.insert(negociacao.id, negociacao.clone());
        Ok(negociacao)
    }

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Negociacao>, AppError> {
        let tabelas = self.banco.travar();
        Ok(tabelas
            .negociacoes
            .get(&id)
            .filter(|n| n.tenant_id == tenant_id)
            .cloned())
    }

    async fn aplicar_transicao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        versao_esperada: i32,
        commit: TransicaoCommit,
    ) -> Result<Negociacao, AppError> {
        let mut tabelas = self.banco.travar();

        // Valida o imóvel antes de tocar em qualquer tabela: ou a unidade
        // inteira entra, ou nada muda.
        if let Some(imovel) = &commit.imovel {
            let conhecido = tabelas
                .imoveis
                .get(&imovel.imovel_id)
                .is_some_and(|r| r.tenant_id == tenant_id);
            if !conhecido {
                return Err(AppError::ImovelNotFound);
            }
        }

        {
            let negociacao = tabelas
                .negociacoes
                .get_mut(&id)
                .filter(|n| n.tenant_id == tenant_id)
                .ok_or(AppError::NegociacaoNotFound)?;

            if negociacao.versao != versao_esperada {
                return Err(AppError::ConflitoDeVersao);
            }

            let status_anterior = negociacao.status;
            negociacao.status = commit.novo_status;
            if commit.valor_fechamento.is_some() {
                negociacao.valor_fechamento = commit.valor_fechamento;
            }
            if commit.motivo_perda.is_some() {
                negociacao.motivo_perda = commit.motivo_perda.clone();
            }
            negociacao.versao += 1;
            negociacao.updated_at = Utc::now();

            let seq = proximo_seq(negociacao.timeline.len());
            negociacao.timeline.push(evento_negociacao(
                seq,
                DadosEvento::MudancaStatus {
                    status_anterior,
                    status_novo: commit.novo_status,
                    descricao: commit.descricao.clone(),
                    motivo_perda: commit.motivo_perda.clone(),
                    valor_fechamento: commit.valor_fechamento,
                },
            ));

            if let Some(comissao) = &commit.comissao {
                negociacao.comissoes.push(Comissao {
                    corretor_id: comissao.corretor_id,
                    percentual: comissao.percentual,
                    valor: comissao.valor,
                    tipo: comissao.tipo,
                    created_at: Utc::now(),
                });
                let seq = proximo_seq(negociacao.timeline.len());
                negociacao.timeline.push(evento_negociacao(
                    seq,
                    DadosEvento::ComissaoAdicionada {
                        corretor_id: comissao.corretor_id,
                        percentual: comissao.percentual,
                        valor: comissao.valor,
                        tipo_comissao: comissao.tipo,
                    },
                ));
            }
        }

        if let Some(imovel) = &commit.imovel {
            if let Some(registro) = tabelas.imoveis.get_mut(&imovel.imovel_id) {
                registro.resumo.status = imovel.status;
            }
        }

        Ok(tabelas
            .negociacoes
            .get(&id)
            .cloned()
            .ok_or(AppError::NegociacaoNotFound)?)
    }

    async fn adicionar_comissao(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        comissao: &NovaComissao,
    ) -> Result<Negociacao, AppError> {
        let mut tabelas = self.banco.travar();

        let negociacao = tabelas
            .negociacoes
            .get_mut(&id)
            .filter(|n| n.tenant_id == tenant_id)
            .ok_or(AppError::NegociacaoNotFound)?;

        negociacao.comissoes.push(Comissao {
            corretor_id: comissao.corretor_id,
            percentual: comissao.percentual,
            valor: comissao.valor,
            tipo: comissao.tipo,
            created_at: Utc::now(),
        });
        let seq = proximo_seq(negociacao.timeline.len());
        negociacao.timeline.push(evento_negociacao(
            seq,
            DadosEvento::ComissaoAdicionada {
                corretor_id: comissao.corretor_id,
                percentual: comissao.percentual,
                valor: comissao.valor,
                tipo_comissao: comissao.tipo,
            },
        ));
        negociacao.versao += 1;
        negociacao.updated_at = Utc::now();

        Ok(negociacao.clone())
    }

    async fn adicionar_documento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        documento: &NovoDocumento,
    ) -> Result<Negociacao, AppError> {
        let mut tabelas = self.banco.travar();

        let negociacao = tabelas
            .negociacoes
            .get_mut(&id)
            .filter(|n| n.tenant_id == tenant_id)
            .ok_or(AppError::NegociacaoNotFound)?;

        negociacao.documentos.push(Documento {
            nome: documento.nome.clone(),
            url: documento.url.clone(),
            enviado_em: Utc::now(),
        });
        let seq = proximo_seq(negociacao.timeline.len());
        negociacao.timeline.push(evento_negociacao(
            seq,
            DadosEvento::DocumentoAdicionado {
                nome: documento.nome.clone(),
                url: documento.url.clone(),
            },
        ));
        negociacao.versao += 1;
        negociacao.updated_at = Utc::now();

        Ok(negociacao.clone())
    }

    async fn excluir(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tabelas = self.banco.travar();

        let status = tabelas
            .negociacoes
            .get(&id)
            .filter(|n| n.tenant_id == tenant_id)
            .map(|n| n.status)
            .ok_or(AppError::NegociacaoNotFound)?;

        if !status.pode_excluir() {
            return Err(AppError::NegociacaoAtiva);
        }

        tabelas.negociacoes.remove(&id);
        Ok(())
    }

    async fn estatisticas(
        &self,
        tenant_id: Uuid,
        filtros: &FiltrosNegociacao,
    ) -> Result<NegociacaoStats, AppError> {
        let tabelas = self.banco.travar();

        let selecionadas: Vec<&Negociacao> = tabelas
            .negociacoes
            .values()
            .filter(|n| n.tenant_id == tenant_id)
            .filter(|n| filtros.status.is_none_or(|s| n.status == s))
            .filter(|n| filtros.corretor_id.is_none_or(|c| n.corretor_id == c))
            .filter(|n| filtros.lead_id.is_none_or(|l| n.lead_id == l))
            .filter(|n| filtros.imovel_id.is_none_or(|i| n.imovel_id == i))
            .collect();

        let total = selecionadas.len() as i64;
        let fechadas_lista: Vec<&&Negociacao> = selecionadas
            .iter()
            .filter(|n| n.status == StatusNegociacao::Fechado)
            .collect();
        let fechadas = fechadas_lista.len() as i64;

        let valor_total: Decimal = fechadas_lista
            .iter()
            .filter_map(|n| n.valor_fechamento)
            .sum();
        let ticket_medio = if fechadas > 0 {
            (valor_total / Decimal::from(fechadas)).round_dp(2)
        } else {
            Decimal::ZERO
        };
        let taxa_conversao = if total > 0 {
            ((fechadas as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        let mut por_status: Vec<ContagemStatus> = Vec::new();
        for status in StatusNegociacao::todos() {
            let contagem = selecionadas.iter().filter(|n| n.status == *status).count();
            if contagem > 0 {
                por_status.push(ContagemStatus {
                    status: *status,
                    total: contagem as i64,
                });
            }
        }

        Ok(NegociacaoStats {
            total,
            fechadas,
            taxa_conversao,
            valor_total,
            ticket_medio,
            por_status,
        })
    }
}

// =========================================================================
//  LEADS
// =========================================================================

#[derive(Clone)]
pub struct LeadStoreMemoria {
    banco: BancoMemoria,
}

fn evento_lead(
    seq: i64,
    tipo: TipoEventoLead,
    descricao: &str,
    detalhes: Option<Value>,
) -> EventoLead {
    EventoLead {
        seq,
        data: Utc::now(),
        tipo,
        descricao: descricao.to_string(),
        detalhes,
    }
}

#[async_trait]
impl LeadStore for LeadStoreMemoria {
    async fn criar(
        &self,
        tenant_id: Uuid,
        novo: &NovoLead,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError> {
        let mut tabelas = self.banco.travar();

        let duplicado = tabelas
            .leads
            .values()
            .any(|l| l.tenant_id == tenant_id && l.telefone == novo.telefone);
        if duplicado {
            return Err(AppError::LeadDuplicado);
        }

        let agora = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            tenant_id,
            nome: novo.nome.clone(),
            email: novo.email.clone(),
            telefone: novo.telefone.clone(),
            cpf: novo.cpf.clone(),
            origem: novo.origem,
            interesse: novo.interesse.clone(),
            corretor_id: novo.corretor_id,
            score,
            temperatura,
            timeline: vec![evento_lead(
                1,
                TipoEventoLead::Observacao,
                "Lead criado no sistema",
                Some(json!({ "origem": novo.origem, "score_inicial": score })),
            )],
            created_at: agora,
            updated_at: agora,
        };

        tabelas.leads.insert(lead.id, lead.clone());
        Ok(lead)
    }

    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Lead>, AppError> {
        let tabelas = self.banco.travar();
        Ok(tabelas
            .leads
            .get(&id)
            .filter(|l| l.tenant_id == tenant_id)
            .cloned())
    }

    async fn atualizar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        dados: &AtualizacaoLead,
    ) -> Result<Lead, AppError> {
        let mut tabelas = self.banco.travar();

        let lead = tabelas
            .leads
            .get_mut(&id)
            .filter(|l| l.tenant_id == tenant_id)
            .ok_or(AppError::LeadNotFound)?;

        if let Some(nome) = &dados.nome {
            lead.nome = nome.clone();
        }
        if let Some(email) = &dados.email {
            lead.email = Some(email.clone());
        }
        if let Some(telefone) = &dados.telefone {
            lead.telefone = telefone.clone();
        }
        if let Some(cpf) = &dados.cpf {
            lead.cpf = Some(cpf.clone());
        }
        if let Some(origem) = dados.origem {
            lead.origem = origem;
        }
        if let Some(interesse) = &dados.interesse {
            lead.interesse = Some(interesse.clone());
        }
        lead.updated_at = Utc::now();

        let detalhes = serde_json::to_value(dados).map_err(anyhow::Error::from)?;
        let seq = proximo_seq(lead.timeline.len());
        lead.timeline.push(evento_lead(
            seq,
            TipoEventoLead::Observacao,
            "Lead atualizado",
            Some(detalhes),
        ));

        Ok(lead.clone())
    }

    async fn atualizar_score(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        score: i32,
        temperatura: Temperatura,
    ) -> Result<Lead, AppError> {
        let mut tabelas = self.banco.travar();

        let lead = tabelas
            .leads
            .get_mut(&id)
            .filter(|l| l.tenant_id == tenant_id)
            .ok_or(AppError::LeadNotFound)?;

        lead.score = score;
        lead.temperatura = temperatura;
        lead.updated_at = Utc::now();

        let seq = proximo_seq(lead.timeline.len());
        lead.timeline.push(evento_lead(
            seq,
            TipoEventoLead::Observacao,
            "Score recalculado",
            Some(json!({ "score": score, "temperatura": temperatura })),
        ));

        Ok(lead.clone())
    }

    async fn atribuir_corretor(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        corretor_id: Uuid,
    ) -> Result<Lead, AppError> {
        let mut tabelas = self.banco.travar();

        let lead = tabelas
            .leads
            .get_mut(&id)
            .filter(|l| l.tenant_id == tenant_id)
            .ok_or(AppError::LeadNotFound)?;

        lead.corretor_id = Some(corretor_id);
        lead.updated_at = Utc::now();

        let seq = proximo_seq(lead.timeline.len());
        lead.timeline.push(evento_lead(
            seq,
            TipoEventoLead::Observacao,
            "Lead atribuído ao corretor",
            Some(json!({ "corretor_id": corretor_id })),
        ));

        Ok(lead.clone())
    }

    async fn adicionar_evento(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        tipo: TipoEventoLead,
        descricao: &str,
        detalhes: Option<Value>,
    ) -> Result<(), AppError> {
        let mut tabelas = self.banco.travar();

        let lead = tabelas
            .leads
            .get_mut(&id)
            .filter(|l| l.tenant_id == tenant_id)
            .ok_or(AppError::LeadNotFound)?;

        let seq = proximo_seq(lead.timeline.len());
        lead.timeline
            .push(evento_lead(seq, tipo, descricao, detalhes));

        Ok(())
    }

    async fn estatisticas(&self, tenant_id: Uuid) -> Result<LeadStats, AppError> {
        let tabelas = self.banco.travar();

        let do_tenant: Vec<&Lead> = tabelas
            .leads
            .values()
            .filter(|l| l.tenant_id == tenant_id)
            .collect();

        let contar = |t: Temperatura| {
            do_tenant.iter().filter(|l| l.temperatura == t).count() as i64
        };

        Ok(LeadStats {
            total: do_tenant.len() as i64,
            por_temperatura: ContagemTemperatura {
                quentes: contar(Temperatura::Quente),
                mornos: contar(Temperatura::Morno),
                frios: contar(Temperatura::Frio),
            },
            sem_corretor: do_tenant.iter().filter(|l| l.corretor_id.is_none()).count() as i64,
        })
    }
}

// =========================================================================
//  IMÓVEIS / CORRETORES (colaboradores externos)
// =========================================================================

#[derive(Clone)]
pub struct ImovelStoreMemoria {
    banco: BancoMemoria,
}

#[async_trait]
impl ImovelStore for ImovelStoreMemoria {
    async fn buscar(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<ImovelResumo>, AppError> {
        let tabelas = self.banco.travar();
        Ok(tabelas
            .imoveis
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.resumo.clone()))
    }

    async fn atualizar_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: StatusImovel,
    ) -> Result<(), AppError> {
        let mut tabelas = self.banco.travar();
        let registro = tabelas
            .imoveis
            .get_mut(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .ok_or(AppError::ImovelNotFound)?;
        registro.resumo.status = status;
        Ok(())
    }
}

#[derive(Clone)]
pub struct CorretorStoreMemoria {
    banco: BancoMemoria,
}

#[async_trait]
impl CorretorStore for CorretorStoreMemoria {
    async fn buscar(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CorretorResumo>, AppError> {
        let tabelas = self.banco.travar();
        Ok(tabelas
            .corretores
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.resumo.clone()))
    }
}
