// tests/negociacao_flow.rs
//
// Cenários do funil de negociações sobre o banco em memória: criação,
// transições, fechamento com comissão + imóvel, exclusão, estatísticas e
// a disputa de dois escritores sobre a mesma negociação.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use imobcrm::common::error::AppError;
use imobcrm::db::stores::{ImovelStore, LeadStore, NegociacaoStore};
use imobcrm::db::BancoMemoria;
use imobcrm::models::corretor::CorretorResumo;
use imobcrm::models::imovel::{CategoriaImovel, ImovelResumo, StatusImovel};
use imobcrm::models::lead::{NovoLead, OrigemLead, Temperatura};
use imobcrm::models::negociacao::{
    DadosEvento, FiltrosNegociacao, NovaComissao, NovaNegociacao, NovoDocumento,
    StatusNegociacao, TipoComissao,
};
use imobcrm::services::NegociacaoService;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct Cenario {
    banco: BancoMemoria,
    service: NegociacaoService,
    tenant: Uuid,
    lead_id: Uuid,
    imovel_id: Uuid,
    corretor_id: Uuid,
}

fn novo_lead(telefone: &str) -> NovoLead {
    NovoLead {
        nome: "Maria Silva".to_string(),
        email: None,
        telefone: telefone.to_string(),
        cpf: None,
        origem: OrigemLead::Site,
        interesse: None,
        corretor_id: None,
    }
}

async fn cenario_com_categoria(categoria: CategoriaImovel) -> Cenario {
    let banco = BancoMemoria::new();
    let tenant = Uuid::new_v4();

    let imovel_id = Uuid::new_v4();
    banco.inserir_imovel(
        tenant,
        ImovelResumo {
            id: imovel_id,
            status: StatusImovel::Disponivel,
            categoria,
        },
    );

    let corretor_id = Uuid::new_v4();
    banco.inserir_corretor(
        tenant,
        CorretorResumo {
            id: corretor_id,
            nome: "João Corretor".to_string(),
            comissao_padrao: dec("5.00"),
        },
    );

    let lead = banco
        .leads()
        .criar(tenant, &novo_lead("11999990000"), 20, Temperatura::Frio)
        .await
        .unwrap();

    let service = NegociacaoService::new(
        Arc::new(banco.negociacoes()),
        Arc::new(banco.leads()),
        Arc::new(banco.imoveis()),
        Arc::new(banco.corretores()),
    );

    Cenario {
        banco,
        service,
        tenant,
        lead_id: lead.id,
        imovel_id,
        corretor_id,
    }
}

async fn cenario() -> Cenario {
    cenario_com_categoria(CategoriaImovel::Venda).await
}

fn nova(c: &Cenario) -> NovaNegociacao {
    NovaNegociacao {
        lead_id: c.lead_id,
        imovel_id: c.imovel_id,
        corretor_id: c.corretor_id,
        valor_proposta: None,
        observacoes: None,
    }
}

/// Leva a negociação de CONTATO até CONTRATO pelo caminho curto.
async fn ate_contrato(c: &Cenario, id: Uuid) {
    use StatusNegociacao::*;
    for destino in [VisitaAgendada, VisitaRealizada, Proposta, Contrato] {
        c.service
            .mudar_status(c.tenant, id, destino, None, None)
            .await
            .unwrap();
    }
}

// --- CRIAÇÃO ---

#[tokio::test]
async fn criar_comeca_em_contato_com_evento_de_criacao() {
    let c = cenario().await;

    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    assert_eq!(negociacao.status, StatusNegociacao::Contato);
    assert_eq!(negociacao.versao, 1);
    assert_eq!(negociacao.timeline.len(), 1);
    assert!(matches!(
        negociacao.timeline[0].dados,
        DadosEvento::Criacao { .. }
    ));
    assert!(negociacao.comissoes.is_empty());
}

#[tokio::test]
async fn criar_falha_quando_referencias_nao_resolvem() {
    let c = cenario().await;

    let erro = c
        .service
        .criar(
            c.tenant,
            NovaNegociacao {
                lead_id: Uuid::new_v4(),
                ..nova(&c)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::LeadNotFound));

    let erro = c
        .service
        .criar(
            c.tenant,
            NovaNegociacao {
                imovel_id: Uuid::new_v4(),
                ..nova(&c)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::ImovelNotFound));

    let erro = c
        .service
        .criar(
            c.tenant,
            NovaNegociacao {
                corretor_id: Uuid::new_v4(),
                ..nova(&c)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::CorretorNotFound));
}

#[tokio::test]
async fn criar_rejeita_imovel_vendido_ou_alugado() {
    for status in [StatusImovel::Vendido, StatusImovel::Alugado] {
        let c = cenario().await;
        c.banco.inserir_imovel(
            c.tenant,
            ImovelResumo {
                id: c.imovel_id,
                status,
                categoria: CategoriaImovel::Venda,
            },
        );

        let erro = c.service.criar(c.tenant, nova(&c)).await.unwrap_err();
        assert!(matches!(erro, AppError::ImovelIndisponivel));
    }
}

#[tokio::test]
async fn segunda_negociacao_ativa_para_o_mesmo_par_e_rejeitada() {
    let c = cenario().await;

    let primeira = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let erro = c.service.criar(c.tenant, nova(&c)).await.unwrap_err();
    assert!(matches!(erro, AppError::NegociacaoDuplicada));

    // Encerrada a primeira, o par volta a aceitar negociação.
    c.service
        .mudar_status(
            c.tenant,
            primeira.id,
            StatusNegociacao::Perdido,
            Some("Desistiu".to_string()),
            None,
        )
        .await
        .unwrap();

    assert!(c.service.criar(c.tenant, nova(&c)).await.is_ok());
}

// --- TRANSIÇÕES ---

#[tokio::test]
async fn transicao_fora_da_tabela_nao_altera_o_status() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    c.service
        .mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::VisitaAgendada,
            None,
            None,
        )
        .await
        .unwrap();

    // Não há aresta VISITA_AGENDADA -> PROPOSTA
    let erro = c
        .service
        .mudar_status(c.tenant, negociacao.id, StatusNegociacao::Proposta, None, None)
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::TransicaoInvalida { .. }));

    let atual = c.service.buscar(c.tenant, negociacao.id).await.unwrap();
    assert_eq!(atual.status, StatusNegociacao::VisitaAgendada);
}

#[tokio::test]
async fn toda_transicao_gera_evento_na_timeline() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    ate_contrato(&c, negociacao.id).await;

    let atual = c.service.buscar(c.tenant, negociacao.id).await.unwrap();
    // 1 criação + 4 mudanças de status
    assert_eq!(atual.timeline.len(), 5);
    let seqs: Vec<i64> = atual.timeline.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert!(matches!(
        atual.timeline.last().unwrap().dados,
        DadosEvento::MudancaStatus {
            status_novo: StatusNegociacao::Contrato,
            ..
        }
    ));
}

#[tokio::test]
async fn perdido_exige_motivo() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let erro = c
        .service
        .mudar_status(c.tenant, negociacao.id, StatusNegociacao::Perdido, None, None)
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::MotivoPerdaObrigatorio));

    let perdida = c
        .service
        .mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::Perdido,
            Some("Comprou com outra imobiliária".to_string()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(perdida.status, StatusNegociacao::Perdido);
    assert_eq!(
        perdida.motivo_perda.as_deref(),
        Some("Comprou com outra imobiliária")
    );
    assert!(matches!(
        perdida.timeline.last().unwrap().dados,
        DadosEvento::MudancaStatus {
            motivo_perda: Some(_),
            ..
        }
    ));
}

// --- FECHAMENTO ---

#[tokio::test]
async fn fechamento_gera_comissao_e_vende_o_imovel() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    ate_contrato(&c, negociacao.id).await;

    let fechada = c
        .service
        .mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::Fechado,
            None,
            Some(dec("500000")),
        )
        .await
        .unwrap();

    assert_eq!(fechada.status, StatusNegociacao::Fechado);
    assert_eq!(fechada.valor_fechamento, Some(dec("500000")));

    // 5% de 500.000
    assert_eq!(fechada.comissoes.len(), 1);
    let comissao = &fechada.comissoes[0];
    assert_eq!(comissao.valor, dec("25000.00"));
    assert_eq!(comissao.percentual, dec("5.00"));
    assert_eq!(comissao.tipo, TipoComissao::Venda);
    assert_eq!(comissao.corretor_id, c.corretor_id);

    let imovel = c
        .banco
        .imoveis()
        .buscar(c.tenant, c.imovel_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(imovel.status, StatusImovel::Vendido);
}

#[tokio::test]
async fn fechamento_de_locacao_aluga_o_imovel() {
    let c = cenario_com_categoria(CategoriaImovel::Locacao).await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    ate_contrato(&c, negociacao.id).await;

    c.service
        .mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::Fechado,
            None,
            Some(dec("2500")),
        )
        .await
        .unwrap();

    let imovel = c
        .banco
        .imoveis()
        .buscar(c.tenant, c.imovel_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(imovel.status, StatusImovel::Alugado);
}

#[tokio::test]
async fn fechamento_sem_valor_usa_a_proposta() {
    let c = cenario().await;
    let negociacao = c
        .service
        .criar(
            c.tenant,
            NovaNegociacao {
                valor_proposta: Some(dec("450000")),
                ..nova(&c)
            },
        )
        .await
        .unwrap();
    ate_contrato(&c, negociacao.id).await;

    let fechada = c
        .service
        .mudar_status(c.tenant, negociacao.id, StatusNegociacao::Fechado, None, None)
        .await
        .unwrap();

    assert_eq!(fechada.valor_fechamento, Some(dec("450000")));
    assert_eq!(fechada.comissoes[0].valor, dec("22500.00"));
}

#[tokio::test]
async fn fechamento_sem_valor_nenhum_e_rejeitado() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    ate_contrato(&c, negociacao.id).await;

    let erro = c
        .service
        .mudar_status(c.tenant, negociacao.id, StatusNegociacao::Fechado, None, None)
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::ValorFechamentoObrigatorio));

    // Nada mudou: sem comissão, status preservado
    let atual = c.service.buscar(c.tenant, negociacao.id).await.unwrap();
    assert_eq!(atual.status, StatusNegociacao::Contrato);
    assert!(atual.comissoes.is_empty());
}

// --- CONCORRÊNCIA ---

#[tokio::test]
async fn dois_fechamentos_concorrentes_geram_uma_unica_comissao() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    ate_contrato(&c, negociacao.id).await;

    let s1 = c.service.clone();
    let s2 = c.service.clone();
    let (r1, r2) = tokio::join!(
        s1.mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::Fechado,
            None,
            Some(dec("500000")),
        ),
        s2.mudar_status(
            c.tenant,
            negociacao.id,
            StatusNegociacao::Fechado,
            None,
            Some(dec("500000")),
        ),
    );

    let sucessos = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(sucessos, 1, "exatamente um escritor deve vencer");

    let perdedor = if r1.is_err() { r1 } else { r2 };
    assert!(perdedor.unwrap_err().is_conflito());

    let atual = c.service.buscar(c.tenant, negociacao.id).await.unwrap();
    assert_eq!(atual.status, StatusNegociacao::Fechado);
    assert_eq!(atual.comissoes.len(), 1);
}

#[tokio::test]
async fn versao_defasada_e_rejeitada_pelo_store() {
    use imobcrm::db::TransicaoCommit;

    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let store = c.banco.negociacoes();
    let commit = |descricao: &str| TransicaoCommit {
        novo_status: StatusNegociacao::VisitaAgendada,
        valor_fechamento: None,
        motivo_perda: None,
        descricao: descricao.to_string(),
        comissao: None,
        imovel: None,
    };

    store
        .aplicar_transicao(c.tenant, negociacao.id, negociacao.versao, commit("primeira"))
        .await
        .unwrap();

    // Mesma versão de novo: o segundo escritor está defasado.
    let erro = store
        .aplicar_transicao(c.tenant, negociacao.id, negociacao.versao, commit("segunda"))
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::ConflitoDeVersao));

    let atual = store.buscar(c.tenant, negociacao.id).await.unwrap().unwrap();
    assert_eq!(atual.versao, 2);
    assert_eq!(atual.timeline.len(), 2);
}

// --- COMISSÕES MANUAIS E DOCUMENTOS ---

#[tokio::test]
async fn adicionar_comissao_anexa_registro_e_evento() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let atualizada = c
        .service
        .adicionar_comissao(
            c.tenant,
            negociacao.id,
            NovaComissao {
                corretor_id: c.corretor_id,
                percentual: dec("2.5"),
                valor: dec("1250.00"),
                tipo: TipoComissao::Captacao,
            },
        )
        .await
        .unwrap();

    assert_eq!(atualizada.comissoes.len(), 1);
    assert_eq!(atualizada.comissoes[0].tipo, TipoComissao::Captacao);
    assert!(matches!(
        atualizada.timeline.last().unwrap().dados,
        DadosEvento::ComissaoAdicionada { .. }
    ));
}

#[tokio::test]
async fn adicionar_comissao_valida_corretor_e_faixas() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let base = NovaComissao {
        corretor_id: c.corretor_id,
        percentual: dec("2.5"),
        valor: dec("1000.00"),
        tipo: TipoComissao::Split,
    };

    let erro = c
        .service
        .adicionar_comissao(
            c.tenant,
            negociacao.id,
            NovaComissao {
                corretor_id: Uuid::new_v4(),
                ..base.clone()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::CorretorNotFound));

    let erro = c
        .service
        .adicionar_comissao(
            c.tenant,
            negociacao.id,
            NovaComissao {
                percentual: dec("101"),
                ..base.clone()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::ValorInvalido(_)));

    let erro = c
        .service
        .adicionar_comissao(
            c.tenant,
            negociacao.id,
            NovaComissao {
                valor: dec("-1"),
                ..base
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::ValorInvalido(_)));
}

#[tokio::test]
async fn adicionar_documento_anexa_na_ordem() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    c.service
        .adicionar_documento(
            c.tenant,
            negociacao.id,
            NovoDocumento {
                nome: "Proposta assinada".to_string(),
                url: "https://arquivos.exemplo/proposta.pdf".to_string(),
            },
        )
        .await
        .unwrap();

    let atual = c
        .service
        .adicionar_documento(
            c.tenant,
            negociacao.id,
            NovoDocumento {
                nome: "Contrato".to_string(),
                url: "https://arquivos.exemplo/contrato.pdf".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(atual.documentos.len(), 2);
    assert_eq!(atual.documentos[0].nome, "Proposta assinada");
    assert_eq!(atual.documentos[1].nome, "Contrato");
    assert!(matches!(
        atual.timeline.last().unwrap().dados,
        DadosEvento::DocumentoAdicionado { .. }
    ));
}

// --- EXCLUSÃO ---

#[tokio::test]
async fn excluir_respeita_o_estado() {
    let c = cenario().await;

    // Em CONTATO pode
    let n1 = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    c.service.excluir(c.tenant, n1.id).await.unwrap();
    assert!(matches!(
        c.service.buscar(c.tenant, n1.id).await.unwrap_err(),
        AppError::NegociacaoNotFound
    ));

    // FECHADO não pode
    let n2 = c.service.criar(c.tenant, nova(&c)).await.unwrap();
    ate_contrato(&c, n2.id).await;
    c.service
        .mudar_status(
            c.tenant,
            n2.id,
            StatusNegociacao::Fechado,
            None,
            Some(dec("300000")),
        )
        .await
        .unwrap();
    let erro = c.service.excluir(c.tenant, n2.id).await.unwrap_err();
    assert!(matches!(erro, AppError::NegociacaoAtiva));

    // PERDIDO pode
    let c2 = cenario().await;
    let n3 = c2.service.criar(c2.tenant, nova(&c2)).await.unwrap();
    c2.service
        .mudar_status(
            c2.tenant,
            n3.id,
            StatusNegociacao::Perdido,
            Some("Desistiu".to_string()),
            None,
        )
        .await
        .unwrap();
    c2.service.excluir(c2.tenant, n3.id).await.unwrap();
}

// --- ISOLAMENTO DE TENANT ---

#[tokio::test]
async fn outro_tenant_enxerga_como_inexistente() {
    let c = cenario().await;
    let negociacao = c.service.criar(c.tenant, nova(&c)).await.unwrap();

    let intruso = Uuid::new_v4();

    assert!(matches!(
        c.service.buscar(intruso, negociacao.id).await.unwrap_err(),
        AppError::NegociacaoNotFound
    ));
    assert!(matches!(
        c.service
            .mudar_status(
                intruso,
                negociacao.id,
                StatusNegociacao::VisitaAgendada,
                None,
                None
            )
            .await
            .unwrap_err(),
        AppError::NegociacaoNotFound
    ));
    assert!(matches!(
        c.service.excluir(intruso, negociacao.id).await.unwrap_err(),
        AppError::NegociacaoNotFound
    ));
}

// --- ESTATÍSTICAS ---

#[tokio::test]
async fn estatisticas_do_funil() {
    let c = cenario().await;

    // Três pares distintos de (lead, imóvel)
    let mut ids = Vec::new();
    for i in 0..3 {
        let lead = c
            .banco
            .leads()
            .criar(
                c.tenant,
                &novo_lead(&format!("1188888000{i}")),
                10,
                Temperatura::Frio,
            )
            .await
            .unwrap();
        let imovel_id = Uuid::new_v4();
        c.banco.inserir_imovel(
            c.tenant,
            ImovelResumo {
                id: imovel_id,
                status: StatusImovel::Disponivel,
                categoria: CategoriaImovel::Venda,
            },
        );
        let negociacao = c
            .service
            .criar(
                c.tenant,
                NovaNegociacao {
                    lead_id: lead.id,
                    imovel_id,
                    corretor_id: c.corretor_id,
                    valor_proposta: None,
                    observacoes: None,
                },
            )
            .await
            .unwrap();
        ids.push(negociacao.id);
    }

    // Uma fecha em 600.000, uma perde, uma fica em CONTATO
    ate_contrato(&c, ids[0]).await;
    c.service
        .mudar_status(
            c.tenant,
            ids[0],
            StatusNegociacao::Fechado,
            None,
            Some(dec("600000")),
        )
        .await
        .unwrap();
    c.service
        .mudar_status(
            c.tenant,
            ids[1],
            StatusNegociacao::Perdido,
            Some("Sem crédito".to_string()),
            None,
        )
        .await
        .unwrap();

    let stats = c
        .service
        .estatisticas(c.tenant, FiltrosNegociacao::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.fechadas, 1);
    assert_eq!(stats.taxa_conversao, 33.33);
    assert_eq!(stats.valor_total, dec("600000"));
    assert_eq!(stats.ticket_medio, dec("600000.00"));

    let por_status: Vec<(StatusNegociacao, i64)> = stats
        .por_status
        .iter()
        .map(|item| (item.status, item.total))
        .collect();
    assert!(por_status.contains(&(StatusNegociacao::Contato, 1)));
    assert!(por_status.contains(&(StatusNegociacao::Fechado, 1)));
    assert!(por_status.contains(&(StatusNegociacao::Perdido, 1)));

    // Filtro por status
    let so_fechadas = c
        .service
        .estatisticas(
            c.tenant,
            FiltrosNegociacao {
                status: Some(StatusNegociacao::Fechado),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(so_fechadas.total, 1);
    assert_eq!(so_fechadas.taxa_conversao, 100.0);

    // Outro tenant: tudo vazio
    let vazio = c
        .service
        .estatisticas(Uuid::new_v4(), FiltrosNegociacao::default())
        .await
        .unwrap();
    assert_eq!(vazio.total, 0);
    assert_eq!(vazio.taxa_conversao, 0.0);
}
