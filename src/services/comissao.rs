// src/services/comissao.rs

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;

/// Calcula a comissão sobre um valor de venda: `valor × percentual / 100`,
/// arredondado a 2 casas (meio para cima). Função total no domínio válido:
/// sem I/O e sem estado, as mesmas entradas sempre produzem a mesma saída.
pub fn calcular(valor: Decimal, percentual: Decimal) -> Result<Decimal, AppError> {
    if valor < Decimal::ZERO {
        return Err(AppError::ValorInvalido(format!(
            "valor de venda não pode ser negativo: {valor}"
        )));
    }
    if percentual < Decimal::ZERO || percentual > Decimal::ONE_HUNDRED {
        return Err(AppError::ValorInvalido(format!(
            "percentual de comissão deve estar entre 0 e 100: {percentual}"
        )));
    }

    Ok((valor * percentual / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
