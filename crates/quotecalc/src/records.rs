//! Quote line items
//!
//! Products and rateio (allocated cost) services as entered on a quote. Each
//! record fills one row of its line-item sheet, columns A to K.

use crate::inject::RowRecord;
use quotecalc_core::CellValue;
use std::fmt;
use std::str::FromStr;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Categoria {
    /// Hardware
    Hw,
    /// Software
    Sw,
    /// Services
    Serv,
}

/// SGI TIS classification of a rateio service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SgiTis {
    #[cfg_attr(feature = "serde", serde(rename = "COMP"))]
    Comp,
    #[cfg_attr(feature = "serde", serde(rename = "MODI"))]
    Modi,
    #[cfg_attr(feature = "serde", serde(rename = "MOIN"))]
    Moin,
    Outros,
    Nenhum,
}

/// Reference currency of a rateio cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Moeda {
    #[default]
    Brl,
    Usd,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $(t if t.eq_ignore_ascii_case($text) => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}'",
                        stringify!($ty),
                        other
                    )),
                }
            }
        }
    };
}

text_enum!(Categoria { Hw => "HW", Sw => "SW", Serv => "SERV" });
text_enum!(SgiTis {
    Comp => "COMP",
    Modi => "MODI",
    Moin => "MOIN",
    Outros => "Outros",
    Nenhum => "Nenhum",
});
text_enum!(Moeda { Brl => "BRL", Usd => "USD" });

/// Yes/no as written in the line-item sheets
pub fn sim_nao(flag: bool) -> &'static str {
    if flag {
        "Sim"
    } else {
        "Não"
    }
}

/// Inverse of [`sim_nao`]; also accepts the unaccented spelling
pub fn parse_sim_nao(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "sim" => Some(true),
        "não" | "nao" => Some(false),
        _ => None,
    }
}

/// A product line on a quote
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct QuoteProduct {
    pub fabricante: String,
    pub part_number: String,
    pub descricao: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub id_familia_range: String,
    pub categoria: Categoria,
    #[cfg_attr(feature = "serde", serde(default))]
    pub variacao_cambial: bool,
    pub custo_unitario: f64,
    pub preco_venda: f64,
    pub quantidade: u32,
}

impl QuoteProduct {
    /// Unit cost × quantity
    pub fn custo_total(&self) -> f64 {
        self.custo_unitario * f64::from(self.quantidade)
    }

    /// Unit price × quantity
    pub fn valor_venda(&self) -> f64 {
        self.preco_venda * f64::from(self.quantidade)
    }
}

impl RowRecord for QuoteProduct {
    fn row_values(&self) -> Vec<CellValue> {
        vec![
            CellValue::string(&self.fabricante),
            CellValue::string(&self.part_number),
            CellValue::string(&self.descricao),
            CellValue::string(&self.id_familia_range),
            CellValue::string(self.categoria.as_str()),
            CellValue::string(sim_nao(self.variacao_cambial)),
            CellValue::Number(self.custo_unitario),
            CellValue::Number(self.preco_venda),
            CellValue::Number(f64::from(self.quantidade)),
            CellValue::Number(self.custo_total()),
            CellValue::Number(self.valor_venda()),
        ]
    }
}

/// A service whose cost is spread over the quote
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RateioService {
    pub item: u32,
    pub mes_inicio_minimo: u32,
    pub sgi_tis: SgiTis,
    pub servico: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub descricao_servico: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub importado: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fornecedor: String,
    /// Cost including taxes, in `moeda_referencia`
    pub valor_com_impostos: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub moeda_referencia: Moeda,
    #[cfg_attr(feature = "serde", serde(default))]
    pub prazo_custo: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mensalidades: u32,
}

impl RowRecord for RateioService {
    fn row_values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Number(f64::from(self.item)),
            CellValue::Number(f64::from(self.mes_inicio_minimo)),
            CellValue::string(self.sgi_tis.as_str()),
            CellValue::string(&self.servico),
            CellValue::string(&self.descricao_servico),
            CellValue::string(sim_nao(self.importado)),
            CellValue::string(&self.fornecedor),
            CellValue::Number(self.valor_com_impostos),
            CellValue::string(self.moeda_referencia.as_str()),
            CellValue::string(&self.prazo_custo),
            CellValue::Number(f64::from(self.mensalidades)),
        ]
    }
}

/// Everything the cash-flow template needs from a quote
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quote {
    /// Quote number, used in exported file names
    pub number: String,
    /// Days to receive payment (30, 45, 60, 75 or 90 in practice)
    pub prv: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub products: Vec<QuoteProduct>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub services: Vec<RateioService>,
}
