use crate::domain::card::FieldErrors;
use thiserror::Error;

/// Why the tokenization library is not usable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayLoadError {
    #[error(
        "Não foi possível carregar o sistema de pagamento. Isso pode ser devido a bloqueadores de anúncios ou problemas de conectividade."
    )]
    Failed,
    #[error("O carregamento do sistema de pagamento está demorando mais que o esperado.")]
    TimedOut,
    #[error("Sistema de pagamento ainda não foi carregado. Tente recarregar o script.")]
    NotLoaded,
}

/// Classification of a non-2xx answer from the card payment webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    InvalidData,
    Declined,
    Transient,
    Generic,
}

impl HttpErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidData,
            402 => Self::Declined,
            s if s >= 500 => Self::Transient,
            _ => Self::Generic,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidData => {
                "Dados do cartão inválidos. Verifique as informações e tente novamente."
            }
            Self::Declined => {
                "Pagamento recusado. Verifique os dados do cartão ou tente outro cartão."
            }
            Self::Transient => "Erro interno do servidor. Tente novamente em alguns minutos.",
            Self::Generic => "Erro ao processar pagamento. Tente novamente.",
        }
    }
}

/// Every failure the checkout can surface.
///
/// `Display` yields the message shown to the customer in the current step,
/// except for the variants that only make sense to a developer.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Invalid transition: cannot {action} from {from}")]
    InvalidTransition { from: String, action: &'static str },
    #[error("Por favor, corrija os erros nos campos destacados.")]
    Validation(FieldErrors),
    #[error(transparent)]
    GatewayLoad(#[from] GatewayLoadError),
    #[error("{0}")]
    Gateway(String),
    #[error("{}", .kind.message())]
    Http { kind: HttpErrorKind, status: u16 },
    #[error("O PIX expirou. Gere um novo código para continuar.")]
    Expired,
    #[error("Result discarded: a newer request superseded it")]
    StaleResult,
    #[error("Plano desconhecido: {0}")]
    UnknownPlan(String),
    #[error("Erro de conexão: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Resposta inválida do servidor: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
