use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::i18n::Locale;

/// Qual escrita falhou num salvamento de duas etapas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// O próprio movimento informado pelo usuário.
    Primary,
    /// A despesa de comissão derivada.
    Derived,
    /// A limpeza em cascata dos movimentos vinculados.
    Cascade,
}

impl WriteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStage::Primary => "primary",
            WriteStage::Derived => "derived",
            WriteStage::Cascade => "cascade",
        }
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Movimento {0} não encontrado")]
    MovementNotFound(Uuid),

    #[error("Agente {0} não encontrado")]
    AgentNotFound(Uuid),

    #[error("Número de fatura {0} já utilizado")]
    InvoiceNumberTaken(String),

    #[error("Movimento {0} é gerado automaticamente e não pode ser alterado")]
    ManagedMovement(Uuid),

    // I1 violado antes da escrita: reportamos em vez de "consertar" em silêncio.
    #[error("Movimento {movement_id} possui {found} despesas derivadas (máximo 1)")]
    DerivationInconsistency { movement_id: Uuid, found: usize },

    #[error("Falha de persistência na etapa {stage}")]
    PersistenceFailure {
        stage: WriteStage,
        #[source]
        source: Box<AppError>,
    },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::InvalidField { field, reason: reason.into() }
    }

    /// Envolve um erro de infraestrutura indicando a etapa que falhou.
    /// Erros de negócio vindos do repositório (fatura duplicada, movimento
    /// sumido, campo inválido) passam intactos e mantêm o status HTTP próprio.
    pub fn at_stage(stage: WriteStage) -> impl FnOnce(AppError) -> AppError {
        move |source| match source {
            e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                AppError::PersistenceFailure { stage, source: Box::new(e) }
            }
            // Já classificado ou erro de negócio
            e => e,
        }
    }

    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            AppError::PersistenceFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let lang = locale.0.as_str();
        let (status, message) = match self {
            AppError::ValidationError(errors) => {
                let fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
                let prefix = translate(lang, "validation");
                return ApiError {
                    status: StatusCode::BAD_REQUEST,
                    message: format!("{} {}", prefix, fields.join(", ")),
                    stage: None,
                };
            }
            AppError::InvalidField { field, reason } => (
                StatusCode::BAD_REQUEST,
                format!("{} {}: {}", translate(lang, "validation"), field, reason),
            ),
            AppError::MovementNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("{} ({})", translate(lang, "movement_not_found"), id))
            }
            AppError::AgentNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("{} ({})", translate(lang, "agent_not_found"), id))
            }
            AppError::InvoiceNumberTaken(number) => {
                (StatusCode::CONFLICT, format!("{} ({})", translate(lang, "invoice_taken"), number))
            }
            AppError::ManagedMovement(id) => {
                (StatusCode::CONFLICT, format!("{} ({})", translate(lang, "managed_movement"), id))
            }
            AppError::DerivationInconsistency { movement_id, found } => (
                StatusCode::CONFLICT,
                format!("{} ({}: {})", translate(lang, "derivation_inconsistency"), movement_id, found),
            ),
            AppError::PersistenceFailure { stage, source } => {
                tracing::error!(stage = %stage, "Falha de persistência: {}", source);
                return ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: translate(lang, "persistence").to_string(),
                    stage: Some(*stage),
                };
            }
            // DatabaseError e InternalServerError viram 500.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, translate(lang, "internal").to_string())
            }
        };

        ApiError { status, message, stage: None }
    }
}

fn translate(lang: &str, key: &str) -> &'static str {
    match (lang, key) {
        ("pt", "validation") => "Dados inválidos:",
        ("pt", "movement_not_found") => "Movimento não encontrado.",
        ("pt", "agent_not_found") => "Agente não encontrado.",
        ("pt", "invoice_taken") => "Este número de fatura já está em uso.",
        ("pt", "managed_movement") => "Este movimento é gerado automaticamente.",
        ("pt", "derivation_inconsistency") => "Mais de uma comissão vinculada ao movimento.",
        ("pt", "persistence") => "Não foi possível salvar o movimento.",
        ("pt", _) => "Ocorreu um erro inesperado.",

        ("it", "validation") => "Dati non validi:",
        ("it", "movement_not_found") => "Movimento non trovato.",
        ("it", "agent_not_found") => "Agente non trovato.",
        ("it", "invoice_taken") => "Numero fattura già utilizzato.",
        ("it", "managed_movement") => "Movimento generato automaticamente.",
        ("it", "derivation_inconsistency") => "Più provvigioni collegate allo stesso movimento.",
        ("it", "persistence") => "Impossibile salvare il movimento.",
        ("it", _) => "Si è verificato un errore imprevisto.",

        (_, "validation") => "Invalid data:",
        (_, "movement_not_found") => "Movement not found.",
        (_, "agent_not_found") => "Agent not found.",
        (_, "invoice_taken") => "Invoice number already in use.",
        (_, "managed_movement") => "This movement is generated automatically.",
        (_, "derivation_inconsistency") => "More than one commission is linked to this movement.",
        (_, "persistence") => "The movement could not be saved.",
        _ => "An unexpected error occurred.",
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<WriteStage>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into(), stage: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.stage {
            // O chamador decide se repete só a etapa derivada
            Some(stage) => json!({ "error": self.message, "stage": stage.as_str() }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
