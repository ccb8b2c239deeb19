// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;
use crate::common::error::ApiError;

// O nome do nosso cabeçalho HTTP customizado
const AGENCY_ID_HEADER: &str = "x-agency-id";

// A agência ativa, resolvida pela camada de sessão antes de chegar aqui.
#[derive(Debug, Clone, Copy)]
pub struct AgencyContext(pub Uuid);

impl<S> FromRequestParts<S> for AgencyContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AGENCY_ID_HEADER)
            .ok_or_else(|| ApiError::bad_request("O cabeçalho X-Agency-ID é obrigatório."))?;

        let value_str = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Cabeçalho X-Agency-ID contém caracteres inválidos."))?;

        let agency_id = Uuid::parse_str(value_str)
            .map_err(|_| ApiError::bad_request("Cabeçalho X-Agency-ID inválido (não é um UUID)."))?;

        Ok(AgencyContext(agency_id))
    }
}
