use serde::{Deserialize, Serialize};

use crate::domain::clients::{ClientPatch, NewClient};
use crate::domain::entities::ClientRecord;
use crate::domain::error::DomainError;

/// Missing fields decode as empty so they fail validation with a 400.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClientCreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl TryFrom<ClientCreateRequest> for NewClient {
    type Error = DomainError;

    fn try_from(request: ClientCreateRequest) -> Result<Self, Self::Error> {
        NewClient::new(request.name, request.email, request.phone)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClientUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl TryFrom<ClientUpdateRequest> for ClientPatch {
    type Error = DomainError;

    fn try_from(request: ClientUpdateRequest) -> Result<Self, Self::Error> {
        Ok(ClientPatch {
            name: non_blank("name", request.name)?,
            email: non_blank("email", request.email)?,
            phone: non_blank("phone", request.phone)?,
        })
    }
}

fn non_blank(field: &'static str, value: Option<String>) -> Result<Option<String>, DomainError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(DomainError::validation(
            field,
            format!("{field} cannot be blank"),
        )),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub client: ClientRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientListEnvelope {
    pub clients: Vec<ClientRecord>,
}
