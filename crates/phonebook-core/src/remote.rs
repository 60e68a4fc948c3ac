// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Remote favorites service
//
// The favorites backend is a set of PHP scripts under one base URL.
// Only the list and create-group calls have responses worth reading;
// every other mutation is fire-and-reload.

use crate::types::{AppError, ClientSettings, Id};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

/// Contract of the remote favorites store consumed by `FavoritesStore`
#[async_trait]
pub trait FavoritesService: Send + Sync {
    /// Fetch the raw group list for a user. Shape checking is left to the caller.
    async fn list_groups(&self, user_id: &Id) -> Result<Value, AppError>;

    /// Create a group. Returns the service's reported `success` flag; a reply
    /// without one counts as `false`.
    async fn create_group(&self, user_id: &Id, name: &str) -> Result<bool, AppError>;

    async fn rename_group(&self, group_id: &Id, name: &str) -> Result<(), AppError>;

    async fn delete_group(&self, group_id: &Id) -> Result<(), AppError>;

    async fn add_member(&self, group_id: &Id, name: &str, mobile: &str) -> Result<(), AppError>;

    async fn edit_member(&self, member_id: &Id, name: &str, mobile: &str) -> Result<(), AppError>;

    async fn delete_member(&self, member_id: &Id) -> Result<(), AppError>;
}

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    user_id: &'a Id,
    name: &'a str,
}

#[derive(Serialize)]
struct RenameGroupRequest<'a> {
    group_id: &'a Id,
    name: &'a str,
}

#[derive(Serialize)]
struct DeleteGroupRequest<'a> {
    group_id: &'a Id,
}

#[derive(Serialize)]
struct AddMemberRequest<'a> {
    group_id: &'a Id,
    name: &'a str,
    mobile: &'a str,
}

// edit_member.php is the one script that expects a camelCase key
#[derive(Serialize)]
struct EditMemberRequest<'a> {
    #[serde(rename = "memberId")]
    member_id: &'a Id,
    name: &'a str,
    mobile: &'a str,
}

#[derive(Serialize)]
struct DeleteMemberRequest<'a> {
    member_id: &'a Id,
}

/// Loose truthiness for flags coming back from the PHP backend
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

/// HTTP implementation of the favorites service
pub struct HttpFavoritesService {
    http_client: Client,
    base_url: String,
}

impl HttpFavoritesService {
    pub fn new(settings: &ClientSettings) -> Result<Self, AppError> {
        Ok(Self::with_client(settings.http_client()?, &settings.favorites_base_url))
    }

    pub fn with_client(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, script: &str) -> String {
        format!("{}/{}", self.base_url, script)
    }

    async fn post<T: Serialize + Sync>(&self, script: &str, body: &T) -> Result<Response, AppError> {
        let url = self.endpoint(script);
        tracing::debug!("POST {}", url);

        self.http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl FavoritesService for HttpFavoritesService {
    async fn list_groups(&self, user_id: &Id) -> Result<Value, AppError> {
        let url = self.endpoint("get_favorites.php");

        let response = self
            .http_client
            .get(&url)
            .query(&[("user_id", user_id.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Favorites service returned status {}",
                response.status()
            )));
        }

        Ok(response.json::<Value>().await?)
    }

    async fn create_group(&self, user_id: &Id, name: &str) -> Result<bool, AppError> {
        let response = self
            .post("add_group.php", &CreateGroupRequest { user_id, name })
            .await?;

        // Anything other than a JSON object with a truthy `success` means the
        // group was not created
        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(is_truthy(body.get("success"))),
            Err(e) => {
                tracing::warn!("Create group reply is not JSON: {}", e);
                Ok(false)
            }
        }
    }

    async fn rename_group(&self, group_id: &Id, name: &str) -> Result<(), AppError> {
        self.post("edit_group.php", &RenameGroupRequest { group_id, name })
            .await?;
        Ok(())
    }

    async fn delete_group(&self, group_id: &Id) -> Result<(), AppError> {
        self.post("delete_group.php", &DeleteGroupRequest { group_id })
            .await?;
        Ok(())
    }

    async fn add_member(&self, group_id: &Id, name: &str, mobile: &str) -> Result<(), AppError> {
        self.post("add_member.php", &AddMemberRequest { group_id, name, mobile })
            .await?;
        Ok(())
    }

    async fn edit_member(&self, member_id: &Id, name: &str, mobile: &str) -> Result<(), AppError> {
        self.post("edit_member.php", &EditMemberRequest { member_id, name, mobile })
            .await?;
        Ok(())
    }

    async fn delete_member(&self, member_id: &Id) -> Result<(), AppError> {
        self.post("delete_member.php", &DeleteMemberRequest { member_id })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let service = HttpFavoritesService::with_client(Client::new(), "http://localhost/favorites/");
        assert_eq!(
            service.endpoint("add_group.php"),
            "http://localhost/favorites/add_group.php"
        );
    }

    #[test]
    fn test_edit_member_body_uses_camel_case_key() {
        let id = Id::Int(5);
        let body = serde_json::to_value(EditMemberRequest {
            member_id: &id,
            name: "Raj",
            mobile: "9876543210",
        })
        .unwrap();
        assert_eq!(body, json!({"memberId": 5, "name": "Raj", "mobile": "9876543210"}));
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&Value::Null)));
        assert!(!is_truthy(None));
    }
}
