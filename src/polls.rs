use crate::cipher::Key;
use crate::error::PollError;
use crate::startup::AppState;
use crate::voting::{NewPoll, VoteOutcome, parse_option_labels};
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Comma separated alternative to `options`, as typed into a form.
    pub options_csv: Option<String>,
    pub organization: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePollResponse {
    pub poll_id: Uuid,
    pub key: String,
    pub title: String,
    pub options: Vec<String>,
    pub organization: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct VoterRequest {
    pub key: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VoterAddedResponse {
    pub email: String,
    pub vote_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub option: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub option: String,
    pub message: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_email(email: &str) -> Result<String, PollError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PollError::InvalidRequest("email is empty".to_owned()));
    }
    Ok(email.to_owned())
}

/// Create a new poll. The key in the response is shown exactly once.
pub async fn create_poll(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, PollError> {
    let title = payload.title.trim().to_owned();
    if title.is_empty() {
        return Err(PollError::InvalidRequest("title is empty".to_owned()));
    }

    let mut options: Vec<String> = payload
        .options
        .iter()
        .map(|o| o.trim().to_owned())
        .filter(|o| !o.is_empty())
        .collect();
    if let Some(csv) = payload.options_csv.as_deref() {
        options.extend(parse_option_labels(csv));
    }
    if options.is_empty() {
        return Err(PollError::InvalidRequest("no options given".to_owned()));
    }

    let organization = non_blank(payload.organization);
    let logo = non_blank(payload.logo);

    let (poll_id, key) = app_state
        .polls
        .create_poll(NewPoll {
            title: title.clone(),
            option_labels: options.clone(),
            organization: organization.clone(),
            logo: logo.clone(),
        })
        .await?;

    let response = CreatePollResponse {
        poll_id,
        key: key.to_string(),
        title,
        options,
        organization,
        logo,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Full decrypted record for the poll administrator.
pub async fn get_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, PollError> {
    let key: Key = query.key.parse()?;
    let record = app_state.polls.get_poll(poll_id, &key).await?;

    Ok((StatusCode::OK, Json(record)))
}

pub async fn get_audit_log(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, PollError> {
    let key: Key = query.key.parse()?;
    let audit_log = app_state.polls.get_audit_log(poll_id, &key).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "poll_id": poll_id,
            "audit_log": audit_log,
        })),
    ))
}

pub async fn add_voter(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<VoterRequest>,
) -> Result<impl IntoResponse, PollError> {
    let key: Key = payload.key.parse()?;
    let email = parse_email(&payload.email)?;

    let vote_token = app_state.polls.add_voter(poll_id, &key, &email).await?;

    Ok((
        StatusCode::CREATED,
        Json(VoterAddedResponse { email, vote_token }),
    ))
}

pub async fn remove_voter(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<VoterRequest>,
) -> Result<impl IntoResponse, PollError> {
    let key: Key = payload.key.parse()?;
    let email = parse_email(&payload.email)?;

    app_state.polls.remove_voter(poll_id, &key, &email).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_ballot(
    Extension(app_state): Extension<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, PollError> {
    let ballot = app_state.polls.get_ballot(&token).await?;

    Ok((StatusCode::OK, Json(ballot)))
}

/// Rejected votes still answer 200: the voter gets a result, not an error page.
pub async fn cast_vote(
    Extension(app_state): Extension<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, PollError> {
    let outcome = app_state.polls.cast_vote(&token, &payload.option).await?;

    let message = match outcome {
        VoteOutcome::Recorded => "Vote recorded successfully",
        VoteOutcome::AlreadyVoted => "This ballot has already been used",
        VoteOutcome::UnknownOption => "That option is not on the ballot",
    };
    let response = VoteResponse {
        success: outcome.success(),
        option: payload.option,
        message: message.to_owned(),
    };

    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::app;
    use crate::storage::{Backend, MemoryStore};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> axum::Router {
        app(AppState::with_storage(Backend::Memory(MemoryStore::default())))
    }

    async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_poll_lifecycle_over_http() {
        let app = test_app();

        let (status, created) = call(
            &app,
            "POST",
            "/polls",
            Some(json!({"title": " Lunch ", "options_csv": "Pizza, Sushi,", "organization": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Lunch");
        assert_eq!(created["options"], json!(["Pizza", "Sushi"]));
        assert!(created["organization"].is_null());
        let poll_id = created["poll_id"].as_str().unwrap().to_owned();
        let key = created["key"].as_str().unwrap().to_owned();

        let (status, voter) = call(
            &app,
            "POST",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": key, "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(voter["email"], "a@x.com");
        let token = voter["vote_token"].as_str().unwrap().to_owned();

        let (status, ballot) = call(&app, "GET", &format!("/ballot/{token}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ballot["options"], json!(["Pizza", "Sushi"]));
        assert_eq!(ballot["already_voted"], false);

        let (status, vote) = call(
            &app,
            "POST",
            &format!("/ballot/{token}"),
            Some(json!({"option": "Sushi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vote["success"], true);

        let (status, again) = call(
            &app,
            "POST",
            &format!("/ballot/{token}"),
            Some(json!({"option": "Sushi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["success"], false);

        let (status, record) = call(&app, "GET", &format!("/polls/{poll_id}?key={key}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["options"]["Sushi"], 1);
        assert_eq!(record["voters"]["a@x.com"]["has_voted"], true);

        let (status, audit) =
            call(&app, "GET", &format!("/polls/{poll_id}/audit?key={key}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<_> = audit["audit_log"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(actions, vec!["CREATE_POLL", "ADD_VOTER", "CAST_VOTE"]);

        let (status, error) = call(
            &app,
            "DELETE",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": key, "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "Operation not allowed");

        let (status, _) = call(
            &app,
            "POST",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": key, "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_remove_voter_over_http() {
        let app = test_app();
        let (_, created) = call(
            &app,
            "POST",
            "/polls",
            Some(json!({"title": "T", "options": ["A"]})),
        )
        .await;
        let poll_id = created["poll_id"].as_str().unwrap().to_owned();
        let key = created["key"].as_str().unwrap().to_owned();

        let (_, voter) = call(
            &app,
            "POST",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": key, "email": "a@x.com"})),
        )
        .await;
        let token = voter["vote_token"].as_str().unwrap().to_owned();

        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": key, "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/ballot/{token}"),
            Some(json!({"option": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_mapping_over_http() {
        let app = test_app();

        let (status, _) = call(&app, "POST", "/polls", Some(json!({"title": "  ", "options": ["A"]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/polls", Some(json!({"title": "T", "options": [" "]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, created) = call(&app, "POST", "/polls", Some(json!({"title": "T", "options": ["A"]}))).await;
        let poll_id = created["poll_id"].as_str().unwrap().to_owned();

        let (status, body) = call(&app, "GET", &format!("/polls/{poll_id}?key=garbage"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid key");

        let other_key = crate::cipher::generate_key().to_string();
        let (status, _) = call(
            &app,
            "POST",
            &format!("/polls/{poll_id}/voters"),
            Some(json!({"key": other_key, "email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            "GET",
            &format!("/polls/{}?key={other_key}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Poll not found");

        let (status, _) = call(&app, "GET", "/ballot/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
