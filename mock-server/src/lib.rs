use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
}

#[derive(Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub age: u32,
}

/// Wire shape of `/snake`; keys are snake_case on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub display_name: String,
    pub follower_count: u32,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Person>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/search", get(search).put(echo).post(echo).delete(clear_search))
        .route("/echo", post(echo).put(echo).delete(echo))
        .route("/status/{code}", get(status))
        .route("/headers", get(headers))
        .route("/snake", get(snake_profile).post(snake_echo))
        .route("/people", post(create_person))
        .route("/people/{id}", get(get_person).delete(delete_person))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Echo the query items in order, duplicates included.
async fn search(Query(params): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(params)
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn clear_search() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Reply with whatever status the path names.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn headers(headers: HeaderMap) -> Json<Vec<(String, String)>> {
    Json(
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
    )
}

async fn snake_profile() -> Json<Profile> {
    Json(Profile {
        display_name: "King of Symmetry".to_string(),
        follower_count: 57,
    })
}

async fn snake_echo(Json(profile): Json<Profile>) -> Json<Profile> {
    Json(profile)
}

async fn create_person(
    State(db): State<Db>,
    Json(input): Json<NewPerson>,
) -> (StatusCode, Json<Person>) {
    let person = Person {
        id: Uuid::new_v4(),
        name: input.name,
        age: input.age,
    };
    db.write().await.insert(person.id, person.clone());
    (StatusCode::CREATED, Json(person))
}

async fn get_person(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Person>, StatusCode> {
    let people = db.read().await;
    people.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_person(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut people = db.write().await;
    people.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}
