//! In-process fake Qdrant and Weaviate servers for adapter tests
//!
//! Each fake implements only the endpoints the adapters call, with brute-force
//! search over an in-memory store.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Serve `app` on an ephemeral localhost port
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake server");
    });
    addr
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    dot(a, b) / (dot(a, a).sqrt() * dot(b, b).sqrt())
}

pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn floats(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|a| a.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect())
        .unwrap_or_default()
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Qdrant
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct QdrantPoint {
    pub id: Value,
    pub vector: Vec<f32>,
    pub payload: Value,
}

pub struct QdrantCollection {
    pub size: usize,
    pub distance: String,
    pub params: Value,
    pub points: Vec<QdrantPoint>,
}

#[derive(Default)]
pub struct QdrantState {
    pub collections: BTreeMap<String, QdrantCollection>,
    pub last_search: Option<Value>,
}

pub type SharedQdrant = Arc<Mutex<QdrantState>>;

pub async fn spawn_qdrant() -> (SocketAddr, SharedQdrant) {
    let state = SharedQdrant::default();
    let app = Router::new()
        .route("/", get(|| async { Json(json!({"title": "fake qdrant", "version": "1.9.0"})) }))
        .route(
            "/collections/:name",
            get(qdrant_get).delete(qdrant_delete).put(qdrant_create),
        )
        .route("/collections/:name/points", put(qdrant_upsert))
        .route("/collections/:name/points/search", post(qdrant_search))
        .with_state(state.clone());
    (spawn(app).await, state)
}

fn qdrant_ok(result: Value) -> Response {
    Json(json!({"result": result, "status": "ok", "time": 0.0})).into_response()
}

fn qdrant_missing(name: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        json!({"status": {"error": format!("Not found: Collection `{}` doesn't exist!", name)}}),
    )
}

async fn qdrant_get(State(state): State<SharedQdrant>, Path(name): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.collections.get(&name) {
        Some(c) => qdrant_ok(json!({
            "status": "green",
            "points_count": c.points.len(),
            "config": {"params": {"vectors": {"size": c.size, "distance": c.distance}}}
        })),
        None => qdrant_missing(&name),
    }
}

async fn qdrant_delete(State(state): State<SharedQdrant>, Path(name): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    match state.collections.remove(&name) {
        Some(_) => qdrant_ok(json!(true)),
        None => qdrant_missing(&name),
    }
}

async fn qdrant_create(
    State(state): State<SharedQdrant>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.collections.contains_key(&name) {
        return error(
            StatusCode::CONFLICT,
            json!({"status": {"error": format!("Collection `{}` already exists!", name)}}),
        );
    }
    let size = body["vectors"]["size"].as_u64().unwrap_or(0) as usize;
    let distance = body["vectors"]["distance"].as_str().unwrap_or("").to_string();
    if size == 0 || !["Cosine", "Euclid", "Dot"].contains(&distance.as_str()) {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"status": {"error": "Wrong input: bad vectors config"}}),
        );
    }
    if body.get("shard_number").map_or(false, |s| s.as_u64() == Some(0)) {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"status": {"error": "Wrong input: shard_number must be positive"}}),
        );
    }
    state.collections.insert(
        name,
        QdrantCollection {
            size,
            distance,
            params: body,
            points: Vec::new(),
        },
    );
    qdrant_ok(json!(true))
}

async fn qdrant_upsert(
    State(state): State<SharedQdrant>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(collection) = state.collections.get_mut(&name) else {
        return qdrant_missing(&name);
    };
    let points = body["points"].as_array().cloned().unwrap_or_default();
    for point in &points {
        let vector = floats(&point["vector"]);
        if vector.len() != collection.size {
            return error(
                StatusCode::BAD_REQUEST,
                json!({"status": {"error": format!(
                    "Wrong input: Vector dimension error: expected dim: {}, got {}",
                    collection.size,
                    vector.len()
                )}}),
            );
        }
    }
    for point in points {
        collection.points.retain(|p| p.id != point["id"]);
        collection.points.push(QdrantPoint {
            id: point["id"].clone(),
            vector: floats(&point["vector"]),
            payload: point.get("payload").cloned().unwrap_or(json!({})),
        });
    }
    qdrant_ok(json!({"operation_id": 0, "status": "completed"}))
}

fn qdrant_matches(filter: &Value, payload: &Value) -> bool {
    let check = |c: &Value| payload.get(c["key"].as_str().unwrap_or("")) == Some(&c["match"]["value"]);
    let must = filter["must"].as_array().map_or(true, |m| m.iter().all(check));
    let should = filter["should"].as_array().map_or(true, |s| s.iter().any(check));
    must && should
}

async fn qdrant_search(
    State(state): State<SharedQdrant>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.last_search = Some(body.clone());
    let Some(collection) = state.collections.get(&name) else {
        return qdrant_missing(&name);
    };

    let query = floats(&body["vector"]);
    let limit = body["limit"].as_u64().unwrap_or(10) as usize;
    let mut scored: Vec<(Value, f32)> = collection
        .points
        .iter()
        .filter(|p| body.get("filter").map_or(true, |f| qdrant_matches(f, &p.payload)))
        .map(|p| {
            let score = match collection.distance.as_str() {
                "Cosine" => cosine(&query, &p.vector),
                "Dot" => dot(&query, &p.vector),
                _ => l2_squared(&query, &p.vector).sqrt(),
            };
            (p.id.clone(), score)
        })
        .collect();
    if collection.distance == "Euclid" {
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    } else {
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    }
    scored.truncate(limit);

    qdrant_ok(Value::Array(
        scored
            .into_iter()
            .map(|(id, score)| json!({"id": id, "version": 0, "score": score}))
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// Weaviate
// ---------------------------------------------------------------------------

pub struct WeaviateObject {
    pub id: String,
    pub vector: Vec<f32>,
    pub properties: Value,
}

#[derive(Default)]
pub struct WeaviateState {
    pub classes: BTreeMap<String, Value>,
    pub objects: BTreeMap<String, Vec<WeaviateObject>>,
    pub last_query: Option<String>,
}

pub type SharedWeaviate = Arc<Mutex<WeaviateState>>;

pub async fn spawn_weaviate() -> (SocketAddr, SharedWeaviate) {
    let state = SharedWeaviate::default();
    let app = Router::new()
        .route("/v1/.well-known/ready", get(|| async { StatusCode::OK }))
        .route("/v1/schema", post(weaviate_create))
        .route(
            "/v1/schema/:class",
            get(weaviate_get).delete(weaviate_delete).put(weaviate_update),
        )
        .route("/v1/batch/objects", post(weaviate_batch))
        .route("/v1/graphql", post(weaviate_graphql))
        .with_state(state.clone());
    (spawn(app).await, state)
}

fn weaviate_missing() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn weaviate_get(State(state): State<SharedWeaviate>, Path(class): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.classes.get(&class) {
        Some(schema) => Json(schema.clone()).into_response(),
        None => weaviate_missing(),
    }
}

async fn weaviate_delete(
    State(state): State<SharedWeaviate>,
    Path(class): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.classes.remove(&class);
    state.objects.remove(&class);
    StatusCode::OK.into_response()
}

async fn weaviate_create(State(state): State<SharedWeaviate>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let class = body["class"].as_str().unwrap_or("").to_string();
    if state.classes.contains_key(&class) {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"error": [{"message": format!("class name {:?} already exists", class)}]}),
        );
    }
    let distance = body["vectorIndexConfig"]["distance"].as_str().unwrap_or("");
    if !["cosine", "l2-squared", "dot"].contains(&distance) {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"error": [{"message": "unsupported distance"}]}),
        );
    }
    state.classes.insert(class.clone(), body.clone());
    state.objects.insert(class, Vec::new());
    Json(body).into_response()
}

async fn weaviate_update(
    State(state): State<SharedWeaviate>,
    Path(class): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    match state.classes.get_mut(&class) {
        Some(schema) => {
            *schema = body.clone();
            Json(body).into_response()
        }
        None => weaviate_missing(),
    }
}

async fn weaviate_batch(State(state): State<SharedWeaviate>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let mut results = Vec::new();

    for object in body["objects"].as_array().cloned().unwrap_or_default() {
        let class = object["class"].as_str().unwrap_or("").to_string();
        let id = object["id"].as_str().unwrap_or("").to_string();
        let vector = floats(&object["vector"]);

        let rejection = match state.objects.get_mut(&class) {
            None => Some(format!("class {} not found", class)),
            Some(objects) => match objects.first().map(|o| o.vector.len()) {
                Some(existing) if existing != vector.len() => Some(format!(
                    "new node has a vector with length {}. Existing nodes have vectors with length {}",
                    vector.len(),
                    existing
                )),
                _ => {
                    objects.retain(|o| o.id != id);
                    objects.push(WeaviateObject {
                        id: id.clone(),
                        vector,
                        properties: object["properties"].clone(),
                    });
                    None
                }
            },
        };

        let result = match rejection {
            Some(message) => json!({"errors": {"error": [{"message": message}]}}),
            None => json!({}),
        };
        results.push(json!({"class": class, "id": id, "result": result}));
    }

    Json(Value::Array(results)).into_response()
}

/// Pull the numbers between `vector: [` and the next `]`
fn graphql_vector(query: &str) -> Vec<f32> {
    let Some(start) = query.find("vector: [") else {
        return Vec::new();
    };
    let rest = &query[start + "vector: [".len()..];
    let end = rest.find(']').unwrap_or(rest.len());
    rest[..end]
        .split(',')
        .filter_map(|x| x.trim().parse::<f32>().ok())
        .collect()
}

fn graphql_limit(query: &str) -> usize {
    query
        .find("limit: ")
        .map(|i| &query[i + "limit: ".len()..])
        .and_then(|rest| rest.split(|c: char| !c.is_ascii_digit()).next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(10)
}

/// Supports a single `Equal`/`valueText` operand, enough for the tests
fn graphql_text_filter(query: &str) -> Option<(String, String)> {
    let start = query.find("where: {path: [\"")?;
    let rest = &query[start + "where: {path: [\"".len()..];
    let field = &rest[..rest.find('"')?];
    let vstart = rest.find("valueText: \"")?;
    let vrest = &rest[vstart + "valueText: \"".len()..];
    let value = &vrest[..vrest.find('"')?];
    Some((field.to_string(), value.to_string()))
}

async fn weaviate_graphql(State(state): State<SharedWeaviate>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let query = body["query"].as_str().unwrap_or("").to_string();
    state.last_query = Some(query.clone());

    let class = "Benchmark";
    let Some(schema) = state.classes.get(class) else {
        return Json(json!({
            "data": {"Get": {class: null}},
            "errors": [{"message": format!("Cannot query field \"{}\" on type \"GetObjectsObj\".", class)}]
        }))
        .into_response();
    };
    let distance = schema["vectorIndexConfig"]["distance"].as_str().unwrap_or("cosine");

    let vector = graphql_vector(&query);
    let limit = graphql_limit(&query);
    let filter = graphql_text_filter(&query);

    let mut hits: Vec<(String, f32)> = state
        .objects
        .get(class)
        .map(|objects| {
            objects
                .iter()
                .filter(|o| match &filter {
                    Some((field, value)) => o.properties[field.as_str()] == value.as_str(),
                    None => true,
                })
                .map(|o| {
                    let d = match distance {
                        "l2-squared" => l2_squared(&vector, &o.vector),
                        "dot" => -dot(&vector, &o.vector),
                        _ => 1.0 - cosine(&vector, &o.vector),
                    };
                    (o.id.clone(), d)
                })
                .collect()
        })
        .unwrap_or_default();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.truncate(limit);

    let objects: Vec<Value> = hits
        .into_iter()
        .map(|(id, d)| json!({"_additional": {"id": id, "distance": d}}))
        .collect();
    Json(json!({"data": {"Get": {class: objects}}})).into_response()
}
