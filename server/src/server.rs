use log::{debug, info, warn};
use rocket::fairing::{AdHoc, Fairing, Info, Kind};
use rocket::http::uri::Origin;
use rocket::http::Header;
use rocket::{
    catch, catchers, get, put, routes, Build, Data, Request, Responder, Response, Rocket, State,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Instant;

use crate::store::{Store, ValidationError, DEFAULT_SHARD_COUNT};

pub const DEFAULT_PORT: u16 = 8080;
pub const KEY_STATUS_HEADER: &str = "X-Key-Status";

pub const PUT_OK_BODY: &str = "Key-value pair added successfully";
pub const KEY_NOT_FOUND_BODY: &str = "Key not found";
pub const PAGE_NOT_FOUND_BODY: &str = "Page not found";

/// Body of a `/get` lookup. The `X-Key-Status` header tells a stored value
/// apart from the "Key not found" sentinel.
#[derive(Responder)]
#[response(content_type = "plain")]
pub struct Lookup {
    body: String,
    key_status: Header<'static>,
}

impl Lookup {
    fn found(body: String) -> Self {
        Self {
            body,
            key_status: Header::new(KEY_STATUS_HEADER, "found"),
        }
    }

    fn missing() -> Self {
        Self {
            body: String::from(KEY_NOT_FOUND_BODY),
            key_status: Header::new(KEY_STATUS_HEADER, "missing"),
        }
    }
}

#[derive(Responder, Debug)]
pub enum ApiError {
    #[response(status = 400, content_type = "plain")]
    BadRequest(String),
    #[response(status = 404, content_type = "plain")]
    NotFound(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// True when the request is exactly `<path>?<field>=...`. Lookups that do not
/// start with the key field are not routes at all.
fn starts_with_field(uri: &Origin<'_>, path: &str, field: &str) -> bool {
    uri.path().as_str() == path
        && uri
            .query()
            .map_or(false, |q| q.as_str().starts_with(&format!("{}=", field)))
}

// Repeated query fields resolve to their first occurrence.
fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().next()
}

#[get("/get?<key>")]
fn get_entry(
    uri: &Origin<'_>,
    key: Vec<String>,
    store: &State<Arc<Store>>,
) -> Result<Lookup, ApiError> {
    if !starts_with_field(uri, "/get", "key") {
        return Err(ApiError::NotFound(PAGE_NOT_FOUND_BODY));
    }
    let key = first(key).ok_or(ApiError::NotFound(PAGE_NOT_FOUND_BODY))?;
    match store.get(&key) {
        Some(value) => Ok(Lookup::found(value.to_string())),
        None => {
            debug!("{} not found in store", &key);
            Ok(Lookup::missing())
        }
    }
}

#[put("/put?<key>&<value>")]
fn put_entry(
    key: Vec<String>,
    value: Vec<String>,
    store: &State<Arc<Store>>,
) -> Result<&'static str, ApiError> {
    let key = first(key).unwrap_or_default();
    if let Err(e) = store.put(&key, first(value)) {
        warn!("Rejected put for key '{}': {}", key, e);
        return Err(e.into());
    }
    Ok(PUT_OK_BODY)
}

#[catch(404)]
fn not_found() -> &'static str {
    PAGE_NOT_FOUND_BODY
}

#[catch(500)]
fn internal_error() -> &'static str {
    "Internal server error"
}

/// Logs every request together with its processing latency.
pub struct RequestTimer;

#[derive(Copy, Clone)]
struct TimerStart(Option<Instant>);

#[rocket::async_trait]
impl Fairing for RequestTimer {
    fn info(&self) -> Info {
        Info {
            name: "Request Timer",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| TimerStart(Some(Instant::now())));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let start = request.local_cache(|| TimerStart(None));
        if let Some(start) = start.0 {
            info!(
                "{} {} -> {} in {}µs",
                request.method(),
                request.uri(),
                response.status().code,
                start.elapsed().as_micros()
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub shard_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

/// The HTTP front of a single store. The store is created by the caller
/// and shared with every request handler.
pub struct ServerNode {
    config: ServerConfig,
    store: Arc<Store>,
}

impl ServerNode {
    pub fn new(config: ServerConfig, store: Arc<Store>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn build(&self) -> Rocket<Build> {
        let started = Instant::now();
        let figment = rocket::Config::figment()
            .merge(("address", self.config.address))
            .merge(("port", self.config.port));
        rocket::custom(figment)
            .manage(self.store.clone())
            .mount("/", routes![get_entry, put_entry])
            .register("/", catchers![not_found, internal_error])
            .attach(RequestTimer)
            .attach(AdHoc::on_liftoff("Startup Log", move |rocket| {
                Box::pin(async move {
                    let config = rocket.config();
                    info!("Starting server on {}:{}", config.address, config.port);
                    info!("Elapsed time starting server: {:?}", started.elapsed());
                })
            }))
            .attach(AdHoc::on_shutdown("Shutdown Log", |rocket| {
                Box::pin(async move {
                    info!("Shutting down.");
                    if let Some(store) = rocket.state::<Arc<Store>>() {
                        info!("Store holds {} entries", store.len());
                        store.log_store_state();
                    }
                })
            }))
    }
}
