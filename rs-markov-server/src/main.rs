use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{info, warn};
use serde::Deserialize;

use rs_markov_core::io::{list_files, normalize_folder};
use rs_markov_core::model::{ChainConfig, GenerateOptions, MarkovChain, Metadata};
use rs_markov_core::ChainError;

/// Query parameters of `/v1/generate`
#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<String>,
	retries: Option<usize>,
	min_words: Option<usize>,
}

/// Body of `/v1/ingest`
#[derive(Deserialize)]
struct IngestBody {
	text: String,
	metadata: Option<Metadata>,
}

#[derive(Deserialize)]
struct CorporaQuery {
	names: Option<String>,
}

/// Start-up settings, read from the environment.
struct ServerConfig {
	bind: SocketAddr,
	data: PathBuf,
	window_size: usize,
}

impl ServerConfig {
	/// Reads `RS_MARKOV_BIND`, `RS_MARKOV_DATA` and `RS_MARKOV_WINDOW`,
	/// falling back to defaults on missing or invalid values.
	fn from_env() -> Self {
		let default_bind = SocketAddr::from(([127, 0, 0, 1], 5000));

		let bind = match env::var("RS_MARKOV_BIND") {
			Ok(s) => s.parse().unwrap_or_else(|_| {
				warn!("Invalid RS_MARKOV_BIND {s:?}, using {default_bind}");
				default_bind
			}),
			Err(_) => default_bind,
		};
		let data = normalize_folder(&env::var("RS_MARKOV_DATA").unwrap_or_else(|_| "./data".to_owned()));
		let window_size = match env::var("RS_MARKOV_WINDOW") {
			Ok(s) => match s.parse::<usize>() {
				Ok(n) if n >= 1 => n,
				_ => {
					warn!("Invalid RS_MARKOV_WINDOW {s:?}, using 1");
					1
				}
			},
			Err(_) => 1,
		};

		Self { bind, data, window_size }
	}

	fn chain_config(&self) -> ChainConfig {
		ChainConfig::new(self.window_size).unwrap_or_default()
	}
}

struct SharedData {
	chain: MarkovChain,
	data: PathBuf,
}

impl GenerateParams {
	fn options(&self) -> Result<GenerateOptions, String> {
		let mut options = GenerateOptions::new();
		options.seed = self.seed.clone().filter(|s| !s.trim().is_empty());
		if let Some(retries) = self.retries {
			options.set_max_retries(retries).map_err(|e| e.to_string())?;
		}
		if let Some(min_words) = self.min_words {
			options.set_min_words(min_words);
		}
		Ok(options)
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates a sentence from the shared chain, optionally seeded.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<RwLock<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let options = match query.options() {
		Ok(o) => o,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	// Walks may run for seconds, keep them off the async workers
	let generated = web::block(move || {
		let shared_data = data.read().map_err(|_| "Chain lock failed".to_owned())?;
		Ok::<_, String>(shared_data.chain.generate(&options))
	})
	.await;

	match generated {
		Ok(Ok(Ok(sentence))) => HttpResponse::Ok().json(sentence),
		Ok(Ok(Err(e @ ChainError::GenerationExhausted { .. }))) => HttpResponse::NotFound().body(e.to_string()),
		Ok(Ok(Err(e @ ChainError::EmptyChain))) => HttpResponse::Conflict().body(e.to_string()),
		Ok(Ok(Err(e))) => HttpResponse::InternalServerError().body(e.to_string()),
		Ok(Err(e)) => HttpResponse::InternalServerError().body(e),
		Err(_) => HttpResponse::InternalServerError().body("Generation task failed"),
	}
}

/// HTTP PUT endpoint `/v1/ingest`
///
/// Adds one sentence to the shared chain.
#[put("/v1/ingest")]
async fn put_ingest(data: web::Data<RwLock<SharedData>>, body: web::Json<IngestBody>) -> impl Responder {
	let body = body.into_inner();

	// The write lock waits for running generations, off the async workers
	let ingested = web::block(move || {
		let mut shared_data = data.write().map_err(|_| "Chain lock failed".to_owned())?;
		Ok::<_, String>(shared_data.chain.add_string(&body.text, body.metadata.unwrap_or_default()))
	})
	.await;

	match ingested {
		Ok(Ok(Ok(id))) => HttpResponse::Ok().json(serde_json::json!({ "id": id })),
		Ok(Ok(Err(e @ ChainError::InvalidInput(_)))) => HttpResponse::BadRequest().body(e.to_string()),
		Ok(Ok(Err(e))) => HttpResponse::InternalServerError().body(e.to_string()),
		Ok(Err(e)) => HttpResponse::InternalServerError().body(e),
		Err(_) => HttpResponse::InternalServerError().body("Ingestion task failed"),
	}
}

/// Runs `f` on the shared data under the read lock, on the blocking pool.
async fn read_shared<T, F>(data: web::Data<RwLock<SharedData>>, f: F) -> Result<T, String>
where
	T: Send + 'static,
	F: FnOnce(&SharedData) -> T + Send + 'static,
{
	web::block(move || {
		let shared_data = data.read().map_err(|_| "Chain lock failed".to_owned())?;
		Ok::<_, String>(f(&*shared_data))
	})
	.await
	.map_err(|_| "Blocking task failed".to_owned())?
}

#[get("/v1/stats")]
async fn get_stats(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	match read_shared(data, |d| d.chain.stats()).await {
		Ok(stats) => HttpResponse::Ok().json(stats),
		Err(e) => HttpResponse::InternalServerError().body(e),
	}
}

#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let folder = match read_shared(data, |d| d.data.clone()).await {
		Ok(folder) => folder,
		Err(e) => return HttpResponse::InternalServerError().body(e),
	};
	match web::block(move || list_files(&folder, "txt")).await {
		Ok(Ok(files)) => HttpResponse::Ok().body(files.join("\n").replace(".txt", "")),
		_ => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

#[get("/v1/loaded_corpora")]
async fn get_loaded_corpora(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	match read_shared(data, |d| d.chain.corpus_names().join("\n")).await {
		Ok(names) => HttpResponse::Ok().body(names),
		Err(e) => HttpResponse::InternalServerError().body(e),
	}
}

/// HTTP PUT endpoint `/v1/load_corpora?names=a,b`
///
/// Replaces the shared chain by one built from the named corpora.
#[put("/v1/load_corpora")]
async fn put_corpora(data: web::Data<RwLock<SharedData>>, query: web::Query<CorporaQuery>) -> impl Responder {
	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let names: Vec<String> = query_names
		.split(',')
		.map(|s| s.trim().to_owned())
		.filter(|s| !s.is_empty())
		.collect();

	// Built outside the lock, generation keeps running meanwhile
	let loaded = web::block(move || {
		let (folder, config) = {
			let shared_data = data.read().map_err(|_| "Chain lock failed".to_owned())?;
			(shared_data.data.clone(), shared_data.chain.config().clone())
		};
		let chain = MarkovChain::from_corpora(&folder, &names, config)
			.map_err(|e| format!("Failed to load corpora: {e}"))?;

		let mut shared_data = data.write().map_err(|_| "Chain lock failed".to_owned())?;
		shared_data.chain = chain;
		Ok::<_, String>(())
	})
	.await;

	match loaded {
		Ok(Ok(())) => HttpResponse::Ok().body("Corpora loaded successfully"),
		Ok(Err(e)) => HttpResponse::InternalServerError().body(e),
		Err(_) => HttpResponse::InternalServerError().body("Loading task failed"),
	}
}

/// Main entry point for the server.
///
/// Loads every corpus of the data folder into one chain, wraps it in a
/// `RwLock` (generation reads, ingestion writes) and starts an Actix-web
/// HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env();
	let chain = if config.data.is_dir() {
		MarkovChain::from_folder(&config.data, config.chain_config()).unwrap_or_else(|e| {
			warn!("Failed to load {}: {e}", config.data.display());
			MarkovChain::new(config.chain_config())
		})
	} else {
		warn!("No data folder at {}, starting with an empty chain", config.data.display());
		MarkovChain::new(config.chain_config())
	};
	info!("Chain ready: {:?}", chain.stats());

	let shared_data = web::Data::new(RwLock::new(SharedData { chain, data: config.data.clone() }));

	info!("Listening on {}", config.bind);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(put_ingest)
			.service(get_stats)
			.service(get_corpora)
			.service(get_loaded_corpora)
			.service(put_corpora)
	})
		.bind(config.bind)?
		.run()
		.await
}
