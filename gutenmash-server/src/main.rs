use std::env;
use std::sync::Mutex;

use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};

use serde::Deserialize;

use gutenmash_core::error::MashError;
use gutenmash_core::model::reference::{ReferenceTable, Seed, Window};
use gutenmash_core::text;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	sentences: Option<usize>,
	seed: Option<String>, // "none", or "custom:token,token"
}

#[derive(Deserialize)]
struct CorpusQuery {
	names: Option<String>,
}

struct SharedData {
	table: ReferenceTable,
}

impl GenerateParams {
	/// Determines the starting seed strategy for stream generation.
	fn start_seed(&self) -> Result<Seed, String> {
		match &self.seed {
			None => Ok(Seed::Random),
			Some(s) if s.to_lowercase() == "none" => Ok(Seed::Random),
			Some(s) if s.to_lowercase().starts_with("custom:") => {
				let value = &s["custom:".len()..];
				let tokens: Vec<String> = value
					.split(',')
					.map(|t| t.trim().to_lowercase())
					.filter(|t| !t.is_empty())
					.collect();
				if tokens.is_empty() {
					Err("Custom seed cannot be empty".into())
				} else {
					Ok(Seed::Window(Window::new(tokens)))
				}
			}
			Some(_) => Err("Seed must start with 'custom:' or be 'none'".into()),
		}
	}
}

/// Reads the corpus directory from the environment, defaulting to `./data`.
fn data_dir() -> String {
	env::var("GUTENMASH_DATA").unwrap_or_else(|_| "./data".to_owned())
}

/// Reads the table window length from the environment, defaulting to 2.
fn window_len() -> usize {
	env::var("GUTENMASH_WINDOW")
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(2)
}

/// HTTP GET endpoint `/v1/generate`
///
/// Walks the currently loaded table for the requested number of sentence
/// units and returns the rendered prose as the response body.
#[get("/v1/generate")]
async fn get_generated(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let sentences = query.sentences.unwrap_or(3);

	let seed = match query.start_seed() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};

	match shared_data.table.generate(seed, sentences, &mut rand::rng()) {
		Ok(stream) => HttpResponse::Ok().body(text::render(&stream)),
		Err(e @ MashError::SeedLenMismatch { .. }) => {
			HttpResponse::BadRequest().body(e.to_string())
		}
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/models`
///
/// Lists the corpus files available in the data directory.
#[get("/v1/models")]
async fn get_models() -> impl Responder {
	match gutenmash_core::list_corpora(data_dir()) {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

/// HTTP GET endpoint `/v1/loaded_models`
///
/// Lists the corpora merged into the live table.
#[get("/v1/loaded_models")]
async fn get_loaded_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};
	HttpResponse::Ok().body(shared_data.table.corpus_names().join("\n"))
}

/// HTTP PUT endpoint `/v1/load_models`
///
/// Rebuilds the live table as the mash of the named corpora.
#[put("/v1/load_models")]
async fn put_corpora(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<CorpusQuery>,
) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let corpus_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	let len = window_len();
	let mut table = match ReferenceTable::new(len) {
		Ok(t) => t,
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};
	for name in corpus_names {
		let corpus_path = format!("{}/{}.txt", data_dir(), name);
		let partial = match ReferenceTable::from_corpus_file(&corpus_path, len) {
			Ok(t) => t,
			Err(e) => {
				return HttpResponse::InternalServerError()
					.body(format!("Failed to load corpus: {e}"));
			}
		};
		if let Err(e) = table.merge_from(&partial) {
			return HttpResponse::InternalServerError().body(format!("Failed to mash corpus: {e}"));
		}
	}

	log::info!(
		"Loaded {} windows from corpora: {}",
		table.len(),
		table.corpus_names().join(", ")
	);
	shared_data.table = table;

	HttpResponse::Ok().body("Corpora loaded successfully")
}

/// Main entry point for the server.
///
/// Starts with an empty table, wraps it in a `Mutex` for thread safety,
/// and serves the generation and corpus management endpoints.
///
/// # Notes
/// - The bind address comes from `GUTENMASH_ADDR` (default 127.0.0.1:5000).
/// - The corpus directory comes from `GUTENMASH_DATA` (default ./data).
/// - The window length comes from `GUTENMASH_WINDOW` (default 2).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let table = ReferenceTable::new(window_len())
		.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
	let shared_data = SharedData { table };
	let shared_table = web::Data::new(Mutex::new(shared_data));

	let addr = env::var("GUTENMASH_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
	log::info!("Listening on {addr}, corpora in {}", data_dir());

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.app_data(shared_table.clone())
			.service(get_generated)
			.service(get_models)
			.service(put_corpora)
			.service(get_loaded_models)
	})
	.bind(addr)?
	.run()
	.await
}
