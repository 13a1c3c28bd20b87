//! Server lifecycle: binding, the axum router and graceful shutdown.
//!
//! Every `GET` request except `/status` is forwarded, together with its
//! `Accept-Encoding` header, to the [`ServingLoop`]. Requests run concurrently; a dropped
//! connection drops its request future. Rejected and shed requests get the loop's headers too.

use super::{ServingLoop, TileResponse};
use crate::config::Config;
use anyhow::Result;
use axum::{
	BoxError, Router,
	body::Body,
	error_handling::HandleErrorLayer,
	extract::State,
	http::{HeaderMap, StatusCode, Uri, header::ACCEPT_ENCODING},
	response::{IntoResponse, Response},
	routing::get,
};
use pmtiles_core::{Blob, TileCompression};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower::{ServiceBuilder, buffer::BufferLayer, limit::ConcurrencyLimitLayer, timeout::TimeoutLayer};

const MAX_CONCURRENT_REQUESTS: usize = 256;
const REQUEST_BUFFER: usize = 512;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct TileServer {
	ip: String,
	port: u16,
	serving: Arc<ServingLoop>,
	exit_signal: Option<oneshot::Sender<()>>,
	join: Option<JoinHandle<()>>,
}

impl TileServer {
	pub fn new(ip: &str, port: u16, serving: ServingLoop) -> TileServer {
		TileServer {
			ip: ip.to_owned(),
			port,
			serving: Arc::new(serving),
			exit_signal: None,
			join: None,
		}
	}

	/// Opens every configured archive into one [`ServingLoop`].
	pub async fn from_config(config: &Config) -> Result<TileServer> {
		let mut serving = ServingLoop::new(config.server.cache_size_bytes(), config.cors.allowed_origin.clone())?;
		for archive in &config.archives {
			serving.open_archive(&archive.name()?, &archive.path).await?;
		}
		Ok(TileServer::new(config.server.ip(), config.server.port(), serving))
	}

	pub fn serving_loop(&self) -> &ServingLoop {
		&self.serving
	}

	/// Starts listening. A running server is stopped first.
	pub async fn start(&mut self) -> Result<()> {
		if self.exit_signal.is_some() || self.join.is_some() {
			self.stop().await;
		}

		log::info!("starting server");

		let serving = self.serving.clone();
		let overload_handler = HandleErrorLayer::new(move |err: BoxError| {
			let serving = serving.clone();
			async move { overloaded(&serving, &err) }
		});

		let router = Router::new()
			.route("/status", get(|| async { "ready!" }))
			.route("/{*path}", get(serve_request).fallback(reject_request))
			.fallback(reject_request)
			.with_state(self.serving.clone())
			.layer(
				ServiceBuilder::new()
					.layer(overload_handler)
					.layer(TimeoutLayer::new(REQUEST_TIMEOUT))
					.layer(BufferLayer::new(REQUEST_BUFFER))
					.layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS)),
			);

		let addr = format!("{}:{}", self.ip, self.port);
		let listener = TcpListener::bind(&addr).await?;
		log::info!("server listening on {addr}");

		let (tx, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			if let Err(err) = axum::serve(listener, router.into_make_service())
				.with_graceful_shutdown(async {
					rx.await.ok();
				})
				.await
			{
				log::error!("server task exited with error: {err}");
			}
		});

		self.exit_signal = Some(tx);
		self.join = Some(handle);
		Ok(())
	}

	/// Signals a graceful shutdown and waits up to ten seconds for in-flight requests.
	pub async fn stop(&mut self) {
		if self.exit_signal.is_none() && self.join.is_none() {
			return;
		}

		log::info!("stopping server");

		if let Some(tx) = self.exit_signal.take() {
			let _ = tx.send(());
		}

		if let Some(handle) = self.join.take() {
			match tokio::time::timeout(Duration::from_secs(10), handle).await {
				Ok(Err(err)) => log::warn!("server task join error: {err}"),
				Ok(Ok(())) => {}
				Err(_) => log::warn!("server task did not shut down within timeout"),
			}
		}
	}
}

async fn serve_request(State(serving): State<Arc<ServingLoop>>, uri: Uri, headers: HeaderMap) -> Response<Body> {
	let accepted = TileCompression::from_accept_encoding(
		headers
			.get(ACCEPT_ENCODING)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default(),
	);

	let response = serving.handle_request(uri.path(), accepted).await;
	log::trace!("{} {}", response.status, uri.path());
	into_http(response)
}

/// Paths and methods the loop never sees.
async fn reject_request(State(serving): State<Arc<ServingLoop>>, uri: Uri) -> Response<Body> {
	log::trace!("400 {}", uri.path());
	into_http(serving.response(400, Blob::new_empty()))
}

fn overloaded(serving: &ServingLoop, err: &BoxError) -> Response<Body> {
	log::warn!("request rejected: {err}");
	into_http(serving.response(503, Blob::from("Service overloaded, try later")))
}

fn into_http(response: TileResponse) -> Response<Body> {
	let mut builder = Response::builder().status(response.status);
	for (name, value) in response.headers {
		builder = builder.header(name, value);
	}
	builder
		.body(Body::from(response.body.into_vec()))
		.unwrap_or_else(|err| {
			log::error!("building a {} response failed: {err}", response.status);
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		})
}
