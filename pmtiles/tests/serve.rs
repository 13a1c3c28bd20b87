
use assert_fs::{TempDir, prelude::*};
use std::{net::TcpListener, process::Child, thread, time::Duration};
use test_utilities::*;

struct Server {
	host: String,
	child: Child,
}

impl Server {
	async fn new(args: &[&str]) -> Self {
		let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
		let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin!());
		cmd.args([&["serve", "-i", "127.0.0.1", "-p", &port.to_string()], args].concat());
		let mut child = cmd.spawn().unwrap();

		loop {
			thread::sleep(Duration::from_millis(100));
			assert!(child.try_wait().unwrap().is_none(), "server process exited prematurely");
			if reqwest::get(&format!("http://127.0.0.1:{port}/status")).await.is_ok() {
				break;
			}
		}

		Self {
			host: format!("http://127.0.0.1:{port}"),
			child,
		}
	}

	async fn get(&self, path: &str) -> reqwest::Response {
		reqwest::get(format!("{}{path}", self.host)).await.unwrap()
	}
}

impl Drop for Server {
	fn drop(&mut self) {
		let _ = self.child.kill();
		let _ = self.child.wait();
	}
}

#[tokio::test]
async fn serve_archive() {
	let dir = TempDir::new().unwrap();
	let archive = make_archive(&dir);
	let argument = format!("[letters]{}", archive.to_str().unwrap());
	let server = Server::new(&["--cors", "*", &argument]).await;

	let response = server.get("/letters/0/0/0.png").await;
	assert_eq!(response.status(), 200);
	assert_eq!(response.headers()["content-type"], "image/png");
	assert_eq!(response.headers()["access-control-allow-origin"], "*");
	assert_eq!(response.headers()["cache-control"], "public, max-age=86400");
	assert_eq!(response.text().await.unwrap(), "A");

	assert_eq!(server.get("/letters/2/3/3.png").await.text().await.unwrap(), "D");
	assert_eq!(server.get("/letters/1/0/1.png").await.status(), 204);
	assert_eq!(server.get("/letters/0/0/0.jpg").await.status(), 400);
	assert_eq!(server.get("/abcd/0/0/0.png").await.status(), 400);

	let response = server.get("/letters/metadata").await;
	assert_eq!(response.headers()["content-type"], "application/json");
	assert_eq!(response.text().await.unwrap(), r#"{"name":"abcd"}"#);
}

#[tokio::test]
async fn serve_concurrent_requests() {
	let dir = TempDir::new().unwrap();
	let archive = make_archive(&dir);
	let server = Server::new(&[archive.to_str().unwrap()]).await;

	let mut join_set = tokio::task::JoinSet::new();
	for round in 0..40 {
		let (path, expected) = [
			("/abcd/0/0/0.png", "A"),
			("/abcd/1/0/0.png", "B"),
			("/abcd/1/1/1.png", "C"),
			("/abcd/2/3/3.png", "D"),
		][round % 4];
		let url = format!("{}{path}", server.host);
		join_set.spawn(async move {
			let text = reqwest::get(url).await.unwrap().text().await.unwrap();
			assert_eq!(text, expected);
		});
	}
	join_set.join_all().await;
}

#[tokio::test]
async fn serve_config_file() {
	let dir = TempDir::new().unwrap();
	make_archive(&dir);
	let config = dir.child("server.yml");
	config
		.write_str("server:\n  cache_size_mb: 1\ncors:\n  allowed_origin: https://example.org\narchives:\n  - name: from-config\n    path: abcd.pmtiles\n")
		.unwrap();

	let server = Server::new(&["-c", config.path().to_str().unwrap()]).await;
	let response = server.get("/from-config/1/1/1.png").await;
	assert_eq!(response.status(), 200);
	assert_eq!(
		response.headers()["access-control-allow-origin"],
		"https://example.org"
	);
	assert_eq!(response.text().await.unwrap(), "C");
}
