#![cfg(feature = "server")]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use radiomedia::api_rest::create_router;
use radiomedia::{MediaLibrary, MediaState};
use std::fs;
use std::path::Path;
use tower::ServiceExt;

const NOT_FOUND_PAGE: &str = "<h1>nothing here</h1>";
const THANK_YOU_PAGE: &str = "<h1>thanks!</h1>";
const BOUNDARY: &str = "radio-bump-boundary";

struct Site {
    http: tempfile::TempDir,
    music: tempfile::TempDir,
}

impl Site {
    fn new() -> Self {
        let site = Self {
            http: tempfile::tempdir().unwrap(),
            music: tempfile::tempdir().unwrap(),
        };
        fs::write(site.http.path().join("404.html"), NOT_FOUND_PAGE).unwrap();
        fs::write(site.http.path().join("thankyou.html"), THANK_YOU_PAGE).unwrap();
        for dir in ["backgrounds", "webms"] {
            fs::create_dir(site.http.path().join(dir)).unwrap();
        }
        fs::create_dir(site.music.path().join("transitions")).unwrap();
        site
    }

    fn add(&self, dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn router(&self) -> Router {
        create_router(MediaState::new(MediaLibrary::new(
            self.http.path(),
            self.music.path(),
        )))
    }
}

async fn get(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let cache = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cache, String::from_utf8(body.to_vec()).unwrap())
}

fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
    let mut body = String::new();
    for (name, file_name, content) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                name, file_name
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                name
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    Body::from(body)
}

async fn post_bump(router: Router, body: Body) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/upload/bump")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn uploads(site: &Site) -> Vec<(String, String)> {
    let mut files: Vec<_> = fs::read_dir(site.http.path().join("upload"))
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().into_string().unwrap(),
                fs::read_to_string(entry.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn background_is_one_of_the_folder_files() {
    let site = Site::new();
    let backgrounds = site.http.path().join("backgrounds");
    site.add(&backgrounds, "forest.png", "forest");
    site.add(&backgrounds, "city.png", "city");
    site.add(&backgrounds, ".hidden.png", "hidden");

    for _ in 0..10 {
        let (status, cache, body) = get(site.router(), "/background").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert!(body == "forest" || body == "city", "unexpected {}", body);
    }
}

#[tokio::test]
async fn empty_folder_serves_the_not_found_page() {
    let site = Site::new();

    let (status, _, body) = get(site.router(), "/background").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, NOT_FOUND_PAGE);

    fs::remove_dir(site.music.path().join("transitions")).unwrap();
    let (status, _, body) = get(site.router(), "/transition.mp3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, NOT_FOUND_PAGE);
}

#[tokio::test]
async fn transition_comes_from_the_music_folder() {
    let site = Site::new();
    site.add(&site.music.path().join("transitions"), "jingle.mp3", "jingle");
    site.add(&site.http.path().join("backgrounds"), "jingle.mp3", "wrong folder");

    let (status, _, body) = get(site.router(), "/transition.mp3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "jingle");
}

#[tokio::test]
async fn webm_page_wraps_a_random_webm() {
    let site = Site::new();
    site.add(&site.http.path().join("webms"), "spinning.webm", "");

    let (status, _, page) = get(site.router(), "/webm.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("<title>spinning</title>"));
    assert!(page.contains(r#"src="/webms/spinning.webm""#));
    assert!(page.contains(r#"href="/webm.css""#));

    fs::remove_file(site.http.path().join("webms/spinning.webm")).unwrap();
    let (status, _, body) = get(site.router(), "/webm.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, NOT_FOUND_PAGE);
}

#[tokio::test]
async fn bump_with_file_and_link_is_stored() {
    let site = Site::new();
    let body = multipart(&[
        ("file", Some("bump.ogg"), "OggS fake"),
        ("url", None, "https://example.org/bump"),
    ]);

    let (status, page) = post_bump(site.router(), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, THANK_YOU_PAGE);

    let files = uploads(&site);
    assert_eq!(files.len(), 2);
    let (file_name, content) = &files[0];
    assert!(file_name.ends_with("-file"));
    assert_eq!(content, "OggS fake");
    let (url_name, content) = &files[1];
    assert!(url_name.ends_with("-url"));
    assert_eq!(content, "https://example.org/bump");
    // both halves of one submission share the same stamp
    assert_eq!(
        file_name.trim_end_matches("-file"),
        url_name.trim_end_matches("-url")
    );
}

#[tokio::test]
async fn blank_file_input_only_stores_the_link() {
    let site = Site::new();
    let body = multipart(&[
        ("file", Some(""), ""),
        ("url", None, "https://example.org/only-link"),
    ]);

    let (status, _) = post_bump(site.router(), body).await;
    assert_eq!(status, StatusCode::OK);

    let files = uploads(&site);
    assert_eq!(files.len(), 1);
    assert!(files[0].0.ends_with("-url"));
}

#[tokio::test]
async fn non_multipart_bump_is_rejected() {
    let site = Site::new();
    let request = Request::builder()
        .method("POST")
        .uri("/upload/bump")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("url=https://example.org"))
        .unwrap();

    let response = site.router().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
    assert!(!site.http.path().join("upload").exists());
}
