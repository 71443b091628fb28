use mocktile::Server;
use std::time::Duration;

#[tokio::test]
async fn registered_route_is_served() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    server.respond("/tile.png", &b"hello"[..]);

    let response = reqwest::get(format!("{}/tile.png", server.url()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(&response.bytes().await.unwrap()[..], b"hello");
    assert_eq!(server.hits("/tile.png"), 1);
}

#[tokio::test]
async fn unknown_route_is_not_found_but_counted() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;

    let response = reqwest::get(format!("{}/nope", server.url())).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(server.hits("/nope"), 1);
}

#[tokio::test]
async fn fallback_covers_every_path() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    server.respond_to_any(&b"tile"[..]);

    for path in ["/1/2/3.png", "/9/8/7.png"] {
        let response = reqwest::get(format!("{}{}", server.url(), path))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(&response.bytes().await.unwrap()[..], b"tile");
    }
}

#[tokio::test]
async fn delayed_response_arrives_late() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    server.respond_with_delay("/slow", &b"eventually"[..], Duration::from_millis(200));

    let started = std::time::Instant::now();
    let response = reqwest::get(format!("{}/slow", server.url())).await.unwrap();
    assert_eq!(&response.bytes().await.unwrap()[..], b"eventually");
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn request_headers_are_recorded() {
    let _ = env_logger::try_init();

    let server = Server::bind().await;
    server.respond("/tile.png", &b"hi"[..]);

    let client = reqwest::Client::new();
    client
        .get(format!("{}/tile.png", server.url()))
        .header("user-agent", "unit-test")
        .send()
        .await
        .unwrap();

    let headers = server.last_headers("/tile.png").unwrap();
    assert!(headers.contains(&("user-agent".to_owned(), "unit-test".to_owned())));
}
