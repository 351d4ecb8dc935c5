//! Exercises the HTTP gateway fallback chain (C4) against canned HTTP
//! responses, covering the cases a fake `RemoteStore` can't: real status
//! codes, a real `Content-Type` header, and multi-gateway fallback order.

use cid::Cid;
use multihash::Multihash;
use orbit_bridge::cid_codec::CODEC_RAW;
use orbit_bridge::remote::GatewayChain;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_cid() -> Cid {
    let digest = blake3::hash(b"gateway test block");
    let hash = Multihash::wrap(0x12, &digest.as_bytes()[..32]).unwrap();
    Cid::new_v1(CODEC_RAW, hash)
}

fn chain(gateways: Vec<String>) -> GatewayChain {
    GatewayChain::new(reqwest::Client::new(), gateways)
}

#[tokio::test]
async fn fetches_block_bytes_from_the_first_working_gateway() {
    let server = MockServer::start().await;
    let cid = sample_cid();
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"block content".to_vec()))
        .mount(&server)
        .await;

    let gateways = chain(vec![format!("{}/ipfs", server.uri())]);
    let bytes = gateways.fetch(&cid).await.unwrap();
    assert_eq!(bytes, b"block content".to_vec());
}

#[tokio::test]
async fn falls_through_to_the_next_gateway_after_a_404() {
    let dead = MockServer::start().await;
    let live = MockServer::start().await;
    let cid = sample_cid();

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&dead)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered".to_vec()))
        .mount(&live)
        .await;

    let gateways = chain(vec![format!("{}/ipfs", dead.uri()), format!("{}/ipfs", live.uri())]);
    let bytes = gateways.fetch(&cid).await.unwrap();
    assert_eq!(bytes, b"recovered".to_vec());
}

/// A gateway answering 200 with an HTML body (`spec.md` §4.4's missing-block
/// failure mode) must be rejected exactly like a hard error, not accepted as
/// block content.
#[tokio::test]
async fn rejects_a_200_ok_html_error_page_and_falls_through() {
    let html_gateway = MockServer::start().await;
    let real_gateway = MockServer::start().await;
    let cid = sample_cid();

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<!DOCTYPE html><html><body>not found</body></html>")
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&html_gateway)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"real block bytes".to_vec()))
        .mount(&real_gateway)
        .await;

    let gateways = chain(vec![
        format!("{}/ipfs", html_gateway.uri()),
        format!("{}/ipfs", real_gateway.uri()),
    ]);
    let bytes = gateways.fetch(&cid).await.unwrap();
    assert_eq!(bytes, b"real block bytes".to_vec());
}

#[tokio::test]
async fn every_gateway_failing_surfaces_an_error() {
    let server = MockServer::start().await;
    let cid = sample_cid();
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateways = chain(vec![format!("{}/ipfs", server.uri())]);
    assert!(gateways.fetch(&cid).await.is_err());
}
