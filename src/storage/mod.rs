//! Media storage
//!
//! Uploaded post images live either on the local disk (served under
//! `/media`) or in a Cloudflare R2 bucket behind a public domain.

mod media;

pub use media::MediaStorage;

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
