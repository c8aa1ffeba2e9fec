use criterion::criterion_main;
use criterion::{criterion_group, Criterion};
use remote_api_app_key::{Credential, RequestSigner};
use remote_api_core::{Body, Context, SignRequest};
use serde_json::json;

criterion_group!(benches, bench);
criterion_main!(benches);

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("app_key");

    let signer = RequestSigner::new(
        Credential::new("app_key", "app_secret").expect("credential must be valid"),
    );

    group.bench_function("sign_params", |b| {
        b.iter(|| {
            signer.sign_params(
                vec![
                    ("page".to_string(), json!(1)),
                    ("q".to_string(), json!("hello world")),
                    ("tags".to_string(), json!(["red", "blue"])),
                ],
                "5f1a2b3c4d5e6f70",
                1_700_000_060,
            )
        })
    });

    group.bench_function("sign_request", |b| {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime must build");
        let ctx = Context::new();

        b.iter(|| {
            let req = http::Request::get("http://127.0.0.1:9900/users/list?page=1&q=a+b")
                .body(Body::Empty)
                .expect("request must be valid");
            let (mut parts, body) = req.into_parts();
            rt.block_on(signer.sign_request(&ctx, &mut parts, &body))
                .expect("signing must succeed")
        })
    });

    group.finish();
}
