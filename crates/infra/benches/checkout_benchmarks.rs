use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use forgeshop_core::{Translation, Translations, UserId};
use forgeshop_infra::{CommerceConfig, CommerceServices};
use forgeshop_orders::ShippingInfo;
use forgeshop_products::{ProductDraft, ProductFilter, ProductId};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        recipient_name: "Bench Buyer".into(),
        phone: "+1 555 0100".into(),
        address_line1: "1 Load Test Way".into(),
        address_line2: None,
        city: "Springfield".into(),
        region: None,
        postal_code: "12345".into(),
        country: "US".into(),
    }
}

fn seed_products(rt: &Runtime, svc: &CommerceServices, count: usize, stock: i64) -> Vec<ProductId> {
    rt.block_on(async {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            let product = svc
                .catalog
                .create(
                    ProductDraft {
                        sku: format!("BENCH-{n:05}"),
                        price: Decimal::new(1999, 2),
                        category_ids: Vec::new(),
                        attributes: Default::default(),
                        images: Vec::new(),
                        translations: Translations::new()
                            .with("en", Translation::new(format!("Bench item {n}"), "")),
                    },
                    stock,
                )
                .await
                .expect("seed product");
            ids.push(product.id);
        }
        ids
    })
}

/// Cart fill plus checkout, per number of cart lines.
fn bench_checkout_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("checkout_latency");

    for lines in [1usize, 5, 20].iter() {
        let svc = CommerceServices::in_memory(CommerceConfig::default());
        let products = seed_products(&rt, &svc, *lines, i64::MAX / 2);
        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let user = UserId::new();
                    for product_id in &products {
                        svc.carts.add_item(user, *product_id, 1).await.expect("add");
                    }
                    black_box(svc.checkout.checkout(user, shipping()).await.expect("checkout"))
                })
            });
        });
    }
    group.finish();
}

/// Many buyers contending for one product's stock.
fn bench_contended_checkout(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended_checkout");
    group.sample_size(20);

    for buyers in [8usize, 64].iter() {
        group.throughput(Throughput::Elements(*buyers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(buyers), buyers, |b, &buyers| {
            b.iter(|| {
                let svc = CommerceServices::in_memory(CommerceConfig::default());
                let product_id = seed_products(&rt, &svc, 1, (buyers / 2) as i64)[0];
                rt.block_on(async {
                    let mut handles = Vec::with_capacity(buyers);
                    for _ in 0..buyers {
                        let svc = svc.clone();
                        handles.push(tokio::spawn(async move {
                            let user = UserId::new();
                            svc.carts.add_item(user, product_id, 1).await?;
                            svc.checkout.checkout(user, shipping()).await
                        }));
                    }
                    let mut placed = 0usize;
                    for handle in handles {
                        if handle.await.expect("join").is_ok() {
                            placed += 1;
                        }
                    }
                    black_box(placed)
                })
            });
        });
    }
    group.finish();
}

fn bench_catalog_filtering(c: &mut Criterion) {
    let rt = runtime();
    let svc = CommerceServices::in_memory(CommerceConfig::default());
    seed_products(&rt, &svc, 1000, 10);
    let filter = ProductFilter::new();

    c.bench_function("catalog_list_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    svc.catalog
                        .list(&filter, Some(1), Some(100), Some("en"))
                        .await
                        .expect("list"),
                )
            })
        });
    });
}

criterion_group!(
    benches,
    bench_checkout_latency,
    bench_contended_checkout,
    bench_catalog_filtering
);
criterion_main!(benches);
