use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tourbook_auth::Principal;
use tourbook_booking::{ContactInfo, NewBooking, Tour};
use tourbook_core::{TourId, UserId};
use tourbook_events::SessionRegistry;
use tourbook_infra::{
    BookingService, InMemoryBookingStore, InMemoryInventoryLedger, InMemoryNotificationStore,
    InventoryLedger, NotificationDispatcher,
};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn bench_reserve_release_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_reserve_release");
    group.throughput(Throughput::Elements(1));
    let rt = runtime();

    for quantity in [1u32, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(quantity), &quantity, |b, &quantity| {
            let tour_id = TourId::new();
            let ledger = InMemoryInventoryLedger::new().with_tour(Tour::new(tour_id, 1_000, 64));
            b.iter(|| {
                rt.block_on(async {
                    let reservation = ledger.reserve(tour_id, quantity).await.unwrap();
                    black_box(ledger.release(tour_id, reservation.quantity).await.unwrap());
                })
            });
        });
    }

    group.finish();
}

fn bench_contended_reservations(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_contended_reserve");
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .build()
        .expect("tokio runtime");

    for tasks in [8usize, 64] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                let tour_id = TourId::new();
                let ledger = Arc::new(
                    InMemoryInventoryLedger::new().with_tour(Tour::new(tour_id, 1_000, (tasks / 2) as u32)),
                );
                rt.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let ledger = ledger.clone();
                            tokio::spawn(async move { ledger.reserve(tour_id, 1).await.is_ok() })
                        })
                        .collect();
                    let mut granted = 0;
                    for handle in handles {
                        if handle.await.unwrap() {
                            granted += 1;
                        }
                    }
                    black_box(granted)
                })
            });
        });
    }

    group.finish();
}

fn bench_create_booking(c: &mut Criterion) {
    let mut group = c.benchmark_group("booking_service");
    let rt = runtime();
    let tour_id = TourId::new();
    let ledger = Arc::new(InMemoryInventoryLedger::new().with_tour(Tour::new(tour_id, 2_500, u32::MAX)));
    let dispatcher = NotificationDispatcher::new(
        Arc::new(InMemoryNotificationStore::new()),
        Arc::new(SessionRegistry::new()),
    );
    let service = BookingService::new(ledger, Arc::new(InMemoryBookingStore::new()), dispatcher);
    let principal = Principal::new(UserId::new(), vec![]);
    let travel_date = (Utc::now() + Duration::days(7)).date_naive();

    group.bench_function("create_booking", |b| {
        b.iter(|| {
            let request = NewBooking {
                tour_id,
                quantity: 1,
                travel_date,
                travelers: vec![],
                contact_info: ContactInfo {
                    phone: "555-0100".to_string(),
                    email: "bench@example.com".to_string(),
                },
            };
            black_box(rt.block_on(service.create_booking(&principal, request)).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reserve_release_cycle,
    bench_contended_reservations,
    bench_create_booking
);
criterion_main!(benches);
