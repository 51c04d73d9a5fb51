use std::sync::Arc;

use object_exchange::protocol::admission::AdmissionController;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_admission_respects_cap() {
    use tokio::task::JoinSet;

    let max_clients = 5;
    let controller = Arc::new(AdmissionController::new(max_clients));

    for _ in 0..200 {
        let mut tasks = JoinSet::new();
        for _ in 0..64 {
            let controller = controller.clone();
            tasks.spawn(async move {
                let permit = controller.admit();
                assert!(controller.active() <= max_clients);
                tokio::task::yield_now().await;
                permit.is_some()
            });
        }

        let mut granted = 0;
        while let Some(res) = tasks.join_next().await {
            if res.unwrap() {
                granted += 1;
            }
        }

        assert!(granted >= max_clients);
        assert_eq!(controller.active(), 0);
    }
}

#[test]
fn concurrent_admit_release_pairs_balance() {
    let controller = Arc::new(AdmissionController::new(3));

    let threads: Vec<_> = (0..16)
        .map(|_| {
            let controller = controller.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    if controller.try_admit() {
                        assert!(controller.active() <= 3);
                        controller.release();
                    }
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(controller.active(), 0);
}
