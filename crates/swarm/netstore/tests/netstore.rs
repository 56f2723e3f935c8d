//! End-to-end behaviour of the netstore against mock network fetchers.

use std::time::Duration;

use vertex_swarm_api::{CancellationToken, StoreError};
use vertex_swarm_netstore::{FetchRequest, Lookup, NetStore, NetStoreArgs, NetStoreError};
use vertex_swarm_primitives::Chunk;
use vertex_swarm_storer::{MemoryChunkStore, RedbChunkStore};
use vertex_swarm_test_utils::{
    FailingChunkStore, FetchTrigger, MockNetFetcherFactory, chunk_with, init_tracing, overlay,
    random_chunk, wait_until,
};

fn memory_netstore(
    factory: &MockNetFetcherFactory,
    capacity: usize,
) -> NetStore<MemoryChunkStore> {
    init_tracing();
    NetStore::new(MemoryChunkStore::new(), factory.clone(), capacity).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_misses_share_one_fetch() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = random_chunk(1024);
    let address = *chunk.address();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let netstore = netstore.clone();
            tokio::spawn(async move {
                netstore
                    .retrieve(&address, &FetchRequest::default())
                    .await
            })
        })
        .collect();

    wait_until(|| netstore.waiting(&address) == 10 && factory.trigger_count() > 0).await;
    assert_eq!(factory.created_count(), 1);
    assert_eq!(factory.triggers_for(&address), 1);

    netstore.put(&chunk).unwrap();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), chunk);
    }
    assert_eq!(netstore.in_flight(), 0);
    assert!(factory.created()[0].lifetime.is_cancelled());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_hit_creates_no_fetcher() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(1);
    netstore.put(&chunk).unwrap();

    match netstore.get(chunk.address()).unwrap() {
        Lookup::Found(found) => assert_eq!(found, chunk),
        Lookup::Missing { .. } => panic!("expected local hit"),
    }
    assert!(netstore.has(chunk.address()).unwrap().is_none());
    let got = netstore
        .retrieve(chunk.address(), &FetchRequest::default())
        .await
        .unwrap();

    assert_eq!(got, chunk);
    assert_eq!(factory.created_count(), 0);
    assert!(factory.triggers().is_empty());
    assert_eq!(netstore.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_put_does_not_redeliver() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(2);
    let address = *chunk.address();

    let waiter = {
        let netstore = netstore.clone();
        tokio::spawn(async move { netstore.retrieve(&address, &FetchRequest::default()).await })
    };
    wait_until(|| netstore.waiting(&address) == 1).await;

    netstore.put(&chunk).unwrap();
    netstore.put(&chunk).unwrap();

    assert_eq!(waiter.await.unwrap().unwrap(), chunk);
    assert_eq!(factory.created_count(), 1);
    assert_eq!(netstore.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_waiter_leaves_others_waiting() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(3);
    let address = *chunk.address();

    let impatient = CancellationToken::new();
    let first = {
        let netstore = netstore.clone();
        let request = FetchRequest::new(impatient.clone());
        tokio::spawn(async move { netstore.retrieve(&address, &request).await })
    };
    let second = {
        let netstore = netstore.clone();
        tokio::spawn(async move { netstore.retrieve(&address, &FetchRequest::default()).await })
    };
    wait_until(|| netstore.waiting(&address) == 2).await;

    impatient.cancel();
    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err, NetStoreError::Cancelled { address });
    assert!(err.is_timeout());

    assert_eq!(netstore.waiting(&address), 1);
    assert!(!factory.created()[0].lifetime.is_cancelled());

    netstore.put(&chunk).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), chunk);
    assert!(factory.created()[0].lifetime.is_cancelled());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_survives_issuing_caller_cancelling() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(15);
    let address = *chunk.address();

    let issuer = CancellationToken::new();
    let first = {
        let netstore = netstore.clone();
        let request = FetchRequest::new(issuer.clone());
        tokio::spawn(async move { netstore.retrieve(&address, &request).await })
    };
    wait_until(|| factory.trigger_count() == 1).await;
    let second = {
        let netstore = netstore.clone();
        tokio::spawn(async move { netstore.retrieve(&address, &FetchRequest::default()).await })
    };
    wait_until(|| netstore.waiting(&address) == 2).await;

    issuer.cancel();
    assert!(first.await.unwrap().unwrap_err().is_timeout());
    assert_eq!(netstore.waiting(&address), 1);

    // Still exactly one request, and it has not been called off.
    let tokens = factory.trigger_tokens();
    assert_eq!(tokens.len(), 1);
    assert!(tokens.iter().all(|token| !token.is_cancelled()));

    netstore.put(&chunk).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), chunk);
    assert!(tokens.iter().all(CancellationToken::is_cancelled));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_abandoned_fetch_is_torn_down_and_restarted() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(4);
    let address = *chunk.address();

    let cancel = CancellationToken::new();
    let waiter = {
        let netstore = netstore.clone();
        let request = FetchRequest::new(cancel.clone());
        tokio::spawn(async move { netstore.retrieve(&address, &request).await })
    };
    wait_until(|| netstore.waiting(&address) == 1).await;

    cancel.cancel();
    assert!(waiter.await.unwrap().is_err());
    assert_eq!(netstore.in_flight(), 0);
    assert!(factory.created()[0].lifetime.is_cancelled());

    // A later miss starts over with a fresh fetcher and a fresh trigger.
    let handle = netstore.has(&address).unwrap().unwrap();
    assert_eq!(factory.created_count(), 2);
    assert!(!factory.created()[1].lifetime.is_cancelled());

    let fetch = tokio::spawn(async move { handle.fetch(&FetchRequest::default()).await });
    wait_until(|| factory.triggers_for(&address) == 2).await;

    netstore.put(&chunk).unwrap();
    assert_eq!(fetch.await.unwrap().unwrap(), chunk);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_put_before_handle_is_invoked() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(5);

    let lookup = netstore.get(chunk.address()).unwrap();
    assert!(lookup.chunk().is_none());

    netstore.put(&chunk).unwrap();

    let got = lookup
        .into_handle()
        .fetch(&FetchRequest::default())
        .await
        .unwrap();
    assert_eq!(got, chunk);
    assert_eq!(netstore.get(chunk.address()).unwrap().chunk(), Some(&chunk));
    // The fetch was satisfied without reaching the network.
    assert!(factory.triggers().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_registry_refuses_new_fetch() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 1);
    let busy = *chunk_with(6).address();
    let other = *chunk_with(7).address();

    let cancel = CancellationToken::new();
    let waiter = {
        let netstore = netstore.clone();
        let request = FetchRequest::new(cancel.clone());
        tokio::spawn(async move { netstore.retrieve(&busy, &request).await })
    };
    wait_until(|| netstore.waiting(&busy) == 1).await;

    let err = netstore.get(&other).unwrap_err();
    assert_eq!(err, NetStoreError::TooManyFetches { capacity: 1 });
    assert_eq!(netstore.in_flight(), 1);

    cancel.cancel();
    assert!(waiter.await.unwrap().is_err());
    assert!(netstore.has(&other).unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_evicted_handle_resolves_again() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 1);
    let chunk = chunk_with(8);
    let evictor = *chunk_with(9).address();

    let handle = netstore.has(chunk.address()).unwrap().unwrap();
    let _evictor = netstore.has(&evictor).unwrap().unwrap();
    assert!(factory.created()[0].lifetime.is_cancelled());
    assert_eq!(netstore.in_flight(), 1);

    let address = *chunk.address();
    let fetch = tokio::spawn(async move { handle.fetch(&FetchRequest::default()).await });
    wait_until(|| netstore.waiting(&address) == 1).await;
    assert_eq!(factory.created_count(), 3);

    netstore.put(&chunk).unwrap();
    assert_eq!(fetch.await.unwrap().unwrap(), chunk);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_put_delivers_nothing() {
    init_tracing();
    let factory = MockNetFetcherFactory::new();
    let netstore = NetStore::new(FailingChunkStore::new(), factory.clone(), 16).unwrap();
    let chunk = chunk_with(10);
    let address = *chunk.address();

    let waiter = {
        let netstore = netstore.clone();
        tokio::spawn(async move { netstore.retrieve(&address, &FetchRequest::default()).await })
    };
    wait_until(|| netstore.waiting(&address) == 1).await;

    netstore.local_store().set_fail_puts(true);
    let err = netstore.put(&chunk).unwrap_err();
    assert!(matches!(err, NetStoreError::Store(StoreError::Database(_))));
    assert_eq!(netstore.waiting(&address), 1);
    assert!(!waiter.is_finished());

    netstore.local_store().set_fail_puts(false);
    netstore.put(&chunk).unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), chunk);
    assert!(netstore.local_store().contains(&address));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_source_hint_issues_offer() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let chunk = chunk_with(11);
    let address = *chunk.address();

    let waiter = {
        let netstore = netstore.clone();
        let request = FetchRequest::default()
            .with_source(overlay(1))
            .with_peer(overlay(2));
        tokio::spawn(async move { netstore.retrieve(&address, &request).await })
    };
    wait_until(|| factory.trigger_count() == 1).await;

    assert_eq!(
        factory.triggers(),
        vec![FetchTrigger::Offer { address, source: overlay(1) }]
    );
    assert!(factory.created()[0].peers.contains(&overlay(2)));

    netstore.put(&chunk).unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), chunk);
    assert!(factory.created()[0].peers.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deadline_ends_wait() {
    let factory = MockNetFetcherFactory::new();
    let netstore = memory_netstore(&factory, 16);
    let address = *chunk_with(12).address();

    let request = FetchRequest::default().with_timeout(Duration::from_millis(20));
    let err = netstore.retrieve(&address, &request).await.unwrap_err();

    assert_eq!(err, NetStoreError::DeadlineExceeded { address });
    assert_eq!(err.address(), Some(&address));
    assert_eq!(netstore.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_from_config() {
    let factory = MockNetFetcherFactory::new();
    let args = NetStoreArgs { fetchers_capacity: 1 };
    let netstore =
        NetStore::from_config(MemoryChunkStore::new(), factory.clone(), &args).unwrap();

    let _first = netstore.has(chunk_with(13).address()).unwrap();
    let _second = netstore.has(chunk_with(14).address()).unwrap();
    assert_eq!(netstore.in_flight(), 1);
    assert_eq!(factory.created_count(), 2);
    assert!(factory.created()[0].lifetime.is_cancelled());

    let args = NetStoreArgs { fetchers_capacity: 0 };
    let err = NetStore::from_config(MemoryChunkStore::new(), MockNetFetcherFactory::new(), &args)
        .unwrap_err();
    assert_eq!(err, NetStoreError::InvalidCapacity);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redb_backed_retrieval() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let factory = MockNetFetcherFactory::new();
    let store = RedbChunkStore::open(dir.path().join("chunks.redb")).unwrap();
    let netstore = NetStore::new(store, factory.clone(), 16).unwrap();
    let chunk = Chunk::new(vec![0xab; 4096]);
    let address = *chunk.address();

    let waiter = {
        let netstore = netstore.clone();
        tokio::spawn(async move { netstore.retrieve(&address, &FetchRequest::default()).await })
    };
    wait_until(|| netstore.waiting(&address) == 1).await;

    netstore.put(&chunk).unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), chunk);
    assert_eq!(netstore.local_store().count().unwrap(), 1);

    let again = netstore
        .retrieve(&address, &FetchRequest::default())
        .await
        .unwrap();
    assert_eq!(again, chunk);
    assert_eq!(factory.created_count(), 1);
}
