use std::time::Duration;

use futures::{future::join_all, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use nri_api::{Event, HookError, HookRequest, PodSandbox};
use nri_stub::{
    channel::{self, CallError},
    HookCall, HookResult, Stub, StubOptions, TransportError,
};

use crate::{sandbox_events, Recorder, LIFECYCLE};

/// Builds the request for a sandbox hook.
fn request(event: Event, pod: &PodSandbox) -> HookRequest {
    let pod = pod.clone();
    match event {
        Event::PreSetupNetwork => HookRequest::PreSetupNetwork { pod, cni_configs: vec![] },
        Event::PostSetupNetwork => HookRequest::PostSetupNetwork { pod, results: vec![] },
        Event::RunPodSandbox => HookRequest::RunPodSandbox { pod },
        Event::PreNetworkDeleted => HookRequest::PreNetworkDeleted { pod },
        Event::PostNetworkDeleted => HookRequest::PostNetworkDeleted { pod },
        Event::StopPodSandbox => HookRequest::StopPodSandbox { pod },
        Event::RemovePodSandbox => HookRequest::RemovePodSandbox { pod },
        other => panic!("{other} is not a sandbox hook"),
    }
}

/// Queues a call without waiting for it to be handled.
fn enqueue(
    tx: &mpsc::Sender<HookCall>,
    request: HookRequest,
) -> oneshot::Receiver<HookResult> {
    let (call, reply) = HookCall::new(request);
    tx.try_send(call).unwrap();
    reply
}

#[tokio::test]
async fn full_lifecycle_is_dispatched_in_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    let stub = Stub::new(plugin.clone(), transport);
    let stats = stub.stats();
    let handle = tokio::spawn(stub.run());

    let events = runtime.configure("", "containerd", "2.0.0").await.unwrap();
    assert_eq!(events, sandbox_events());

    let pod = PodSandbox::new("default", "web", "uid-1");
    runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    runtime.post_setup_network(pod.clone(), vec![]).await.unwrap();
    runtime.run_pod_sandbox(pod.clone()).await.unwrap();
    runtime.pre_network_deleted(pod.clone()).await.unwrap();
    runtime.post_network_deleted(pod.clone()).await.unwrap();
    runtime.stop_pod_sandbox(pod.clone()).await.unwrap();
    runtime.remove_pod_sandbox(pod.clone()).await.unwrap();

    assert_eq!(plugin.calls_for("uid-1"), LIFECYCLE);
    assert_eq!(stats.dispatched(), LIFECYCLE.len());
    assert_eq!(stats.rejected(), 0);

    runtime.shutdown().await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sandboxes_keep_their_own_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events()).with_jitter(3);
    let (tx, rx) = mpsc::channel(256);
    let transport = ReceiverStream::new(rx).map(Ok::<_, TransportError>);
    let handle = tokio::spawn(Stub::new(plugin.clone(), transport).run());

    let configure = HookRequest::Configure {
        config: String::new(),
        runtime_name: "containerd".into(),
        runtime_version: "2.0.0".into(),
    };
    enqueue(&tx, configure).await.unwrap().unwrap();

    let pods: Vec<_> =
        (0..8).map(|i| PodSandbox::new("default", format!("pod-{i}"), format!("uid-{i}"))).collect();

    // Interleave the sandboxes: every sandbox gets its next hook before any gets the one after.
    let mut replies = Vec::new();
    for event in LIFECYCLE {
        for pod in &pods {
            replies.push(enqueue(&tx, request(event, pod)));
        }
    }

    for reply in join_all(replies).await {
        reply.unwrap().unwrap();
    }

    for pod in &pods {
        assert_eq!(plugin.calls_for(&pod.key()), LIFECYCLE, "sandbox {pod}");
    }
    assert_eq!(plugin.calls().len(), pods.len() * LIFECYCLE.len());

    drop(tx);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn out_of_order_hooks_are_dispatched_by_default() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    let stub = Stub::new(plugin.clone(), transport);
    let stats = stub.stats();
    tokio::spawn(stub.run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    // The runtime decides the order, so a sandbox started before its network is set up still
    // gets its bandwidth.
    let pod = PodSandbox::new("default", "web", "uid-1");
    runtime.run_pod_sandbox(pod.clone()).await.unwrap();
    runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    runtime.run_pod_sandbox(pod).await.unwrap();

    assert_eq!(
        plugin.calls_for("uid-1"),
        [Event::RunPodSandbox, Event::PreSetupNetwork, Event::RunPodSandbox]
    );
    assert_eq!(stats.out_of_order(), 2);
    assert_eq!(stats.rejected(), 0);
    assert_eq!(stats.dispatched(), 3);
}

#[tokio::test]
async fn strict_lifecycle_rejects_out_of_order_hooks() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    let stub = Stub::with_options(
        plugin.clone(),
        transport,
        StubOptions::default().strict_lifecycle(true),
    );
    let stats = stub.stats();
    tokio::spawn(stub.run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    let pod = PodSandbox::new("default", "web", "uid-1");
    runtime.run_pod_sandbox(pod.clone()).await.unwrap();

    let err = runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Hook(HookError::LifecycleViolation { event: Event::PreSetupNetwork, .. })
    ));

    // Repeating a hook is not allowed either
    let err = runtime.run_pod_sandbox(pod.clone()).await.unwrap_err();
    assert!(matches!(err, CallError::Hook(HookError::LifecycleViolation { .. })));

    assert_eq!(plugin.calls_for("uid-1"), [Event::RunPodSandbox]);
    assert_eq!(stats.out_of_order(), 2);
    assert_eq!(stats.rejected(), 2);

    // The sandbox can still move forward
    runtime.stop_pod_sandbox(pod).await.unwrap();
    assert_eq!(plugin.calls_for("uid-1"), [Event::RunPodSandbox, Event::StopPodSandbox]);
}

#[tokio::test]
async fn recreated_sandbox_of_the_same_pod_starts_fresh() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    let stub = Stub::with_options(
        plugin.clone(),
        transport,
        StubOptions::default().strict_lifecycle(true),
    );
    tokio::spawn(stub.run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    // The old sandbox is stopped but not removed yet when its replacement is set up
    let old = PodSandbox::new("default", "web", "pod-uid").with_id("sandbox-1");
    runtime.pre_setup_network(old.clone(), vec![]).await.unwrap();
    runtime.post_setup_network(old.clone(), vec![]).await.unwrap();
    runtime.run_pod_sandbox(old.clone()).await.unwrap();
    runtime.stop_pod_sandbox(old.clone()).await.unwrap();

    let new = PodSandbox::new("default", "web", "pod-uid").with_id("sandbox-2");
    runtime.pre_setup_network(new.clone(), vec![]).await.unwrap();
    runtime.remove_pod_sandbox(old).await.unwrap();
    runtime.post_setup_network(new, vec![]).await.unwrap();

    assert_eq!(
        plugin.calls_for("sandbox-1"),
        [
            Event::PreSetupNetwork,
            Event::PostSetupNetwork,
            Event::RunPodSandbox,
            Event::StopPodSandbox,
            Event::RemovePodSandbox,
        ]
    );
    assert_eq!(plugin.calls_for("sandbox-2"), [Event::PreSetupNetwork, Event::PostSetupNetwork]);
}

#[tokio::test]
async fn workers_are_released_without_a_removal_hook() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(Event::PreSetupNetwork.into());
    let (runtime, transport) = channel::pair(64);
    let stub = Stub::new(plugin.clone(), transport);
    let stats = stub.stats();
    tokio::spawn(stub.run());

    let events = runtime.configure("", "containerd", "2.0.0").await.unwrap();
    assert!(events.contains(Event::RemovePodSandbox));

    let pods: Vec<_> = (0..500)
        .map(|i| PodSandbox::new("default", format!("pod-{i}"), format!("uid-{i}")))
        .collect();

    for pod in &pods {
        runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    }
    assert_eq!(stats.active_sandboxes(), pods.len());

    for pod in &pods {
        runtime.remove_pod_sandbox(pod.clone()).await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(1), async {
        while stats.active_sandboxes() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // The plugin never sees the removals it did not ask for
    assert_eq!(plugin.calls().len(), pods.len());
    assert_eq!(stats.passthrough(), pods.len());
}

#[tokio::test]
async fn skipped_phases_are_allowed() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    tokio::spawn(Stub::new(plugin.clone(), transport).run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    let pod = PodSandbox::new("default", "web", "uid-1");
    runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    runtime.run_pod_sandbox(pod.clone()).await.unwrap();
    runtime.remove_pod_sandbox(pod).await.unwrap();

    assert_eq!(
        plugin.calls_for("uid-1"),
        [Event::PreSetupNetwork, Event::RunPodSandbox, Event::RemovePodSandbox]
    );
}

#[tokio::test]
async fn sandbox_key_is_reusable_after_removal() {
    let _ = tracing_subscriber::fmt::try_init();

    let plugin = Recorder::new(sandbox_events());
    let (runtime, transport) = channel::pair(16);
    tokio::spawn(Stub::new(plugin.clone(), transport).run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    // Without a UID the sandbox is keyed by namespace and name
    let pod = PodSandbox::new("default", "web", "");
    runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    runtime.remove_pod_sandbox(pod.clone()).await.unwrap();
    runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();

    assert_eq!(
        plugin.calls_for("default/web"),
        [Event::PreSetupNetwork, Event::RemovePodSandbox, Event::PreSetupNetwork]
    );
}
