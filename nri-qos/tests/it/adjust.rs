use super::*;

#[tokio::test]
async fn adjust_variant_returns_shaped_configurations() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    let stub = Stub::new(AdjustNetworkPlugin::default(), transport);
    let stats = stub.stats();
    let handle = tokio::spawn(stub.run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();
    assert_eq!(runtime.create_pod_sandbox_network_conf(vec![]).await.unwrap(), None);

    let pod = pod(Some("fast"));
    let configs =
        vec![NetworkConfiguration::new("eth0"), NetworkConfiguration::new("cni-loopback")];

    let adjusted = runtime.adjust_pod_sandbox_network(pod.clone(), configs).await.unwrap();

    assert_eq!(adjusted[0].bandwidth, Some(BandwidthSpec::ingress(1_000_000, 1_500_000)));
    assert_eq!(adjusted[1].bandwidth, None);

    // Setting up the network again after the adjustment is out of order, but the runtime owns
    // the order: the call is still answered, here with the pass-through reply.
    let caps = runtime.pre_setup_network(pod.clone(), vec![]).await.unwrap();
    assert!(caps.is_empty());
    assert_eq!(stats.out_of_order(), 1);
    assert_eq!(stats.rejected(), 0);

    runtime.run_pod_sandbox(pod).await.unwrap();
    runtime.shutdown().await.unwrap();
    handle.await.unwrap().unwrap();
}
