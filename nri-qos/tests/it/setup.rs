use super::*;

#[tokio::test]
async fn normal_pod_over_the_full_lifecycle() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    let stub = Stub::new(SetupNetworkPlugin::default(), transport);
    let stats = stub.stats();
    let handle = tokio::spawn(stub.run());

    runtime.configure("cfgParam1: hello", "containerd", "2.0.0").await.unwrap();

    let pod = pod(Some("normal"));
    let configs = vec![
        CniConfig::new("eth0", r#"{"cniVersion":"1.0.0","name":"eth0"}"#),
        CniConfig::new("cni-loopback", r#"{"cniVersion":"1.0.0","name":"cni-loopback"}"#),
    ];

    let caps = runtime.pre_setup_network(pod.clone(), configs).await.unwrap();

    assert_eq!(caps.len(), 1);
    assert_eq!(caps[0].name, "eth0");
    let bandwidth = decode_bandwidth(caps[0].get(BANDWIDTH_CAPABILITY).unwrap()).unwrap();
    assert_eq!(bandwidth.ingress_rate, 500_000);
    assert_eq!(bandwidth.ingress_burst, 550_000);

    let results = vec![nri_api::NetworkResult::new("eth0", "1.0.0")];
    assert_eq!(runtime.post_setup_network(pod.clone(), results.clone()).await.unwrap(), results);

    runtime.run_pod_sandbox(pod.clone()).await.unwrap();
    // Not implemented by the plugin, answered by the stub
    runtime.pre_network_deleted(pod.clone()).await.unwrap();
    runtime.post_network_deleted(pod.clone()).await.unwrap();
    runtime.stop_pod_sandbox(pod.clone()).await.unwrap();
    runtime.remove_pod_sandbox(pod).await.unwrap();

    assert_eq!(stats.dispatched(), 6);
    assert_eq!(stats.passthrough(), 1);
    assert_eq!(stats.failed(), 0);

    runtime.shutdown().await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_sibling_does_not_block_capabilities() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    tokio::spawn(Stub::new(SetupNetworkPlugin::default(), transport).run());
    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    let configs = vec![
        CniConfig::new("broken", r#"{"name":"broken","qos":["fast"]}"#),
        CniConfig::new(
            "tenant",
            r#"{"name":"tenant","qos":{"fast":{"capacity":3,"bandwidth":{"ingressRate":42,"ingressBurst":43}}}}"#,
        ),
        CniConfig::new("eth0", "{}"),
    ];

    let caps = runtime.pre_setup_network(pod(Some("fast")), configs).await.unwrap();

    let decoded: Vec<_> = caps
        .iter()
        .map(|c| (c.name.as_str(), decode_bandwidth(c.get(BANDWIDTH_CAPABILITY).unwrap()).unwrap()))
        .collect();

    assert_eq!(
        decoded,
        [
            ("tenant", BandwidthSpec::ingress(42, 43)),
            ("eth0", BandwidthSpec::ingress(1_000_000, 1_500_000)),
        ]
    );
}

#[tokio::test]
async fn unclassified_pods_get_the_same_default_everywhere() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    tokio::spawn(Stub::new(SetupNetworkPlugin::default(), transport).run());
    runtime.configure("", "containerd", "2.0.0").await.unwrap();

    let configs = vec![CniConfig::new("eth0", "{}"), CniConfig::new("eth1", "{}")];
    let caps = runtime.pre_setup_network(pod(None), configs).await.unwrap();

    assert_eq!(caps.len(), 2);
    for caps in caps {
        let bandwidth = decode_bandwidth(caps.get(BANDWIDTH_CAPABILITY).unwrap()).unwrap();
        assert_eq!(bandwidth, nri_qos::DEFAULT_BANDWIDTH);
    }
}

#[tokio::test]
async fn strict_policy_emits_nothing_for_unclassified_pods() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    tokio::spawn(Stub::new(SetupNetworkPlugin::default(), transport).run());
    runtime.configure("missingClass: skip", "containerd", "2.0.0").await.unwrap();

    let configs = vec![CniConfig::new("eth0", "{}"), CniConfig::new("eth1", "{}")];
    let caps = runtime.pre_setup_network(pod(None), configs).await.unwrap();

    assert!(caps.is_empty());
}
