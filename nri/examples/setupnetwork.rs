use nri::{channel, CniConfig, NetworkResult, PodSandbox, SetupNetworkPlugin, Stub, StubOptions};

/// Usage: `setupnetwork [name] [idx]`
#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut args = std::env::args().skip(1);
    let mut options = StubOptions::default();
    if let Some(name) = args.next() {
        options = options.name(name);
    }
    if let Some(idx) = args.next() {
        options = options.idx(idx);
    }

    // The runtime side of the connection, played by this example
    let (runtime, transport) = channel::pair(64);

    let stub = Stub::with_options(SetupNetworkPlugin::default(), transport, options)
        .with_on_close(|| std::process::exit(0));
    let plugin = tokio::spawn(stub.run());

    let events = runtime.configure("cfgParam1: demo", "containerd", "2.0.0").await.unwrap();
    println!("Subscribed to: {:?}", events);

    let pod = PodSandbox::new("default", "nginx", "6f1c").with_annotation("net", "normal");
    let configs = vec![
        CniConfig::new("eth0", r#"{"cniVersion":"1.0.0","name":"eth0","type":"bridge"}"#),
        CniConfig::new("cni-loopback", r#"{"cniVersion":"1.0.0","name":"cni-loopback"}"#),
    ];

    let caps = runtime.pre_setup_network(pod.clone(), configs).await.unwrap();
    for caps in &caps {
        for (key, payload) in &caps.capabilities {
            println!("{}: {} = {}", caps.name, key, String::from_utf8_lossy(payload));
        }
    }

    runtime
        .post_setup_network(pod.clone(), vec![NetworkResult::new("eth0", "1.0.0")])
        .await
        .unwrap();
    runtime.run_pod_sandbox(pod.clone()).await.unwrap();
    runtime.post_network_deleted(pod.clone()).await.unwrap();
    runtime.stop_pod_sandbox(pod.clone()).await.unwrap();
    runtime.remove_pod_sandbox(pod).await.unwrap();

    // Hanging up makes the plugin exit through its close callback
    drop(runtime);

    if let Err(e) = plugin.await.unwrap() {
        tracing::error!(error = %e, "Plugin exited");
        std::process::exit(1);
    }
}
