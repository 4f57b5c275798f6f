use nri::{
    channel, AdjustNetworkPlugin, CreateNetworkConf, NetworkConfiguration, PluginConfig,
    PodSandbox, Stub,
};

const CONFIG: &str = "
cfgParam1: demo
unknownClass: skip
classes:
  gold:
    capacity: 10
    bandwidth:
      ingressRate: 2000000
      ingressBurst: 2500000
      egressRate: 1000000
      egressBurst: 1200000
";

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    // Startup configuration, as it would be read from a file
    let config = PluginConfig::parse(CONFIG).unwrap();

    let (runtime, transport) = channel::pair(64);
    let plugin = tokio::spawn(Stub::new(AdjustNetworkPlugin::new(config), transport).run());

    runtime.configure("", "containerd", "2.0.0").await.unwrap();
    runtime.synchronize(vec![], vec![]).await.unwrap();

    let confs = vec![CreateNetworkConf {
        name: "eth0".to_string(),
        network_type: "bridge".to_string(),
        conf: String::new(),
    }];
    runtime.create_pod_sandbox_network_conf(confs).await.unwrap();

    for (name, class) in [("web", "gold"), ("batch", "bronze")] {
        let pod = PodSandbox::new("default", name, format!("uid-{name}")).with_label("net", class);
        let configs = vec![NetworkConfiguration::new("eth0")];

        let adjusted = runtime.adjust_pod_sandbox_network(pod.clone(), configs).await.unwrap();
        println!("{pod} ({class}): {:?}", adjusted[0].bandwidth);

        runtime.run_pod_sandbox(pod).await.unwrap();
    }

    runtime.shutdown().await.unwrap();

    if let Err(e) = plugin.await.unwrap() {
        tracing::error!(error = %e, "Plugin exited");
        std::process::exit(1);
    }
}
