use nri_api::{BandwidthSpec, CniConfig, HookError, NetworkConfiguration, PodSandbox};
use nri_qos::{
    capability::decode_bandwidth, AdjustNetworkPlugin, SetupNetworkPlugin, BANDWIDTH_CAPABILITY,
};
use nri_stub::{
    channel::{self, CallError},
    Stub, StubError,
};

mod adjust;
mod setup;

fn pod(class: Option<&str>) -> PodSandbox {
    let pod = PodSandbox::new("default", "web", "uid-1");
    match class {
        Some(class) => pod.with_annotation("net", class),
        None => pod,
    }
}

#[tokio::test]
async fn malformed_configure_blob_aborts_the_stub() {
    let _ = tracing_subscriber::fmt::try_init();

    let (runtime, transport) = channel::pair(16);
    let handle = tokio::spawn(Stub::new(SetupNetworkPlugin::default(), transport).run());

    let err = runtime.configure("missingClass: [", "containerd", "2.0.0").await.unwrap_err();
    assert!(matches!(err, CallError::Hook(HookError::ConfigParse(_))));

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, StubError::Configure(HookError::ConfigParse(_))));
}
