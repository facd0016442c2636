//! List calls against a mock Kubernetes API server

use std::time::Duration;

use kubescout_k8s::{
    CallContext, ClusterSession, ConfigSource, Error, PodListOptions, list_extended_workloads,
    list_namespaces, list_pod_status, status_rank,
};
use regex::Regex;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> ClusterSession {
    let config = kube::Config::new(server.uri().parse().unwrap());
    ClusterSession::from_config(config, ConfigSource::Custom).unwrap()
}

fn list(kind: &str, api_version: &str, items: Vec<Value>) -> Value {
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": { "resourceVersion": "100" },
        "items": items,
    })
}

fn namespace(name: &str, annotations: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": { "kubernetes.io/metadata.name": name },
            "annotations": annotations,
            "creationTimestamp": "2024-01-15T10:00:00Z"
        },
        "status": { "phase": "Active" }
    })
}

fn container_status(name: &str, ready: bool, restarts: i32, state: Value) -> Value {
    json!({
        "name": name,
        "image": format!("registry.example.com/{}:1.0", name),
        "imageID": "",
        "ready": ready,
        "restartCount": restarts,
        "state": state
    })
}

fn pod(name: &str, phase: &str, statuses: Vec<Value>) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": "shop",
            "creationTimestamp": "2024-01-15T10:00:00Z"
        },
        "spec": {
            "nodeName": "node-1",
            "containers": [{ "name": "app", "image": "registry.example.com/app:1.0" }]
        },
        "status": {
            "phase": phase,
            "podIP": "10.0.0.7",
            "qosClass": "BestEffort",
            "containerStatuses": statuses
        }
    })
}

fn running() -> Value {
    json!({ "running": { "startedAt": "2024-01-15T10:01:00Z" } })
}

fn waiting(reason: &str) -> Value {
    json!({ "waiting": { "reason": reason } })
}

fn shop_pods() -> Value {
    list(
        "PodList",
        "v1",
        vec![
            pod("web-2", "Running", vec![container_status("app", true, 0, running())]),
            pod("web-1", "Running", vec![container_status("app", true, 6, running())]),
            pod("cart", "Running", vec![container_status("app", false, 9, waiting("CrashLoopBackOff"))]),
            pod("queue", "Pending", vec![]),
            pod("img", "Pending", vec![container_status("app", false, 0, waiting("ImagePullBackOff"))]),
        ],
    )
}

#[tokio::test]
async fn namespaces_are_sorted_and_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list(
            "NamespaceList",
            "v1",
            vec![
                namespace("zeta", json!({ "team": "core" })),
                namespace(
                    "alpha",
                    json!({ "kubectl.kubernetes.io/last-applied-configuration": "{}" }),
                ),
                namespace("mid", json!({})),
            ],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let records = list_namespaces(&session, None, &CallContext::new())
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["alpha", "mid", "zeta"]);
    assert_eq!(records[0].annotations, None);
    assert_eq!(records[1].annotations, None);
    assert_eq!(
        records[2]
            .annotations
            .as_ref()
            .and_then(|a| a.get("team"))
            .map(String::as_str),
        Some("core")
    );
    assert!(records.iter().all(|r| r.status == "Active"));
    assert!(records.iter().all(|r| r.age.ends_with('h') || r.age.ends_with('d')));
}

#[tokio::test]
async fn namespace_label_selector_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .and(query_param("labelSelector", "env=prod,tier=web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list(
            "NamespaceList",
            "v1",
            vec![namespace("prod-web", json!({}))],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let records = list_namespaces(&session, Some("env=prod,tier=web"), &CallContext::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn namespace_api_error_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "namespaces is forbidden",
            "reason": "Forbidden",
            "code": 403
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = list_namespaces(&session, None, &CallContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { .. }));
    assert_eq!(err.status_code(), Some(403));
    assert!(err.to_string().starts_with("failed to list namespaces: "));
    assert!(!err.is_cancellation());
}

#[tokio::test]
async fn pods_are_ordered_by_severity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/shop/pods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shop_pods()))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let records = list_pod_status(&session, "shop", &PodListOptions::default(), &CallContext::new())
        .await
        .unwrap();

    let order: Vec<_> = records
        .iter()
        .map(|r| (r.name.as_str(), r.status.as_str()))
        .collect();
    assert_eq!(
        order,
        [
            ("cart", "CrashLoopBackOff"),
            ("img", "ImagePullBackOff"),
            ("queue", "Pending"),
            ("web-1", "Running"),
            ("web-2", "Running"),
        ]
    );

    for pair in records.windows(2) {
        let (a, b) = (status_rank(&pair[0].status), status_rank(&pair[1].status));
        assert!(a < b || (a == b && pair[0].name < pair[1].name));
    }

    let ready = Regex::new(r"^\d+/\d+$").unwrap();
    for record in &records {
        assert!(ready.is_match(&record.ready), "bad ready: {}", record.ready);
        let (done, total) = record.ready.split_once('/').unwrap();
        assert!(done.parse::<usize>().unwrap() <= total.parse::<usize>().unwrap());
    }
    assert_eq!(records[2].ready, "0/1");
    assert_eq!(records[0].restarts, 9);
    assert_eq!(records[0].node.as_deref(), Some("node-1"));
}

#[tokio::test]
async fn only_unhealthy_keeps_restart_heavy_pods() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/shop/pods"))
        .and(query_param("labelSelector", "app=web"))
        .and(query_param("fieldSelector", "spec.nodeName=node-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shop_pods()))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let opts = PodListOptions::default()
        .with_labels("app=web")
        .with_fields("spec.nodeName=node-1")
        .unhealthy_only();
    let records = list_pod_status(&session, "shop", &opts, &CallContext::new())
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["cart", "img", "queue", "web-1"]);
}

#[tokio::test]
async fn empty_namespace_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shop_pods()))
        .expect(0)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = list_pod_status(&session, "", &PodListOptions::default(), &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingArgument("namespace")));

    let err = list_extended_workloads(&session, "", &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingArgument("namespace")));
}

#[tokio::test]
async fn cancelled_context_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(shop_pods()))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::new().with_cancellation(token);

    let session = session_for(&server);
    let err = list_pod_status(&session, "shop", &PodListOptions::default(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn slow_server_hits_the_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list("NamespaceList", "v1", vec![]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let session = session_for(&server);
    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let err = list_namespaces(&session, None, &ctx).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn workloads_skip_unserved_apis() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/apps.kruise.io/v1alpha1/namespaces/shop/clonesets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list(
            "CloneSetList",
            "apps.kruise.io/v1alpha1",
            vec![
                json!({
                    "apiVersion": "apps.kruise.io/v1alpha1",
                    "kind": "CloneSet",
                    "metadata": { "name": "web", "namespace": "shop" },
                    "spec": { "replicas": 3 },
                    "status": { "readyReplicas": 3 }
                }),
                json!({
                    "apiVersion": "apps.kruise.io/v1alpha1",
                    "kind": "CloneSet",
                    "metadata": { "name": "api", "namespace": "shop" },
                    "spec": { "replicas": 2 }
                }),
            ],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apis/argoproj.io/v1alpha1/namespaces/shop/rollouts"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "the server could not find the requested resource",
            "reason": "NotFound",
            "code": 404
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let records = list_extended_workloads(&session, "shop", &CallContext::new())
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["api", "web"]);
    assert_eq!(records[0].replica_status(), "0/2");
    assert_eq!(records[1].replica_status(), "3/3");
    assert!(records.iter().all(|r| r.kind == "CloneSet"));
}
