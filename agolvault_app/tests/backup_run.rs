use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use agolvault_app::{AppError, BackupMode, BackupOptions, run_backup_with_clock};
use agolvault_core::time::{Clock, Timestamp};
use agolvault_gdb::{FeatureCollection, Geodatabase};
use agolvault_portal::{
    Credentials, PortalConfig, PortalError, PortalResult, RestTransport, transport::Param,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::tempdir;

#[derive(Clone, Copy)]
struct FixedClock {
    now: Timestamp,
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

/// Scripted portal: routes each request by URL the way the live service
/// would, so the client under test follows its real code paths (including
/// the error-sentinel check) without a network.
struct MockPortal {
    token_response: Value,
    profile: Value,
    listing: Value,
    services: HashMap<String, Value>,
    queries: HashMap<(String, i64), Value>,
    requests: Mutex<Vec<String>>,
}

impl MockPortal {
    fn new(listing: Value) -> Self {
        Self {
            token_response: json!({"token": "tok-1", "expires": 4_000_000_000_000_i64}),
            profile: json!({"username": "gis_admin", "orgId": "ORG77"}),
            listing,
            services: HashMap::new(),
            queries: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_service(mut self, name: &str, layers: Value) -> Self {
        self.services.insert(name.to_owned(), json!({"layers": layers}));
        self
    }

    fn with_query(mut self, service: &str, layer_id: i64, response: Value) -> Self {
        self.queries.insert((service.to_owned(), layer_id), response);
        self
    }

    fn recorded(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn query_calls(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|url| url.ends_with("/query"))
            .count()
    }

    fn route(&self, url: &str) -> PortalResult<Value> {
        if url.contains("/sharing/rest/community/users/") {
            return Ok(self.profile.clone());
        }
        if url.contains("/sharing/rest/content/users/") {
            return Ok(self.listing.clone());
        }

        let services_prefix = "https://services.arcgis.com/ORG77/arcgis/rest/services/";
        if let Some(rest) = url.strip_prefix(services_prefix) {
            if let Some(service) = rest.strip_suffix("/FeatureServer") {
                return self
                    .services
                    .get(service)
                    .cloned()
                    .ok_or_else(|| PortalError::message(format!("unknown service {service}")));
            }

            let segments: Vec<&str> = rest.split('/').collect();
            if segments.len() == 4 && segments[1] == "FeatureServer" && segments[3] == "query" {
                let layer_id: i64 = segments[2].parse().expect("numeric layer id");
                return self
                    .queries
                    .get(&(segments[0].to_owned(), layer_id))
                    .cloned()
                    .ok_or_else(|| PortalError::message(format!("unknown layer {url}")));
            }
        }

        Err(PortalError::message(format!("unexpected url {url}")))
    }
}

/// Local newtype over the shared mock so this external test can implement the
/// portal's `RestTransport` trait: the orphan rule forbids `impl RestTransport
/// for Arc<MockPortal>` here (both the trait and `Arc` are foreign), but a
/// local wrapper type is allowed.
#[derive(Clone)]
struct SharedPortal(Arc<MockPortal>);

#[async_trait]
impl RestTransport for SharedPortal {
    async fn get_json(&self, url: &str, _params: &[Param]) -> PortalResult<Value> {
        self.0.requests.lock().expect("requests lock").push(url.to_owned());
        self.0.route(url)
    }

    async fn post_form(&self, url: &str, _params: &[Param]) -> PortalResult<Value> {
        self.0.requests.lock().expect("requests lock").push(url.to_owned());
        Ok(self.0.token_response.clone())
    }
}

fn clock() -> FixedClock {
    FixedClock {
        now: Timestamp::from_epoch_secs(1_700_000_000).expect("valid epoch seconds"),
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "gis_admin".to_owned(),
        password: "hunter2".to_owned(),
    }
}

fn hosted_item(title: &str, service: &str) -> Value {
    json!({
        "id": format!("id-{service}"),
        "type": "Feature Service",
        "title": title,
        "url": format!("https://services.arcgis.com/ORG77/arcgis/rest/services/{service}/FeatureServer"),
        "typeKeywords": ["ArcGIS Server", "Hosted Service"],
    })
}

fn point_features(names: &[&str]) -> Value {
    let features: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            json!({
                "attributes": {"OBJECTID": index as i64 + 1, "NAME": name},
                "geometry": {"x": -122.4 - index as f64, "y": 37.7},
            })
        })
        .collect();
    json!({
        "geometryType": "esriGeometryPoint",
        "spatialReference": {"wkid": 4326},
        "fields": [
            {"name": "OBJECTID", "type": "esriFieldTypeOID"},
            {"name": "NAME", "type": "esriFieldTypeString"},
        ],
        "features": features,
    })
}

fn api_error(message: &str) -> Value {
    json!({"error": {"message": message, "details": ["try again later"]}})
}

fn options(save_location: &Path, mode: BackupMode) -> BackupOptions {
    BackupOptions {
        save_location: save_location.to_path_buf(),
        mode,
    }
}

#[tokio::test]
async fn bulk_backup_exports_only_hosted_feature_services() {
    let temp_dir = tempdir().expect("tempdir");
    let listing = json!({"items": [
        hosted_item("Trail Heads", "TrailHeads"),
        {"id": "id-map", "type": "Web Map", "title": "Base Map", "typeKeywords": ["Map"]},
        {"id": "id-ext", "type": "Feature Service", "title": "External Mirror",
         "url": "https://example.com/arcgis/rest/services/External/FeatureServer",
         "typeKeywords": ["Metadata"]},
    ]});
    let portal = Arc::new(
        MockPortal::new(listing)
            .with_service(
                "TrailHeads",
                json!([{"id": 0, "name": "Trails"}, {"id": 1, "name": "Trail Heads!"}]),
            )
            .with_query("TrailHeads", 0, point_features(&["North gate", "South gate"]))
            .with_query("TrailHeads", 1, point_features(&["Summit"])),
    );

    let summary = run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(temp_dir.path(), BackupMode::Bulk),
        clock(),
    )
    .await
    .expect("bulk backup should succeed");

    assert_eq!(summary.services_exported, 1);
    assert_eq!(summary.feature_classes_written, 2);
    assert_eq!(summary.layers_skipped, 0);

    let session_root = temp_dir.path().join("backup").join("2023-11-14-221320");
    assert_eq!(summary.session_root, session_root);
    assert!(session_root.join("itemdata-2023-11-14-221320.json").is_file());

    // Exactly the hosted feature service got a folder; one query per layer.
    assert!(session_root.join("TrailHeads").is_dir());
    assert!(!session_root.join("BaseMap").exists());
    assert!(!session_root.join("ExternalMirror").exists());
    assert_eq!(portal.query_calls(), 2);

    let json_dir = session_root.join("TrailHeads").join("json");
    assert!(json_dir.join("Trails.json").is_file());
    assert!(json_dir.join("Trail Heads!.json").is_file());

    let gdb = Geodatabase::open(
        session_root
            .join("TrailHeads")
            .join("export_TrailHeads.gdb"),
    )
    .await
    .expect("open geodatabase");
    assert_eq!(gdb.feature_count("Trails").await.expect("count"), 2);
    assert_eq!(gdb.feature_count("TrailHeads").await.expect("count"), 1);
}

#[tokio::test]
async fn written_json_and_feature_class_agree_on_schema_and_count() {
    let temp_dir = tempdir().expect("tempdir");
    let listing = json!({"items": [hosted_item("Wells", "Wells")]});
    let portal = Arc::new(
        MockPortal::new(listing)
            .with_service("Wells", json!([{"id": 0, "name": "Active Wells"}]))
            .with_query("Wells", 0, point_features(&["W-1", "W-2", "W-3"])),
    );

    run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(temp_dir.path(), BackupMode::Bulk),
        clock(),
    )
    .await
    .expect("backup should succeed");

    let service_dir = temp_dir
        .path()
        .join("backup")
        .join("2023-11-14-221320")
        .join("Wells");
    let raw = std::fs::read_to_string(service_dir.join("json").join("Active Wells.json"))
        .expect("read layer json");
    let collection = FeatureCollection::decode(serde_json::from_str(&raw).expect("parse json"))
        .expect("decode collection");

    let gdb = Geodatabase::open(service_dir.join("export_Wells.gdb"))
        .await
        .expect("open geodatabase");
    let columns = gdb.column_names("ActiveWells").await.expect("columns");

    assert_eq!(
        gdb.feature_count("ActiveWells").await.expect("count"),
        collection.features.len() as i64
    );
    for field in collection.field_names() {
        assert!(columns.iter().any(|column| column == field));
    }
}

#[tokio::test]
async fn bulk_run_survives_one_failed_layer_query() {
    let temp_dir = tempdir().expect("tempdir");
    let listing = json!({"items": [
        hosted_item("Alpha", "Alpha"),
        hosted_item("Bravo", "Bravo"),
        hosted_item("Charlie", "Charlie"),
    ]});
    let portal = Arc::new(
        MockPortal::new(listing)
            .with_service("Alpha", json!([{"id": 0, "name": "AlphaLayer"}]))
            .with_service("Bravo", json!([{"id": 0, "name": "BravoLayer"}]))
            .with_service("Charlie", json!([{"id": 0, "name": "CharlieLayer"}]))
            .with_query("Alpha", 0, point_features(&["a"]))
            .with_query("Bravo", 0, api_error("layer query limit exceeded"))
            .with_query("Charlie", 0, point_features(&["c1", "c2"])),
    );

    let summary = run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(temp_dir.path(), BackupMode::Bulk),
        clock(),
    )
    .await
    .expect("bulk backup must not abort on one bad layer");

    assert_eq!(summary.services_exported, 3);
    assert_eq!(summary.feature_classes_written, 2);
    assert_eq!(summary.layers_skipped, 1);

    let session_root = temp_dir.path().join("backup").join("2023-11-14-221320");
    let alpha = Geodatabase::open(session_root.join("Alpha").join("export_Alpha.gdb"))
        .await
        .expect("open alpha");
    assert_eq!(alpha.feature_count("AlphaLayer").await.expect("count"), 1);

    let charlie = Geodatabase::open(session_root.join("Charlie").join("export_Charlie.gdb"))
        .await
        .expect("open charlie");
    assert_eq!(
        charlie.feature_count("CharlieLayer").await.expect("count"),
        2
    );

    // The failed item keeps its (empty) folder and geodatabase: zero
    // feature classes, zero layer json files.
    let bravo = Geodatabase::open(session_root.join("Bravo").join("export_Bravo.gdb"))
        .await
        .expect("open bravo");
    assert!(bravo.feature_classes().await.expect("catalog").is_empty());
    let bravo_json: Vec<_> = std::fs::read_dir(session_root.join("Bravo").join("json"))
        .expect("bravo json dir")
        .collect();
    assert!(bravo_json.is_empty());
}

#[tokio::test]
async fn single_export_writes_one_file_and_class_per_layer() {
    let temp_dir = tempdir().expect("tempdir");
    let portal = Arc::new(
        MockPortal::new(json!({"items": []}))
            .with_service(
                "Wells",
                json!([{"id": 0, "name": "Active"}, {"id": 1, "name": "Capped"}, {"id": 2, "name": "Dry"}]),
            )
            .with_query("Wells", 0, point_features(&["w1"]))
            .with_query("Wells", 1, point_features(&["w2"]))
            .with_query("Wells", 2, point_features(&["w3"])),
    );

    let summary = run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(
            temp_dir.path(),
            BackupMode::Single {
                item_name: "Wells".to_owned(),
            },
        ),
        clock(),
    )
    .await
    .expect("single export should succeed");

    assert_eq!(summary.feature_classes_written, 3);
    assert_eq!(portal.query_calls(), 3);

    let json_dir = temp_dir
        .path()
        .join("backup")
        .join("2023-11-14-221320")
        .join("Wells")
        .join("json");
    let files: Vec<_> = std::fs::read_dir(json_dir).expect("json dir").collect();
    assert_eq!(files.len(), 3);
}

#[tokio::test]
async fn single_export_aborts_on_layer_query_error() {
    let temp_dir = tempdir().expect("tempdir");
    let portal = Arc::new(
        MockPortal::new(json!({"items": []}))
            .with_service("Wells", json!([{"id": 0, "name": "Active"}]))
            .with_query("Wells", 0, api_error("layer offline")),
    );

    let err = run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(
            temp_dir.path(),
            BackupMode::Single {
                item_name: "Wells".to_owned(),
            },
        ),
        clock(),
    )
    .await
    .expect_err("single export must abort");

    assert!(matches!(
        err,
        AppError::Portal(PortalError::Api { .. })
    ));

    // The geodatabase was created before the query, but no feature class
    // and no layer json made it in.
    let service_dir = temp_dir
        .path()
        .join("backup")
        .join("2023-11-14-221320")
        .join("Wells");
    let gdb = Geodatabase::open(service_dir.join("export_Wells.gdb"))
        .await
        .expect("open geodatabase");
    assert!(gdb.feature_classes().await.expect("catalog").is_empty());
    let json_files: Vec<_> = std::fs::read_dir(service_dir.join("json"))
        .expect("json dir")
        .collect();
    assert!(json_files.is_empty());
}

#[tokio::test]
async fn auth_rejection_stops_the_run_before_any_api_call() {
    let temp_dir = tempdir().expect("tempdir");
    let mut portal = MockPortal::new(json!({"items": []}));
    portal.token_response = api_error("Invalid username or password.");
    let portal = Arc::new(portal);

    let err = run_backup_with_clock(
        SharedPortal(Arc::clone(&portal)),
        PortalConfig::default(),
        &credentials(),
        &options(temp_dir.path(), BackupMode::Bulk),
        clock(),
    )
    .await
    .expect_err("auth rejection must be fatal");

    assert!(matches!(err, AppError::Portal(PortalError::Auth { .. })));
    assert_eq!(portal.recorded().len(), 1, "only the token request fires");
    assert!(
        !temp_dir.path().join("backup").exists(),
        "no session directory is created for a rejected run"
    );
}
