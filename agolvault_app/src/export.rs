use std::{
    fs,
    path::{Path, PathBuf},
};

use agolvault_core::{
    ids::OrgId,
    names::{geodatabase_file_name, sanitize_name},
    time::Clock,
};
use agolvault_gdb::{FeatureCollection, Geodatabase};
use agolvault_portal::{
    PortalClient, RestTransport,
    types::{ContentListing, LayerInfo},
};
use serde_json::Value;

use crate::AppError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub service: String,
    pub feature_classes: Vec<String>,
    pub skipped_layers: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub exported: Vec<ExportReport>,
}

impl BulkReport {
    pub fn feature_classes_written(&self) -> usize {
        self.exported
            .iter()
            .map(|report| report.feature_classes.len())
            .sum()
    }

    pub fn layers_skipped(&self) -> usize {
        self.exported
            .iter()
            .map(|report| report.skipped_layers.len())
            .sum()
    }
}

/// Downloads every layer of the selected feature services and materializes
/// them under the session directory: raw JSON per layer plus a feature class
/// per layer inside one geodatabase per service.
pub struct FeatureExporter<'a, T, K>
where
    T: RestTransport,
    K: Clock,
{
    client: &'a PortalClient<T, K>,
    org_id: OrgId,
}

impl<'a, T, K> FeatureExporter<'a, T, K>
where
    T: RestTransport,
    K: Clock,
{
    pub fn new(client: &'a PortalClient<T, K>, org_id: OrgId) -> Self {
        Self { client, org_id }
    }

    /// Export exactly one named feature service. The caller is waiting on
    /// this specific export, so the first per-layer failure aborts the whole
    /// operation.
    pub async fn export_single(
        &self,
        item_name: &str,
        dest: &Path,
    ) -> Result<ExportReport, AppError> {
        let service = sanitize_name(item_name);
        if service.is_empty() {
            return Err(AppError::UnusableTitle(item_name.to_owned()));
        }

        let layout = ExportLayout::create(dest, &service)?;
        let gdb = Geodatabase::create(&layout.geodatabase).await?;
        let metadata = self.client.service_layers(&self.org_id, item_name).await?;

        let mut report = ExportReport {
            service,
            ..ExportReport::default()
        };
        for layer in &metadata.layers {
            let payload = self
                .client
                .query_layer(&self.org_id, item_name, layer.id)
                .await?;
            let class_name = convert_layer(&layout, &gdb, layer, payload).await?;
            report.feature_classes.push(class_name);
        }

        Ok(report)
    }

    /// Export every hosted feature service in the listing; other item types
    /// are skipped silently. A failed per-layer query is logged and skipped
    /// so one bad layer cannot sink the whole run. Everything else stays
    /// fatal: metadata fetches, filesystem collisions, conversion failures.
    pub async fn export_bulk(
        &self,
        listing: &ContentListing,
        dest: &Path,
    ) -> Result<BulkReport, AppError> {
        let mut bulk = BulkReport::default();

        for item in &listing.items {
            if !item.is_hosted_feature_service() {
                continue;
            }

            log::info!("Saving {}", item.title);
            if let Some(url) = item.url.as_deref() {
                log::info!("URL: {url}");
            }

            // The REST service name is published in the item url; titles
            // routinely differ from it.
            let Some(service_name) = item.service_name() else {
                log::warn!("skipping '{}': item has no service url", item.title);
                continue;
            };
            let service = sanitize_name(&item.title);
            if service.is_empty() {
                log::warn!(
                    "skipping '{}': title sanitizes to an empty identifier",
                    item.title
                );
                continue;
            }

            let layout = ExportLayout::create(dest, &service)?;
            let gdb = Geodatabase::create(&layout.geodatabase).await?;
            let metadata = self
                .client
                .service_layers(&self.org_id, service_name)
                .await?;

            let mut report = ExportReport {
                service,
                ..ExportReport::default()
            };
            for layer in &metadata.layers {
                match self
                    .client
                    .query_layer(&self.org_id, service_name, layer.id)
                    .await
                {
                    Ok(payload) => {
                        let class_name = convert_layer(&layout, &gdb, layer, payload).await?;
                        report.feature_classes.push(class_name);
                    }
                    Err(error) => {
                        log::error!(
                            "query for layer '{}' of '{}' failed, skipping layer: {}",
                            layer.name,
                            item.title,
                            error.display_chain()
                        );
                        report.skipped_layers.push(layer.name.clone());
                    }
                }
            }

            bulk.exported.push(report);
        }

        Ok(bulk)
    }
}

/// Write the raw response to `{json}/{layer.name}.json`, then convert that
/// payload into a feature class named by the sanitized layer name.
async fn convert_layer(
    layout: &ExportLayout,
    gdb: &Geodatabase,
    layer: &LayerInfo,
    payload: Value,
) -> Result<String, AppError> {
    let json_path = layout.json_dir.join(format!("{}.json", layer.name));
    fs::write(&json_path, serde_json::to_string(&payload)?)?;

    let collection = FeatureCollection::decode(payload)?;
    let class_name = sanitize_name(&layer.name);
    gdb.create_feature_class(&class_name, &collection).await?;
    log::debug!(
        "layer '{}' -> feature class '{class_name}' ({} features)",
        layer.name,
        collection.features.len()
    );
    Ok(class_name)
}

struct ExportLayout {
    json_dir: PathBuf,
    geodatabase: PathBuf,
}

impl ExportLayout {
    /// `{dest}/{service}/` with its `json/` subfolder and the geodatabase
    /// path inside it. Plain `create_dir`: colliding with an existing export
    /// is a hard error, not something to silently merge into.
    fn create(dest: &Path, service: &str) -> Result<Self, AppError> {
        let service_dir = dest.join(service);
        fs::create_dir(&service_dir)?;

        let json_dir = service_dir.join("json");
        fs::create_dir(&json_dir)?;

        let geodatabase = service_dir.join(geodatabase_file_name(service));
        Ok(Self {
            json_dir,
            geodatabase,
        })
    }
}
