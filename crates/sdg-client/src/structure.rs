//! SDMX structure-endpoint client.
//!
//! Fetches dataflow structure definitions as SDMX-JSON and converts them
//! into [`DataflowSchema`] values for the schema cache and the sync
//! engine.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use sdg_metadata::{MetadataError, StructureProvider};
use sdg_model::{DataflowSchema, DimensionMeta};

use crate::config::ClientConfig;
use crate::transport::Transport;

/// Enumerated value lists are capped at this many codes; larger codelists
/// are truncated and marked non-exhaustive.
const MAX_ENUMERATED_VALUES: usize = 1000;

/// One dataflow as listed by the structure endpoint.
#[derive(Debug, Clone)]
pub struct DataflowStub {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// Structure-endpoint client.
pub struct StructureClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl StructureClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// All dataflows owned by the configured agency.
    pub fn list_dataflows(&self) -> Result<Vec<DataflowStub>, MetadataError> {
        let url = format!(
            "{base}/dataflow/{agency}?format=sdmx-json&detail=allstubs",
            base = self.config.base_url,
            agency = self.config.agency,
        );
        let message = self.get_structure(&url, "all")?;
        Ok(message
            .data
            .dataflows
            .into_iter()
            .map(|flow| DataflowStub {
                name: display_name(&flow.name, &flow.id),
                id: flow.id,
                version: flow.version,
            })
            .collect())
    }

    fn get_structure(&self, url: &str, dataflow: &str) -> Result<StructureMessage, MetadataError> {
        let response =
            self.transport
                .get(url)
                .map_err(|error| MetadataError::Structure {
                    dataflow: dataflow.to_string(),
                    message: error.to_string(),
                })?;
        if !response.is_success() {
            return Err(MetadataError::Structure {
                dataflow: dataflow.to_string(),
                message: format!("HTTP {}", response.status),
            });
        }
        serde_json::from_str(&response.body).map_err(|error| MetadataError::Structure {
            dataflow: dataflow.to_string(),
            message: format!("malformed structure message: {error}"),
        })
    }
}

impl StructureProvider for StructureClient {
    fn dataflow_schema(&self, dataflow_id: &str) -> Result<DataflowSchema, MetadataError> {
        let url = format!(
            "{base}/dataflow/{agency}/{id}/{version}?format=sdmx-json&references=children",
            base = self.config.base_url,
            agency = self.config.agency,
            id = dataflow_id,
            version = self.config.dataflow_version,
        );
        debug!(dataflow = dataflow_id, "fetching structure definition");
        let message = self.get_structure(&url, dataflow_id)?;
        Ok(schema_from_message(dataflow_id, &message))
    }
}

/// Convert a parsed structure message into the cached schema shape.
fn schema_from_message(dataflow_id: &str, message: &StructureMessage) -> DataflowSchema {
    let flow = message.data.dataflows.first();
    let components = message
        .data
        .data_structures
        .first()
        .map(|ds| &ds.components);

    let mut dimensions = Vec::new();
    if let Some(components) = components {
        for (index, dim) in components.dimension_list.dimensions.iter().enumerate() {
            let codelist = dim
                .local_representation
                .as_ref()
                .and_then(|rep| rep.enumeration.as_deref())
                .and_then(codelist_id_from_urn);
            let mut values: Vec<String> = codelist
                .as_deref()
                .and_then(|id| message.data.codelists.iter().find(|cl| cl.id == id))
                .map(|cl| cl.codes.iter().map(|c| c.id.clone()).collect())
                .unwrap_or_default();

            let is_exhaustive = values.len() <= MAX_ENUMERATED_VALUES && !values.is_empty();
            let (values_min, values_max) = if values.len() > MAX_ENUMERATED_VALUES {
                let min = values.first().cloned();
                let max = values.last().cloned();
                values.truncate(MAX_ENUMERATED_VALUES);
                (min, max)
            } else {
                (None, None)
            };

            dimensions.push(DimensionMeta {
                id: dim.id.clone(),
                position: dim.position.unwrap_or(index),
                codelist,
                values,
                values_min,
                values_max,
                is_exhaustive,
            });
        }
        dimensions.sort_by_key(|d| d.position);
    }

    DataflowSchema {
        id: dataflow_id.to_string(),
        name: flow.map(|f| display_name(&f.name, &f.id)).unwrap_or_default(),
        version: flow
            .map(|f| f.version.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "1.0".to_string()),
        dimensions,
        time_dimension: components
            .and_then(|c| c.dimension_list.time_dimensions.first())
            .map(|d| d.id.clone())
            .unwrap_or_else(|| "TIME_PERIOD".to_string()),
        primary_measure: components
            .and_then(|c| c.measure_list.primary_measure.as_ref())
            .map(|m| m.id.clone())
            .unwrap_or_else(|| "OBS_VALUE".to_string()),
        attributes: components
            .map(|c| c.attribute_list.attributes.iter().map(|a| a.id.clone()).collect())
            .unwrap_or_default(),
    }
}

/// `urn:...Codelist=UNICEF:CL_SEX(1.0)` -> `CL_SEX`
fn codelist_id_from_urn(urn: &str) -> Option<String> {
    let tail = urn.split("Codelist=").nth(1)?;
    let after_agency = tail.split(':').next_back()?;
    let id = after_agency.split('(').next()?.trim();
    if id.is_empty() { None } else { Some(id.to_string()) }
}

/// SDMX-JSON names are either a plain string or a locale map.
fn display_name(name: &serde_json::Value, fallback: &str) -> String {
    match name {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("en")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(fallback)
            .to_string(),
        _ => fallback.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct StructureMessage {
    #[serde(default)]
    data: StructureData,
}

#[derive(Debug, Default, Deserialize)]
struct StructureData {
    #[serde(default)]
    dataflows: Vec<DataflowJson>,
    #[serde(default, rename = "dataStructures")]
    data_structures: Vec<DataStructureJson>,
    #[serde(default)]
    codelists: Vec<CodelistJson>,
}

#[derive(Debug, Default, Deserialize)]
struct DataflowJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: serde_json::Value,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Default, Deserialize)]
struct DataStructureJson {
    #[serde(default, rename = "dataStructureComponents")]
    components: ComponentsJson,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentsJson {
    #[serde(default, rename = "dimensionList")]
    dimension_list: DimensionListJson,
    #[serde(default, rename = "measureList")]
    measure_list: MeasureListJson,
    #[serde(default, rename = "attributeList")]
    attribute_list: AttributeListJson,
}

#[derive(Debug, Default, Deserialize)]
struct DimensionListJson {
    #[serde(default)]
    dimensions: Vec<ComponentJson>,
    #[serde(default, rename = "timeDimensions")]
    time_dimensions: Vec<ComponentJson>,
}

#[derive(Debug, Default, Deserialize)]
struct MeasureListJson {
    #[serde(default, rename = "primaryMeasure")]
    primary_measure: Option<ComponentJson>,
}

#[derive(Debug, Default, Deserialize)]
struct AttributeListJson {
    #[serde(default)]
    attributes: Vec<ComponentJson>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    position: Option<usize>,
    #[serde(default, rename = "localRepresentation")]
    local_representation: Option<LocalRepresentationJson>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalRepresentationJson {
    #[serde(default)]
    enumeration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CodelistJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    codes: Vec<CodeJson>,
}

#[derive(Debug, Default, Deserialize)]
struct CodeJson {
    #[serde(default)]
    id: String,
}
