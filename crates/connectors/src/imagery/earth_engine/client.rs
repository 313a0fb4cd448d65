use super::{
    expr,
    models::{ComputeValueResponse, ErrorEnvelope, ListImagesResponse, Operation},
};
use crate::error::ConnectorError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use engine_core::{
    connectors::source::{ExportRequest, ExportState, ExportTask, ImageSource},
    error::SourceError,
};
use model::core::{image::ImageRef, window::TimeRange, zone::ZoneOfInterest};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";
const PUBLIC_CATALOG_PROJECT: &str = "earthengine-public";
const PAGE_SIZE: u32 = 1000;
const REDUCE_MAX_PIXELS: f64 = 1e9;

#[derive(Debug, Clone)]
pub struct EarthEngineConfig {
    pub api_url: String,
    /// Cloud project billed for `value:compute` and exports.
    pub project: String,
    pub access_token: String,
    pub collection: String,
    pub band: String,
    pub filter: Option<String>,
    /// Region image listings are restricted to.
    pub region: ZoneOfInterest,
    /// Bound on each request, body included.
    pub timeout: std::time::Duration,
}

pub struct EarthEngineSource {
    client: Client,
    base: Url,
    config: EarthEngineConfig,
}

impl EarthEngineSource {
    pub fn new(config: EarthEngineConfig) -> Result<Self, ConnectorError> {
        let base = Url::parse(&config.api_url).map_err(|e| ConnectorError::InvalidUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .user_agent(concat!("soilwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &EarthEngineConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base
            .join(path)
            .map_err(|e| SourceError::InvalidRequest(format!("{path}: {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SourceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    fn list_url(&self) -> Result<Url, SourceError> {
        self.endpoint(&format!(
            "v1/projects/{PUBLIC_CATALOG_PROJECT}/assets/{}:listImages",
            self.config.collection
        ))
    }

    fn compute_url(&self) -> Result<Url, SourceError> {
        self.endpoint(&format!("v1/projects/{}/value:compute", self.config.project))
    }

    fn export_url(&self) -> Result<Url, SourceError> {
        self.endpoint(&format!("v1/projects/{}/image:export", self.config.project))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized(message),
            _ => SourceError::Provider {
                status: status.as_u16(),
                message,
            },
        });
    }

    serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))
}

/// Timeouts stay transport errors so the next run retries them.
fn transport(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Transport(format!("request timed out: {err}"))
    } else {
        SourceError::Transport(err.to_string())
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Listing treats `endTime` as exclusive; shift it so the closed range end is
/// still included.
fn exclusive_end(range: &TimeRange) -> DateTime<Utc> {
    range.end + Duration::milliseconds(1)
}

fn parse_state(operation: &Operation) -> ExportState {
    if let Some(error) = &operation.error {
        return ExportState::Failed(error.message.clone());
    }

    let state = operation
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.state.as_deref());
    match state {
        Some("SUCCEEDED") => ExportState::Completed,
        Some("FAILED") => ExportState::Failed("export failed".to_string()),
        Some("CANCELLED") | Some("CANCELLING") => ExportState::Cancelled,
        Some("RUNNING") => ExportState::Running,
        _ if operation.done => ExportState::Completed,
        _ => ExportState::Pending,
    }
}

#[async_trait]
impl ImageSource for EarthEngineSource {
    async fn list_timestamps(&self, range: &TimeRange) -> Result<Vec<DateTime<Utc>>, SourceError> {
        let images = self.list_images(range).await?;
        Ok(images.into_iter().map(|image| image.acquired_at).collect())
    }

    async fn list_images(&self, range: &TimeRange) -> Result<Vec<ImageRef>, SourceError> {
        let url = self.list_url()?;
        let region = self.config.region.to_geojson().to_string();
        let start = rfc3339(range.start);
        let end = rfc3339(exclusive_end(range));
        let page_size = PAGE_SIZE.to_string();

        let mut images = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("startTime", start.as_str()),
                ("endTime", end.as_str()),
                ("region", region.as_str()),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(filter) = &self.config.filter {
                query.push(("filter", filter.as_str()));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.as_str()));
            }

            let page: ListImagesResponse = self.send(self.client.get(url.clone()).query(&query)).await?;
            images.extend(
                page.images
                    .iter()
                    .map(|asset| ImageRef::new(asset.asset_id(), asset.start_time)),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        // Listing pages arrive in provider order; callers rely on ascending time.
        images.sort_by(|a, b| a.acquired_at.cmp(&b.acquired_at).then(a.id.cmp(&b.id)));

        debug!(
            collection = %self.config.collection,
            count = images.len(),
            "Listed images for {range}"
        );
        Ok(images)
    }

    async fn reduce_mean(
        &self,
        image: &ImageRef,
        zone: &ZoneOfInterest,
        scale: f64,
    ) -> Result<Option<f64>, SourceError> {
        let selected = expr::band(&image.id, &self.config.band);
        let body = json!({
            "expression": expr::expression(expr::reduce_mean(selected, zone, scale, REDUCE_MAX_PIXELS)),
        });

        let response: ComputeValueResponse =
            self.send(self.client.post(self.compute_url()?).json(&body)).await?;

        match &response.result[self.config.band.as_str()] {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            other => Err(SourceError::Decode(format!(
                "Band {} reduced to a non-numeric value: {other}",
                self.config.band
            ))),
        }
    }

    async fn export_image(
        &self,
        image: &ImageRef,
        zone: &ZoneOfInterest,
        request: &ExportRequest,
    ) -> Result<ExportTask, SourceError> {
        if !request.max_pixels.is_finite() || request.max_pixels < 1.0 {
            return Err(SourceError::InvalidRequest(format!(
                "maxPixels must be a positive number, got {}",
                request.max_pixels
            )));
        }

        let selected = expr::band(&image.id, &self.config.band);
        let clipped = expr::clipped(selected, zone, request.scale, request.crs.as_deref());
        let body = json!({
            "expression": expr::expression(clipped),
            "description": request.description,
            "fileExportOptions": {
                "fileFormat": request.format.as_str(),
                "driveDestination": {
                    "folder": request.folder,
                    "filenamePrefix": request.file_prefix,
                },
            },
            "maxPixels": format!("{}", request.max_pixels.trunc() as u64),
        });

        let operation: Operation = self.send(self.client.post(self.export_url()?).json(&body)).await?;
        info!(
            operation = %operation.name,
            "Export started: {} -> {}/{}",
            request.description, request.folder, request.file_prefix
        );

        Ok(ExportTask {
            id: operation.name,
            description: request.description.clone(),
        })
    }

    async fn export_status(&self, task: &ExportTask) -> Result<ExportState, SourceError> {
        let url = self.endpoint(&format!("v1/{}", task.id))?;
        let operation: Operation = self.send(self.client.get(url)).await?;
        Ok(parse_state(&operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use engine_core::connectors::source::RasterFormat;
    use mockito::{Matcher, Server};

    fn source(server: &Server, filter: Option<&str>) -> EarthEngineSource {
        source_at(server.url(), filter, std::time::Duration::from_secs(30))
    }

    fn source_at(
        api_url: String,
        filter: Option<&str>,
        timeout: std::time::Duration,
    ) -> EarthEngineSource {
        EarthEngineSource::new(EarthEngineConfig {
            api_url,
            project: "demo-project".into(),
            access_token: "token-123".into(),
            collection: "COPERNICUS/S1_GRD".into(),
            band: "VV".into(),
            filter: filter.map(str::to_string),
            region: ZoneOfInterest::moulouya(),
            timeout,
        })
        .unwrap()
    }

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap(),
        )
    }

    const LIST_PATH: &str = "/v1/projects/earthengine-public/assets/COPERNICUS/S1_GRD:listImages";

    #[tokio::test]
    async fn lists_all_pages_in_ascending_order() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", LIST_PATH)
            .match_header("authorization", "Bearer token-123")
            .expect(1)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("endTime".into(), "2025-06-15T00:00:00.001Z".into()),
                Matcher::UrlEncoded("filter".into(), "properties.instrumentMode = \"IW\"".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "images": [
                        {"id": "COPERNICUS/S1_GRD/B", "name": "projects/earthengine-public/assets/COPERNICUS/S1_GRD/B", "startTime": "2025-06-09T18:00:00Z"},
                        {"name": "projects/earthengine-public/assets/COPERNICUS/S1_GRD/A", "startTime": "2025-06-03T18:00:00Z"}
                    ],
                    "nextPageToken": "page-2"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let second = server
            .mock("GET", LIST_PATH)
            .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
            .with_status(200)
            .with_body(
                json!({
                    "images": [
                        {"id": "COPERNICUS/S1_GRD/C", "name": "n", "startTime": "2025-06-06T18:00:00Z"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let source = source(&server, Some("properties.instrumentMode = \"IW\""));
        let images = source.list_images(&range()).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            ["COPERNICUS/S1_GRD/A", "COPERNICUS/S1_GRD/C", "COPERNICUS/S1_GRD/B"]
        );

        let timestamps = source.list_timestamps(&range()).await;
        assert_eq!(timestamps.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reduce_returns_band_mean_or_none() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/demo-project/value:compute")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "expression": {"result": "0"}
            })))
            .with_status(200)
            .with_body(r#"{"result": {"VV": -12.75}}"#)
            .expect(1)
            .create_async()
            .await;

        let source = source(&server, None);
        let image = ImageRef::new("COPERNICUS/S1_GRD/A", range().start);
        let zone = ZoneOfInterest::moulouya();
        let mean = source.reduce_mean(&image, &zone, 10.0).await.unwrap();
        assert_eq!(mean, Some(-12.75));
        mock.assert_async().await;

        server
            .mock("POST", "/v1/projects/demo-project/value:compute")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result": {"VV": null}}"#)
            .create_async()
            .await;
        assert_eq!(source.reduce_mean(&image, &zone, 10.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn maps_provider_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/projects/demo-project/value:compute")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": {"code": 401, "message": "token expired"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", LIST_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("backend unavailable")
            .create_async()
            .await;

        let source = source(&server, None);
        let image = ImageRef::new("COPERNICUS/S1_GRD/A", range().start);
        let err = source
            .reduce_mean(&image, &ZoneOfInterest::moulouya(), 10.0)
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::Unauthorized("token expired".into()));

        let err = source.list_images(&range()).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Provider {
                status: 503,
                message: "backend unavailable".into()
            }
        );
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn export_then_poll_status() {
        let mut server = Server::new_async().await;
        let started = server
            .mock("POST", "/v1/projects/demo-project/image:export")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "description": "soil_moisture_2025-06-03",
                "fileExportOptions": {
                    "fileFormat": "GEO_TIFF",
                    "driveDestination": {"folder": "GEE_Soil_Moisture"}
                },
                "maxPixels": "10000000000000"
            })))
            .with_status(200)
            .with_body(r#"{"name": "projects/demo-project/operations/OP1", "done": false}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/projects/demo-project/operations/OP1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"name": "projects/demo-project/operations/OP1", "done": true, "metadata": {"state": "SUCCEEDED"}}"#)
            .create_async()
            .await;

        let source = source(&server, None);
        let image = ImageRef::new("COPERNICUS/S1_GRD/A", range().start);
        let request = ExportRequest {
            description: "soil_moisture_2025-06-03".into(),
            folder: "GEE_Soil_Moisture".into(),
            file_prefix: "2025-06-15/soil_moisture_2025-06-03".into(),
            scale: 10.0,
            crs: None,
            max_pixels: 1e13,
            format: RasterFormat::GeoTiff,
        };
        let task = source
            .export_image(&image, &ZoneOfInterest::moulouya(), &request)
            .await
            .unwrap();
        started.assert_async().await;
        assert_eq!(task.id, "projects/demo-project/operations/OP1");

        let state = source.export_status(&task).await.unwrap();
        assert_eq!(state, ExportState::Completed);
    }

    #[test]
    fn operation_states() {
        let op = |body: &str| parse_state(&serde_json::from_str::<Operation>(body).unwrap());
        assert_eq!(op(r#"{"name": "o"}"#), ExportState::Pending);
        assert_eq!(
            op(r#"{"name": "o", "metadata": {"state": "RUNNING"}}"#),
            ExportState::Running
        );
        assert_eq!(
            op(r#"{"name": "o", "done": true, "error": {"message": "quota"}}"#),
            ExportState::Failed("quota".into())
        );
        assert_eq!(
            op(r#"{"name": "o", "metadata": {"state": "CANCELLED"}}"#),
            ExportState::Cancelled
        );
    }

    #[tokio::test]
    async fn stalled_provider_times_out_as_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer.
        let stalled = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let source = source_at(
            format!("http://{addr}"),
            None,
            std::time::Duration::from_millis(200),
        );
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            source.list_images(&range()),
        )
        .await
        .expect("request was not bounded by the client timeout")
        .unwrap_err();

        assert!(matches!(&err, SourceError::Transport(msg) if msg.contains("timed out")), "{err:?}");
        assert!(err.is_transient());
        stalled.abort();
    }
}
