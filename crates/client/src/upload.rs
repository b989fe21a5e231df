// Path: crates/client/src/upload.rs
//! Upload service client and the GraphQL lookup used to detect prior
//! uploads.

use crate::send_json;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use observer_api::publish::{Tag, UploadClient, UploadItem};
use observer_types::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct UploadEnvelope<'a> {
    data: String,
    owner: String,
    signature: String,
    tags: &'a [Tag],
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    transactions: Transactions,
}

#[derive(Debug, Deserialize)]
struct Transactions {
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    id: String,
}

/// A GraphQL string literal. JSON string escaping is a subset of GraphQL's.
fn graphql_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Builds the query for the newest transaction by `owner` carrying every tag.
fn transactions_query(owner: &str, tags: &[Tag]) -> String {
    let tag_filters = tags
        .iter()
        .map(|t| {
            format!(
                "{{ name: {}, values: [{}] }}",
                graphql_string(&t.name),
                graphql_string(&t.value)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{{ transactions(first: 1, owners: [{}], tags: [{tag_filters}]) {{ edges {{ node {{ id }} }} }} }}",
        graphql_string(owner)
    )
}

/// Posts signed items to `{upload_base}/tx` and looks up earlier uploads
/// through `{graphql_base}/graphql`.
#[derive(Clone)]
pub struct HttpUploadClient {
    upload_base: String,
    graphql_base: String,
    client: Client,
}

impl HttpUploadClient {
    /// Builds the client.
    pub fn new(upload_base: impl Into<String>, graphql_base: impl Into<String>, client: Client) -> Self {
        Self {
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            graphql_base: graphql_base.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn find_upload(&self, owner_address: &str, tags: &[Tag]) -> Result<Option<String>> {
        let url = format!("{}/graphql", self.graphql_base);
        let request = GraphQlRequest {
            query: transactions_query(owner_address, tags),
        };
        let resp: GraphQlResponse = send_json(&url, self.client.post(&url).json(&request)).await?;
        Ok(resp
            .data
            .and_then(|d| d.transactions.edges.into_iter().next())
            .map(|edge| edge.node.id))
    }

    async fn upload(&self, item: UploadItem) -> Result<String> {
        let url = format!("{}/tx", self.upload_base);
        let envelope = UploadEnvelope {
            data: URL_SAFE_NO_PAD.encode(&item.data),
            owner: URL_SAFE_NO_PAD.encode(&item.owner),
            signature: URL_SAFE_NO_PAD.encode(&item.signature),
            tags: &item.tags,
        };
        let resp: UploadResponse = send_json(&url, self.client.post(&url).json(&envelope)).await?;
        tracing::debug!(target: "upload", id = %resp.id, bytes = item.data.len(), "uploaded item");
        Ok(resp.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_query_names_owner_and_tags() {
        let query = transactions_query(
            "owner-1",
            &[Tag::new("App-Name", "AR-IO Observer"), Tag::new("AR-IO-Epoch-Start-Height", "100")],
        );
        assert!(query.contains(r#"owners: ["owner-1"]"#));
        assert!(query.contains(r#"{ name: "App-Name", values: ["AR-IO Observer"] }"#));
        assert!(query.contains(r#"{ name: "AR-IO-Epoch-Start-Height", values: ["100"] }"#));
    }

    #[test]
    fn test_query_escapes_quotes_and_keeps_unicode() {
        let query = transactions_query("owner-1", &[Tag::new("Note", "caf\u{e9} \"x\"")]);
        assert!(query.contains(r#"values: ["café \"x\""]"#));
        assert!(!query.contains(r"\u{"));
    }

    #[tokio::test]
    async fn test_find_upload_reads_first_edge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_string_contains("owner-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "transactions": { "edges": [ { "node": { "id": "tx-9" } } ] } }
            })))
            .mount(&server)
            .await;
        let uploads = HttpUploadClient::new(server.uri(), server.uri(), Client::new());
        assert_eq!(
            uploads.find_upload("owner-1", &[]).await.unwrap().as_deref(),
            Some("tx-9")
        );
    }

    #[tokio::test]
    async fn test_find_upload_without_edges() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "transactions": { "edges": [] } }
            })))
            .mount(&server)
            .await;
        let uploads = HttpUploadClient::new(server.uri(), server.uri(), Client::new());
        assert!(uploads.find_upload("owner-1", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_posts_encoded_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tx"))
            .and(body_json(serde_json::json!({
                "data": "AQID",
                "owner": "BAU",
                "signature": "Bg",
                "tags": [{ "name": "Content-Encoding", "value": "gzip" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "tx-1" })))
            .expect(1)
            .mount(&server)
            .await;
        let uploads = HttpUploadClient::new(server.uri(), server.uri(), Client::new());
        let id = uploads
            .upload(UploadItem {
                data: vec![1, 2, 3],
                tags: vec![Tag::new("Content-Encoding", "gzip")],
                owner: vec![4, 5],
                signature: vec![6],
            })
            .await
            .unwrap();
        assert_eq!(id, "tx-1");
    }
}
